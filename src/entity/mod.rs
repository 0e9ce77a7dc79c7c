//! Entity 模型 - 组件之间唯一的通信载体
//!
//! 组件之间从不直接调用，而是构造不可变的 [`Entity`] 交给分发器。
//! Entity 构造完成后只能读取，builder 方法都会消耗 `self`。

pub mod capability;
pub mod handling;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub use capability::{CapabilityProvider, CapabilityResponse, CapabilityTier, ProviderRole};
pub use handling::{HandlingObject, HandlingRef};

/// 逻辑内容类型（MIME tag）
pub mod mime {
    /// 通知事件
    pub const NOTIFICATION: &str = "x-app/notification";
    /// 创建/修改通知规则
    pub const RULE_CREATE: &str = "x-app/notification-rule-create";
    /// Rebuild 之后广播的未读事件总数
    pub const EVENT_COUNT_INFO: &str = "x-app/notification-event-count-info";
    /// 请求播放音频文件
    pub const AUDIO_PLAY: &str = "x-app/audio-play";
    /// 请求设置窗口紧急提示
    pub const WINDOW_URGENT: &str = "x-app/window-urgent-hint";
}

/// `Additional` 中约定的键
pub mod keys {
    pub const EVENT_CATEGORY: &str = "EventCategory";
    pub const EVENT_ID: &str = "EventID";
    pub const EVENT_TYPE: &str = "EventType";
    pub const SENDER_ID: &str = "SenderID";
    pub const VISUAL_PATH: &str = "VisualPath";
    pub const DELTA_COUNT: &str = "DeltaCount";
    pub const COUNT: &str = "Count";
    pub const EXTENDED_TEXT: &str = "ExtendedText";
    pub const FULL_TEXT: &str = "FullText";
    pub const HEADER: &str = "Header";
    pub const TEXT: &str = "Text";
    pub const PRIORITY: &str = "Priority";
    pub const HANDLING_OBJECT: &str = "HandlingObject";
    pub const NOTIFICATION_ACTIONS: &str = "NotificationActions";
    pub const NOTIFICATION_PIXMAP: &str = "NotificationPixmap";
    /// 允许分发器把 Entity 交给多个同样合格的 provider
    pub const FAN_OUT: &str = "FanOut";
    /// 紧急提示的开关状态
    pub const URGENT: &str = "Urgent";

    pub const RULE_NAME: &str = "RuleName";
    pub const RULE_METHODS: &str = "Methods";
    pub const RULE_AUDIO_FILE: &str = "AudioFile";
    pub const RULE_COMMAND: &str = "Command";
    pub const RULE_COMMAND_ARGS: &str = "CommandArgs";
    pub const RULE_SINGLE_SHOT: &str = "SingleShot";
    pub const RULE_FIELD_MATCHES: &str = "FieldMatches";
}

/// 保留的 "取消" 类别：表示移除引用的事件，而不是创建事件
pub const CANCEL_CATEGORY: &str = "@cancel";

bitflags::bitflags! {
    /// 任务参数，各标志相互独立
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TaskParameters: u32 {
        const USER_INITIATED = 1 << 0;
        const AUTOMATIC = 1 << 1;
        /// 只交给具备下载能力的 provider
        const DOWNLOAD_ONLY = 1 << 2;
        /// 只交给具备处理能力的 provider
        const HANDLE_ONLY = 1 << 3;
        const NO_AUTOSTART = 1 << 4;
    }
}

/// 消息主体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    #[default]
    Empty,
    Url(String),
    Path(PathBuf),
    Bytes(Vec<u8>),
    Map(serde_json::Map<String, serde_json::Value>),
    Integer(i64),
}

/// `Additional` 中的带类型值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    Bool(bool),
    Int(i64),
    String(String),
    StringList(Vec<String>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    /// 处理对象的弱引用，不参与序列化
    #[serde(skip)]
    Handler(HandlingRef),
}

impl Variant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            Variant::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int(n) => Some(*n),
            Variant::Json(v) => v.as_i64(),
            Variant::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::Json(v) => v.as_bool(),
            _ => None,
        }
    }

    /// 单个字符串视为只有一个元素的列表
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            Variant::StringList(list) => Some(list.clone()),
            Variant::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    /// 用于字段匹配的文本形式
    pub fn to_text(&self) -> Option<String> {
        match self {
            Variant::Bool(b) => Some(b.to_string()),
            Variant::Int(n) => Some(n.to_string()),
            Variant::String(s) => Some(s.clone()),
            Variant::StringList(list) => Some(list.join("\n")),
            Variant::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Variant::Json(v) => Some(v.to_string()),
            Variant::Bytes(_) | Variant::Handler(_) => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int(value.into())
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<Vec<String>> for Variant {
    fn from(value: Vec<String>) -> Self {
        Variant::StringList(value)
    }
}

impl From<HandlingRef> for Variant {
    fn from(value: HandlingRef) -> Self {
        Variant::Handler(value)
    }
}

/// 不可变的带类型消息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    payload: Payload,
    mime: String,
    #[serde(default)]
    additional: HashMap<String, Variant>,
    #[serde(default)]
    parameters: TaskParameters,
}

impl Entity {
    pub fn new(payload: Payload, mime: impl Into<String>) -> Self {
        Self {
            payload,
            mime: mime.into(),
            additional: HashMap::new(),
            parameters: TaskParameters::empty(),
        }
    }

    /// 设置 Additional 字段
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }

    /// 设置任务参数
    pub fn with_parameters(mut self, parameters: TaskParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn parameters(&self) -> TaskParameters {
        self.parameters
    }

    pub fn additional(&self) -> &HashMap<String, Variant> {
        &self.additional
    }

    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.additional.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Variant::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Variant::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Variant::as_bool)
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Variant::as_string_list)
            .unwrap_or_default()
    }

    pub fn handling_object(&self) -> Option<HandlingRef> {
        match self.get(keys::HANDLING_OBJECT) {
            Some(Variant::Handler(handler)) => Some(handler.clone()),
            _ => None,
        }
    }

    /// 通知类别（缺省为空字符串）
    pub fn event_category(&self) -> &str {
        self.get_str(keys::EVENT_CATEGORY).unwrap_or("")
    }

    pub fn event_id(&self) -> &str {
        self.get_str(keys::EVENT_ID).unwrap_or("")
    }

    pub fn event_type(&self) -> &str {
        self.get_str(keys::EVENT_TYPE).unwrap_or("")
    }

    pub fn is_cancel(&self) -> bool {
        self.event_category() == CANCEL_CATEGORY
    }

    pub fn wants_fan_out(&self) -> bool {
        self.get_bool(keys::FAN_OUT).unwrap_or(false)
    }
}
