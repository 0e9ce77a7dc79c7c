//! 通知规则 - 把事件形状映射到展示方式
//!
//! 规则是配置数据：注册时校验，匹配时只读（single-shot 标志除外）。

use crate::entity::Entity;
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// 通配符
pub const WILDCARD: &str = "*";

/// 单个展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// 托盘图标 + 菜单
    Tray,
    /// 弹出视图
    Visual,
    /// 声音
    Audio,
    /// 外部命令
    Command,
    /// 窗口紧急提示
    Urgent,
}

bitflags::bitflags! {
    /// 规则请求的展示方式集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Methods: u32 {
        const TRAY = 1 << 0;
        const VISUAL = 1 << 1;
        const AUDIO = 1 << 2;
        const COMMAND = 1 << 3;
        const URGENT = 1 << 4;
    }
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Tray,
        Method::Visual,
        Method::Audio,
        Method::Command,
        Method::Urgent,
    ];

    pub const fn as_set(self) -> Methods {
        match self {
            Method::Tray => Methods::TRAY,
            Method::Visual => Methods::VISUAL,
            Method::Audio => Methods::AUDIO,
            Method::Command => Methods::COMMAND,
            Method::Urgent => Methods::URGENT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Tray => "tray",
            Method::Visual => "visual",
            Method::Audio => "audio",
            Method::Command => "command",
            Method::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tray" => Ok(Method::Tray),
            "visual" | "popup" => Ok(Method::Visual),
            "audio" | "sound" => Ok(Method::Audio),
            "command" | "cmd" => Ok(Method::Command),
            "urgent" | "urgency" => Ok(Method::Urgent),
            other => bail!("unknown notification method: {}", other),
        }
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        method.as_set()
    }
}

impl FromIterator<Method> for Methods {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Methods::empty();
        for method in iter {
            set |= method.as_set();
        }
        set
    }
}

impl Methods {
    /// 集合中的方式，按固定顺序
    pub fn to_vec(self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.contains(m.as_set()))
            .collect()
    }
}

/// 单个展示方式的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodParams {
    Audio {
        file: PathBuf,
    },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// 字段匹配定义（可序列化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: String,
    pub op: MatchOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOp {
    Equals,
    Contains,
    Regex,
}

/// 编译后的字段匹配
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    definition: FieldMatch,
    regex: Option<Regex>,
}

impl FieldMatcher {
    pub fn compile(definition: FieldMatch) -> Result<Self> {
        let regex = match definition.op {
            MatchOp::Regex => Some(
                Regex::new(&definition.value)
                    .with_context(|| format!("invalid regex for field {}", definition.field))?,
            ),
            _ => None,
        };
        Ok(Self { definition, regex })
    }

    pub fn definition(&self) -> &FieldMatch {
        &self.definition
    }

    /// 字段缺失视为不匹配
    pub fn matches(&self, entity: &Entity) -> bool {
        let Some(text) = entity.get(&self.definition.field).and_then(|v| v.to_text()) else {
            return false;
        };

        let value = &self.definition.value;
        match (self.definition.op, &self.regex) {
            (MatchOp::Equals, _) => text == *value,
            (MatchOp::Contains, _) => text.contains(value.as_str()),
            (MatchOp::Regex, Some(regex)) => regex.is_match(&text),
            (MatchOp::Regex, None) => false,
        }
    }
}

/// 通知规则
#[derive(Debug, Clone)]
pub struct NotificationRule {
    /// 规则名（同名注册会替换）
    pub name: String,
    /// 类别匹配，支持 `*`
    pub category: String,
    /// 事件类型匹配，支持 `*`
    pub event_type: String,
    /// 额外的字段匹配，全部满足才算匹配
    pub field_matches: Vec<FieldMatcher>,
    pub methods: Methods,
    pub params: BTreeMap<Method, MethodParams>,
    /// 首次匹配后自动禁用
    pub single_shot: bool,
    pub enabled: bool,
}

impl NotificationRule {
    pub fn new(name: impl Into<String>, category: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            event_type: event_type.into(),
            field_matches: Vec::new(),
            methods: Methods::empty(),
            params: BTreeMap::new(),
            single_shot: false,
            enabled: true,
        }
    }

    /// 空规则：取消路径上传给所有后端
    pub fn empty() -> Self {
        Self::new("", "", "")
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.methods.is_empty()
    }

    pub fn with_methods(mut self, methods: impl Into<Methods>) -> Self {
        self.methods = methods.into();
        self
    }

    pub fn with_params(mut self, method: Method, params: MethodParams) -> Self {
        self.params.insert(method, params);
        self
    }

    pub fn with_field_match(mut self, matcher: FieldMatcher) -> Self {
        self.field_matches.push(matcher);
        self
    }

    pub fn single_shot(mut self, single_shot: bool) -> Self {
        self.single_shot = single_shot;
        self
    }

    pub fn params(&self, method: Method) -> Option<&MethodParams> {
        self.params.get(&method)
    }

    /// 类别与类型匹配不能为空
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            bail!("rule {:?} has an empty category match", self.name);
        }
        if self.event_type.trim().is_empty() {
            bail!("rule {:?} has an empty event type match", self.name);
        }
        Ok(())
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        pattern_matches(&self.category, entity.event_category())
            && pattern_matches(&self.event_type, entity.event_type())
            && self.field_matches.iter().all(|m| m.matches(entity))
    }
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

/// 规则文件中的规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub category: String,
    pub event_type: String,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub params: BTreeMap<Method, MethodParams>,
    #[serde(default)]
    pub field_matches: Vec<FieldMatch>,
    #[serde(default)]
    pub single_shot: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<RuleDefinition> for NotificationRule {
    type Error = anyhow::Error;

    fn try_from(def: RuleDefinition) -> Result<Self> {
        let field_matches = def
            .field_matches
            .into_iter()
            .map(FieldMatcher::compile)
            .collect::<Result<Vec<_>>>()?;

        let rule = NotificationRule {
            name: def.name,
            category: def.category,
            event_type: def.event_type,
            field_matches,
            methods: def.methods.into_iter().collect(),
            params: def.params,
            single_shot: def.single_shot,
            enabled: def.enabled,
        };
        rule.validate()?;
        Ok(rule)
    }
}

impl From<&NotificationRule> for RuleDefinition {
    fn from(rule: &NotificationRule) -> Self {
        RuleDefinition {
            name: rule.name.clone(),
            category: rule.category.clone(),
            event_type: rule.event_type.clone(),
            methods: rule.methods.to_vec(),
            params: rule.params.clone(),
            field_matches: rule.field_matches.iter().map(|m| m.definition().clone()).collect(),
            single_shot: rule.single_shot,
            enabled: rule.enabled,
        }
    }
}
