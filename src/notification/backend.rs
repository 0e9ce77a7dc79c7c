//! 展示后端 trait 定义

use super::rule::{Method, NotificationRule};
use crate::coordinator::EntitySink;
use crate::entity::Entity;
use std::any::Any;
use tracing::debug;

/// 从 UI 排队投递给后端的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// 触发第 `index` 个动作
    TriggerAction { event_id: String, index: usize },
    /// 关闭事件
    Dismiss { event_id: String },
}

/// 展示后端
///
/// 每个后端只拥有自己的聚合状态。取消 Entity 会连同空规则一起交给所有后端。
pub trait PresentationBackend: Send {
    /// 后端对应的展示方式
    fn method(&self) -> Method;

    /// 处理匹配到的 Entity
    fn handle(&mut self, entity: &Entity, rule: &NotificationRule, sink: &EntitySink);

    /// 处理 UI 命令（默认忽略）
    fn command(&mut self, command: BackendCommand, _sink: &EntitySink) {
        debug!(method = %self.method(), command = ?command, "Backend ignores command");
    }

    fn as_any(&self) -> &dyn Any;
}
