//! 通用通知处理器 - 把匹配到的 Entity 扇出给各展示后端
//!
//! 处理器本身不保存聚合状态，所有聚合都在后端内部完成。

use super::backend::{BackendCommand, PresentationBackend};
use super::backends::{AudioBackend, CommandBackend, TrayBackend, UrgentBackend, VisualBackend};
use super::matcher::RuleMatcher;
use super::rule::{Method, NotificationRule};
use crate::config::HubConfig;
use crate::coordinator::EntitySink;
use crate::entity::{mime, Entity};
use tracing::{debug, info, warn};

/// 一次处理的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    RuleRegistered,
    RuleRejected(String),
    /// 取消已转交给所有后端
    Cancelled { backends: usize },
    /// 共调用了多少次后端
    Dispatched { rules: usize, calls: usize },
    /// 没有规则匹配
    Unmatched,
    /// 不是通知类 Entity
    Ignored,
}

/// 通用通知处理器
pub struct GeneralHandler {
    matcher: RuleMatcher,
    /// 注册顺序固定，进程生命周期内不变
    backends: Vec<Box<dyn PresentationBackend>>,
}

impl GeneralHandler {
    pub fn new(matcher: RuleMatcher, backends: Vec<Box<dyn PresentationBackend>>) -> Self {
        for backend in &backends {
            info!(method = %backend.method(), "Registering presentation backend");
        }
        Self { matcher, backends }
    }

    /// 使用全部内置后端
    pub fn with_default_backends(matcher: RuleMatcher, config: &HubConfig) -> Self {
        let backends: Vec<Box<dyn PresentationBackend>> = vec![
            Box::new(TrayBackend::from_config(config)),
            Box::new(VisualBackend::new()),
            Box::new(AudioBackend::new()),
            Box::new(CommandBackend::new()),
            Box::new(UrgentBackend::new()),
        ];
        Self::new(matcher, backends)
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut RuleMatcher {
        &mut self.matcher
    }

    pub fn backend_methods(&self) -> Vec<Method> {
        self.backends.iter().map(|b| b.method()).collect()
    }

    /// 按具体类型取后端
    pub fn backend_as<T: 'static>(&self, method: Method) -> Option<&T> {
        self.backends
            .iter()
            .find(|b| b.method() == method)
            .and_then(|b| b.as_any().downcast_ref::<T>())
    }

    /// 处理通知类 Entity
    pub fn handle(&mut self, entity: &Entity, sink: &EntitySink) -> HandleOutcome {
        if entity.mime() == mime::RULE_CREATE {
            return match self.matcher.store_mut().handle_entity(entity) {
                Ok(()) => HandleOutcome::RuleRegistered,
                Err(e) => {
                    warn!(error = %e, "Rule creation entity rejected");
                    HandleOutcome::RuleRejected(e.to_string())
                }
            };
        }

        if entity.mime() != mime::NOTIFICATION {
            return HandleOutcome::Ignored;
        }

        if entity.is_cancel() {
            let empty = NotificationRule::empty();
            for backend in &mut self.backends {
                backend.handle(entity, &empty, sink);
            }
            self.matcher.forget(entity.event_id());
            return HandleOutcome::Cancelled {
                backends: self.backends.len(),
            };
        }

        let rules = self.matcher.match_entity(entity);
        if rules.is_empty() {
            return HandleOutcome::Unmatched;
        }

        let mut calls = 0;
        for rule in &rules {
            for backend in &mut self.backends {
                if !rule.methods.contains(backend.method().as_set()) {
                    continue;
                }
                backend.handle(entity, rule, sink);
                calls += 1;
            }
        }

        debug!(event_id = entity.event_id(), rules = rules.len(), calls, "Notification fanned out");
        HandleOutcome::Dispatched {
            rules: rules.len(),
            calls,
        }
    }

    /// 把 UI 命令转给对应后端
    ///
    /// 关闭事件时同时清掉匹配器里该事件的规则记录。
    pub fn command(&mut self, method: Method, command: BackendCommand, sink: &EntitySink) {
        if let BackendCommand::Dismiss { event_id } = &command {
            self.matcher.forget(event_id);
        }
        match self.backends.iter_mut().find(|b| b.method() == method) {
            Some(backend) => backend.command(command, sink),
            None => debug!(method = %method, "No backend for command"),
        }
    }
}
