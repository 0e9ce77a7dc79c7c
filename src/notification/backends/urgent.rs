//! 窗口紧急提示后端

use crate::coordinator::EntitySink;
use crate::entity::{keys, mime, Entity, Payload, TaskParameters};
use crate::notification::backend::{BackendCommand, PresentationBackend};
use crate::notification::rule::{Method, NotificationRule};
use std::any::Any;
use std::collections::HashSet;
use tracing::debug;

/// 发出 `x-app/window-urgent-hint`，取消时只撤销自己提示过的事件
#[derive(Debug, Default)]
pub struct UrgentBackend {
    hinted: HashSet<String>,
}

impl UrgentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hinted(&self, event_id: &str) -> bool {
        self.hinted.contains(event_id)
    }

    fn emit(&self, event_id: &str, urgent: bool, sink: &EntitySink) {
        sink.submit(
            Entity::new(Payload::Empty, mime::WINDOW_URGENT)
                .with(keys::EVENT_ID, event_id)
                .with(keys::URGENT, urgent)
                .with_parameters(TaskParameters::AUTOMATIC),
        );
    }

    fn clear(&mut self, event_id: &str, sink: &EntitySink) {
        if self.hinted.remove(event_id) {
            debug!(event_id = %event_id, "Clearing urgency hint");
            self.emit(event_id, false, sink);
        }
    }
}

impl PresentationBackend for UrgentBackend {
    fn method(&self) -> Method {
        Method::Urgent
    }

    fn handle(&mut self, entity: &Entity, _rule: &NotificationRule, sink: &EntitySink) {
        let event_id = entity.event_id();
        if entity.is_cancel() {
            self.clear(event_id, sink);
            return;
        }

        if self.hinted.insert(event_id.to_string()) {
            debug!(event_id = %event_id, "Setting urgency hint");
        }
        self.emit(event_id, true, sink);
    }

    fn command(&mut self, command: BackendCommand, sink: &EntitySink) {
        if let BackendCommand::Dismiss { event_id } = command {
            self.clear(&event_id, sink);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
