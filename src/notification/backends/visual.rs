//! 弹出视图后端 - 维护当前显示中的弹窗

use crate::coordinator::EntitySink;
use crate::entity::{keys, Entity};
use crate::notification::backend::{BackendCommand, PresentationBackend};
use crate::notification::priority::{get_priority, Priority};
use crate::notification::rule::{Method, NotificationRule};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use tracing::debug;

/// 一个弹窗
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popup {
    pub event_id: String,
    pub header: String,
    pub text: String,
    pub priority: Priority,
    pub actions: Vec<String>,
}

/// 弹出视图后端
#[derive(Debug, Default)]
pub struct VisualBackend {
    shown: BTreeMap<String, Popup>,
}

impl VisualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn popups(&self) -> impl Iterator<Item = &Popup> {
        self.shown.values()
    }

    pub fn popup(&self, event_id: &str) -> Option<&Popup> {
        self.shown.get(event_id)
    }
}

impl PresentationBackend for VisualBackend {
    fn method(&self) -> Method {
        Method::Visual
    }

    fn handle(&mut self, entity: &Entity, _rule: &NotificationRule, _sink: &EntitySink) {
        let event_id = entity.event_id();

        if entity.is_cancel() {
            if self.shown.remove(event_id).is_some() {
                debug!(event_id = %event_id, "Popup closed by cancel");
            }
            return;
        }

        let text = entity
            .get_str(keys::FULL_TEXT)
            .or_else(|| entity.get_str(keys::TEXT))
            .unwrap_or_default();
        let popup = Popup {
            event_id: event_id.to_string(),
            header: entity.get_str(keys::HEADER).unwrap_or_default().to_string(),
            text: text.to_string(),
            priority: get_priority(entity),
            actions: entity.get_string_list(keys::NOTIFICATION_ACTIONS),
        };
        debug!(event_id = %event_id, header = %popup.header, "Showing popup");
        self.shown.insert(event_id.to_string(), popup);
    }

    fn command(&mut self, command: BackendCommand, _sink: &EntitySink) {
        if let BackendCommand::Dismiss { event_id } = command {
            self.shown.remove(&event_id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
