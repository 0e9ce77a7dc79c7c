//! 通知 Entity 构造
//!
//! 生产者通过 [`NotificationDraft`] 描述一条通知，再用 [`make_notification`]
//! 生成发给协调器的 Entity；[`make_cancel`] 生成对应的取消 Entity。

use super::priority::Priority;
use crate::entity::{keys, mime, Entity, HandlingRef, Payload, TaskParameters, CANCEL_CATEGORY};
use serde::{Deserialize, Serialize};

/// 一条通知的描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDraft {
    pub header: String,
    pub text: String,
    pub priority: Priority,
    pub sender_id: String,
    pub category: String,
    pub event_type: String,
    pub event_id: String,
    pub visual_path: Vec<String>,
    /// 非零时作为增量，否则使用 `count`
    pub delta: i64,
    pub count: Option<i64>,
    /// 缺省为 `text`
    pub extended_text: Option<String>,
    /// 缺省为 `text`
    pub full_text: Option<String>,
    pub actions: Vec<String>,
    #[serde(skip)]
    pub handling_object: Option<HandlingRef>,
}

impl NotificationDraft {
    pub fn new(
        category: impl Into<String>,
        event_id: impl Into<String>,
        header: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            event_id: event_id.into(),
            header: header.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn visual_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visual_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn delta(mut self, delta: i64) -> Self {
        self.delta = delta;
        self
    }

    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn extended_text(mut self, text: impl Into<String>) -> Self {
        self.extended_text = Some(text.into());
        self
    }

    pub fn full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = Some(text.into());
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn handling_object(mut self, handler: HandlingRef) -> Self {
        self.handling_object = Some(handler);
        self
    }
}

/// 生成通知 Entity
pub fn make_notification(draft: NotificationDraft) -> Entity {
    let extended = draft.extended_text.unwrap_or_else(|| draft.text.clone());
    let full = draft.full_text.unwrap_or_else(|| draft.text.clone());

    let mut entity = Entity::new(Payload::Empty, mime::NOTIFICATION)
        .with_parameters(TaskParameters::AUTOMATIC)
        .with(keys::HEADER, draft.header)
        .with(keys::TEXT, draft.text)
        .with(keys::PRIORITY, draft.priority.as_str())
        .with(keys::SENDER_ID, draft.sender_id)
        .with(keys::EVENT_CATEGORY, draft.category)
        .with(keys::EVENT_TYPE, draft.event_type)
        .with(keys::EVENT_ID, draft.event_id)
        .with(keys::EXTENDED_TEXT, extended)
        .with(keys::FULL_TEXT, full);

    if !draft.visual_path.is_empty() {
        entity = entity.with(keys::VISUAL_PATH, draft.visual_path);
    }
    if draft.delta != 0 {
        entity = entity.with(keys::DELTA_COUNT, draft.delta);
    }
    if let Some(count) = draft.count {
        entity = entity.with(keys::COUNT, count);
    }
    if !draft.actions.is_empty() {
        entity = entity.with(keys::NOTIFICATION_ACTIONS, draft.actions);
    }
    if let Some(handler) = draft.handling_object {
        entity = entity.with(keys::HANDLING_OBJECT, handler);
    }
    entity
}

/// 生成取消 Entity
pub fn make_cancel(sender_id: impl Into<String>, event_id: impl Into<String>) -> Entity {
    Entity::new(Payload::Empty, mime::NOTIFICATION)
        .with_parameters(TaskParameters::AUTOMATIC)
        .with(keys::SENDER_ID, sender_id.into())
        .with(keys::EVENT_CATEGORY, CANCEL_CATEGORY)
        .with(keys::EVENT_ID, event_id.into())
}
