//! 托盘后端 - 按类别聚合当前未关闭的通知
//!
//! # 状态
//! - `events`：事件表，后端独占
//! - `categories`：类别 -> 展示对象（图标、菜单、角标）
//!
//! 类别展示对象在首个引用它的记录出现时创建，最后一个记录移除后
//! 从表中删除（不是隐藏）。每次事件表变化后执行 [`TrayBackend::rebuild`]，
//! 从事件表完整重建可见状态，同样的事件表总是得到同样的结果。

use super::event_table::EventTable;
use super::menu::{append_record, MenuEntry};
use crate::config::HubConfig;
use crate::coordinator::EntitySink;
use crate::entity::{keys, mime, Entity, Payload, TaskParameters};
use crate::notification::backend::{BackendCommand, PresentationBackend};
use crate::notification::rule::{Method, NotificationRule};
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// 类别图标缺省名
pub const DEFAULT_CATEGORY_ICON: &str = "general";

/// 单个类别的展示对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPresentation {
    pub category: String,
    pub icon: String,
    /// 该类别所有记录的计数之和
    pub badge: i64,
    /// 只有开启计数的类别才显示角标文字
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_text: Option<String>,
    pub menu: Vec<MenuEntry>,
    #[serde(skip)]
    deletion_candidate: bool,
}

impl CategoryPresentation {
    fn new(category: &str, icon: &str) -> Self {
        Self {
            category: category.to_string(),
            icon: icon.to_string(),
            badge: 0,
            badge_text: None,
            menu: Vec::new(),
            deletion_candidate: false,
        }
    }
}

/// Rebuild 后的可见状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraySnapshot {
    pub categories: Vec<CategoryPresentation>,
    pub total_count: i64,
}

/// 托盘后端
pub struct TrayBackend {
    events: EventTable,
    categories: BTreeMap<String, CategoryPresentation>,
    category_icons: HashMap<String, String>,
    counter_categories: HashSet<String>,
    dismiss_label: String,
}

impl TrayBackend {
    pub fn new(
        category_icons: HashMap<String, String>,
        counter_categories: HashSet<String>,
        dismiss_label: impl Into<String>,
    ) -> Self {
        Self {
            events: EventTable::new(),
            categories: BTreeMap::new(),
            category_icons,
            counter_categories,
            dismiss_label: dismiss_label.into(),
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.category_icons.clone(),
            config.counter_categories.iter().cloned().collect(),
            config.dismiss_label.clone(),
        )
    }

    pub fn events(&self) -> &EventTable {
        &self.events
    }

    pub fn category(&self, category: &str) -> Option<&CategoryPresentation> {
        self.categories.get(category)
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    pub fn snapshot(&self) -> TraySnapshot {
        TraySnapshot {
            categories: self.categories.values().cloned().collect(),
            total_count: self.events.total_count(),
        }
    }

    fn icon_for(&self, category: &str) -> &str {
        self.category_icons
            .get(category)
            .map(String::as_str)
            .unwrap_or(DEFAULT_CATEGORY_ICON)
    }

    /// 应用一个通知或取消 Entity，表有变化时返回 `true`
    pub fn apply(&mut self, entity: &Entity, sink: &EntitySink) -> bool {
        let event_id = entity.event_id();

        if entity.is_cancel() {
            if self.events.remove(event_id).is_none() {
                debug!(event_id = %event_id, "Cancel for unknown event ignored");
                return false;
            }
            debug!(event_id = %event_id, "Event cancelled");
        } else if self.events.upsert(entity) {
            debug!(event_id = %event_id, category = entity.event_category(), "Event created");
        }

        self.rebuild(sink);
        true
    }

    /// 从事件表重建全部可见状态
    pub fn rebuild(&mut self, sink: &EntitySink) {
        for presentation in self.categories.values_mut() {
            presentation.menu.clear();
            presentation.deletion_candidate = true;
        }

        for record in self.events.iter() {
            if !self.categories.contains_key(&record.category) {
                info!(category = %record.category, "Creating category presentation");
                let presentation = CategoryPresentation::new(&record.category, self.icon_for(&record.category));
                self.categories.insert(record.category.clone(), presentation);
            }
            if let Some(presentation) = self.categories.get_mut(&record.category) {
                presentation.deletion_candidate = false;
                append_record(&mut presentation.menu, record, &self.dismiss_label);
            }
        }

        for presentation in self.categories.values_mut() {
            if presentation.deletion_candidate {
                continue;
            }
            let badge = self.events.category_count(&presentation.category);
            presentation.badge = badge;
            presentation.badge_text = self
                .counter_categories
                .contains(&presentation.category)
                .then(|| badge.to_string());
        }

        self.categories.retain(|category, presentation| {
            if presentation.deletion_candidate {
                info!(category = %category, "Destroying category presentation");
            }
            !presentation.deletion_candidate
        });

        let total = self.events.total_count();
        sink.submit(
            Entity::new(Payload::Integer(total), mime::EVENT_COUNT_INFO)
                .with(keys::FAN_OUT, true)
                .with_parameters(TaskParameters::AUTOMATIC),
        );
    }

    /// 把动作序号投递给处理对象；事件不存在或对象已失效时什么都不做
    pub fn trigger_action(&self, event_id: &str, index: usize) -> bool {
        let Some(record) = self.events.get(event_id) else {
            debug!(event_id = %event_id, "Action for unknown event ignored");
            return false;
        };

        match &record.handling_object {
            Some(handle) if handle.deliver(index) => true,
            Some(_) => {
                debug!(event_id = %event_id, index, "Handling object expired, action dropped");
                false
            }
            None => {
                debug!(event_id = %event_id, index, "Event has no handling object");
                false
            }
        }
    }

    /// 用户关闭事件
    pub fn dismiss(&mut self, event_id: &str, sink: &EntitySink) -> bool {
        if self.events.remove(event_id).is_none() {
            debug!(event_id = %event_id, "Dismiss for unknown event ignored");
            return false;
        }
        self.rebuild(sink);
        true
    }
}

impl Default for TrayBackend {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}

impl PresentationBackend for TrayBackend {
    fn method(&self) -> Method {
        Method::Tray
    }

    fn handle(&mut self, entity: &Entity, _rule: &NotificationRule, sink: &EntitySink) {
        self.apply(entity, sink);
    }

    fn command(&mut self, command: BackendCommand, sink: &EntitySink) {
        match command {
            BackendCommand::TriggerAction { event_id, index } => {
                self.trigger_action(&event_id, index);
            }
            BackendCommand::Dismiss { event_id } => {
                self.dismiss(&event_id, sink);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::HubMessage;
    use crate::entity::{HandlingObject, HandlingRef, CANCEL_CATEGORY};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn notify(event_id: &str, category: &str) -> Entity {
        Entity::new(Payload::Empty, mime::NOTIFICATION)
            .with(keys::EVENT_ID, event_id)
            .with(keys::EVENT_CATEGORY, category)
            .with(keys::EXTENDED_TEXT, format!("{} text", event_id))
    }

    fn cancel(event_id: &str) -> Entity {
        Entity::new(Payload::Empty, mime::NOTIFICATION)
            .with(keys::EVENT_ID, event_id)
            .with(keys::EVENT_CATEGORY, CANCEL_CATEGORY)
    }

    fn broadcasts(rx: &mut UnboundedReceiver<HubMessage>) -> Vec<i64> {
        let mut counts = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let HubMessage::Entity(entity) = message {
                if let Payload::Integer(n) = entity.payload() {
                    counts.push(*n);
                }
            }
        }
        counts
    }

    struct Recorder {
        triggered: Mutex<Vec<usize>>,
    }

    impl HandlingObject for Recorder {
        fn notification_action_triggered(&self, index: usize) {
            self.triggered.lock().unwrap().push(index);
        }
    }

    #[test]
    fn test_scenario_count_then_delta() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();

        tray.apply(&notify("dl-1", "Downloads").with(keys::COUNT, 1), &sink);
        tray.apply(&notify("dl-1", "Downloads").with(keys::DELTA_COUNT, 2), &sink);

        assert_eq!(tray.events().get("dl-1").unwrap().count, 3);
        assert_eq!(tray.category("Downloads").unwrap().badge, 3);
    }

    #[test]
    fn test_cancel_on_empty_table_is_noop() {
        let (sink, mut rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        let before = tray.snapshot();

        assert!(!tray.apply(&cancel("x"), &sink));
        assert!(!tray.apply(&cancel("x"), &sink));

        assert!(tray.events().is_empty());
        assert_eq!(tray.snapshot(), before);
        // 没有 Rebuild，也就没有计数广播
        assert!(broadcasts(&mut rx).is_empty());
    }

    #[test]
    fn test_category_destroyed_with_last_record() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();

        tray.apply(&notify("m1", "IM"), &sink);
        tray.apply(&notify("m2", "IM"), &sink);

        assert!(tray.dismiss("m1", &sink));
        assert!(tray.category("IM").is_some());

        assert!(tray.dismiss("m2", &sink));
        assert!(tray.category("IM").is_none());
        assert!(tray.category_names().is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (sink, mut rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        tray.apply(&notify("a", "IM").with(keys::NOTIFICATION_ACTIONS, vec!["Open".to_string()]), &sink);
        tray.apply(&notify("b", "Downloads").with(keys::VISUAL_PATH, vec!["Torrents".to_string()]), &sink);

        let first = serde_json::to_string(&tray.snapshot()).unwrap();
        tray.rebuild(&sink);
        let second = serde_json::to_string(&tray.snapshot()).unwrap();
        tray.rebuild(&sink);
        let third = serde_json::to_string(&tray.snapshot()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(broadcasts(&mut rx), vec![1, 2, 2, 2]);
    }

    #[test]
    fn test_menu_contents_for_record() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        tray.apply(
            &notify("m1", "IM").with(keys::NOTIFICATION_ACTIONS, vec!["Open".to_string(), "Reply".to_string()]),
            &sink,
        );

        let menu = &tray.category("IM").unwrap().menu;
        assert_eq!(
            menu[..3],
            [
                MenuEntry::Action { label: "Open".into(), event_id: "m1".into(), index: 0 },
                MenuEntry::Action { label: "Reply".into(), event_id: "m1".into(), index: 1 },
                MenuEntry::Dismiss { label: "Dismiss".into(), event_id: "m1".into() },
            ]
        );
    }

    #[test]
    fn test_badge_text_only_for_counter_categories() {
        let (sink, _rx) = EntitySink::channel();
        let config = HubConfig {
            counter_categories: vec!["IM".to_string()],
            ..HubConfig::default()
        };
        let mut tray = TrayBackend::from_config(&config);

        tray.apply(&notify("m1", "IM").with(keys::COUNT, 4), &sink);
        tray.apply(&notify("d1", "Downloads").with(keys::COUNT, 2), &sink);
        tray.apply(&notify("w1", "Weather"), &sink);

        assert_eq!(tray.category("IM").unwrap().badge_text.as_deref(), Some("4"));
        assert_eq!(tray.category("Downloads").unwrap().badge_text, None);
        assert_eq!(tray.category("Downloads").unwrap().badge, 2);
        assert_eq!(tray.category("Downloads").unwrap().icon, "folder-downloads");
        assert_eq!(tray.category("IM").unwrap().icon, "mail-unread-new");
        assert_eq!(tray.category("Weather").unwrap().icon, DEFAULT_CATEGORY_ICON);
    }

    #[test]
    fn test_trigger_action_delivers_to_live_object() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        let recorder = Arc::new(Recorder { triggered: Mutex::new(Vec::new()) });

        tray.apply(
            &notify("m1", "IM").with(keys::HANDLING_OBJECT, HandlingRef::new(&recorder)),
            &sink,
        );

        assert!(tray.trigger_action("m1", 1));
        assert_eq!(*recorder.triggered.lock().unwrap(), vec![1]);
        assert!(!tray.trigger_action("missing", 0));
    }

    #[test]
    fn test_trigger_action_on_expired_object_is_silent() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        let recorder = Arc::new(Recorder { triggered: Mutex::new(Vec::new()) });

        tray.apply(
            &notify("m1", "IM").with(keys::HANDLING_OBJECT, HandlingRef::new(&recorder)),
            &sink,
        );
        drop(recorder);

        assert!(!tray.trigger_action("m1", 0));
        // 记录本身仍然保留
        assert!(tray.events().contains("m1"));
    }

    #[test]
    fn test_reenter_after_removal_creates_fresh_record() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();

        tray.apply(&notify("x", "IM").with(keys::COUNT, 5), &sink);
        tray.apply(&cancel("x"), &sink);
        tray.apply(&notify("x", "IM").with(keys::DELTA_COUNT, 1), &sink);

        assert_eq!(tray.events().get("x").unwrap().count, 1);
    }

    #[test]
    fn test_commands_route_to_actions() {
        let (sink, _rx) = EntitySink::channel();
        let mut tray = TrayBackend::default();
        tray.apply(&notify("m1", "IM"), &sink);

        tray.command(BackendCommand::Dismiss { event_id: "m1".into() }, &sink);
        assert!(tray.events().is_empty());

        // 未知事件
        tray.command(BackendCommand::Dismiss { event_id: "m1".into() }, &sink);
        tray.command(BackendCommand::TriggerAction { event_id: "m1".into(), index: 0 }, &sink);
    }
}
