//! 通知聚合端到端测试：规则 -> 通用处理器 -> 托盘事件表 -> Rebuild

use notification_hub::entity::{keys, mime};
use notification_hub::notification::backends::{MenuEntry, TrayBackend, VisualBackend};
use notification_hub::{
    make_cancel, make_notification, Coordinator, Entity, EntityDispatcher, EntitySink,
    GeneralHandler, HandlingObject, HandlingRef, HubConfig, Method, NotificationDraft, Payload,
    RuleMatcher, RuleStore,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

const CATEGORIES: [&str; 3] = ["IM", "Downloads", "Organizer"];

fn rule_entity(name: &str, category: &str, methods: &[&str]) -> Entity {
    Entity::new(Payload::Empty, mime::RULE_CREATE)
        .with(keys::RULE_NAME, name)
        .with(keys::EVENT_CATEGORY, category)
        .with(keys::EVENT_TYPE, "*")
        .with(
            keys::RULE_METHODS,
            methods.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        )
}

/// 托盘 + 弹窗，一条匹配所有类别的规则
fn hub() -> (Coordinator, EntitySink) {
    let config = HubConfig {
        counter_categories: vec!["IM".to_string()],
        ..HubConfig::default()
    };
    let handler = GeneralHandler::new(
        RuleMatcher::new(RuleStore::new()),
        vec![
            Box::new(TrayBackend::from_config(&config)),
            Box::new(VisualBackend::new()),
        ],
    );
    let mut coordinator = Coordinator::new(EntityDispatcher::new(), handler);
    let sink = coordinator.sink();

    sink.submit(rule_entity("everything", "*", &["tray", "visual"]));
    coordinator.drain();
    (coordinator, sink)
}

fn tray(coordinator: &Coordinator) -> &TrayBackend {
    coordinator
        .handler()
        .backend_as::<TrayBackend>(Method::Tray)
        .expect("tray backend registered")
}

fn notify(category: &str, event_id: &str) -> NotificationDraft {
    NotificationDraft::new(category, event_id, "header", format!("text of {}", event_id))
}

#[test]
fn test_delta_applied_after_absolute_count() {
    let (mut hub, sink) = hub();

    sink.submit(make_notification(notify("Downloads", "dl-1").count(1)));
    sink.submit(make_notification(notify("Downloads", "dl-1").delta(2)));
    hub.drain();

    let tray = tray(&hub);
    assert_eq!(tray.events().get("dl-1").unwrap().count, 3);
    assert_eq!(tray.category("Downloads").unwrap().badge, 3);
}

#[test]
fn test_cancel_on_empty_table_is_noop() {
    let (mut hub, sink) = hub();
    let before = serde_json::to_string(&tray(&hub).snapshot()).unwrap();

    sink.submit(make_cancel("tester", "x"));
    sink.submit(make_cancel("tester", "x"));
    hub.drain();

    let tray = tray(&hub);
    assert!(tray.events().is_empty());
    assert!(tray.category_names().is_empty());
    assert_eq!(serde_json::to_string(&tray.snapshot()).unwrap(), before);
}

#[test]
fn test_category_destroyed_with_last_record() {
    let (mut hub, sink) = hub();

    sink.submit(make_notification(notify("IM", "m1")));
    sink.submit(make_notification(notify("IM", "m2")));
    hub.drain();
    assert_eq!(tray(&hub).category("IM").unwrap().badge_text.as_deref(), Some("2"));

    sink.dismiss(Method::Tray, "m1");
    hub.drain();
    assert!(tray(&hub).category("IM").is_some());

    sink.dismiss(Method::Tray, "m2");
    hub.drain();
    assert!(tray(&hub).category("IM").is_none());
    assert!(tray(&hub).events().is_empty());
}

#[test]
fn test_dismissed_events_leave_no_matcher_state() {
    let (mut hub, sink) = hub();

    for n in 0..50 {
        let event_id = format!("e{}", n);
        sink.submit(make_notification(notify("Downloads", &event_id)));
        sink.dismiss(Method::Tray, &event_id);
    }
    hub.drain();

    assert!(tray(&hub).events().is_empty());
    assert_eq!(hub.handler().matcher().tracked_events(), 0);
}

#[test]
fn test_unmatched_entity_never_reaches_backends() {
    let config = HubConfig::default();
    let handler = GeneralHandler::new(
        RuleMatcher::new(RuleStore::new()),
        vec![Box::new(TrayBackend::from_config(&config))],
    );
    let mut hub = Coordinator::new(EntityDispatcher::new(), handler);
    let sink = hub.sink();

    sink.submit(rule_entity("im-only", "IM", &["tray"]));
    sink.submit(make_notification(notify("Downloads", "dl-1")));
    sink.submit(make_notification(notify("IM", "m1")));
    hub.drain();

    let tray = tray(&hub);
    assert!(tray.events().get("dl-1").is_none());
    assert!(tray.events().get("m1").is_some());
}

#[test]
fn test_rule_applies_from_next_entity() {
    let config = HubConfig::default();
    let handler = GeneralHandler::new(
        RuleMatcher::new(RuleStore::new()),
        vec![Box::new(TrayBackend::from_config(&config))],
    );
    let mut hub = Coordinator::new(EntityDispatcher::new(), handler);
    let sink = hub.sink();

    sink.submit(make_notification(notify("IM", "early")));
    sink.submit(rule_entity("im", "IM", &["tray"]));
    sink.submit(make_notification(notify("IM", "late")));
    hub.drain();

    let tray = tray(&hub);
    assert!(!tray.events().contains("early"));
    assert!(tray.events().contains("late"));
}

#[test]
fn test_menu_built_from_visual_path_and_actions() {
    let (mut hub, sink) = hub();

    sink.submit(make_notification(
        notify("IM", "m1")
            .visual_path(["Chats", "alice"])
            .actions(["Open chat", "Mark read"]),
    ));
    hub.drain();

    let menu = &tray(&hub).category("IM").unwrap().menu;
    let MenuEntry::Submenu { title, entries, .. } = &menu[0] else {
        panic!("expected submenu");
    };
    assert_eq!(title, "Chats");
    let MenuEntry::Submenu { title, entries, .. } = &entries[0] else {
        panic!("expected nested submenu");
    };
    assert_eq!(title, "alice");
    assert_eq!(
        entries[..3],
        [
            MenuEntry::Action {
                label: "Open chat".into(),
                event_id: "m1".into(),
                index: 0
            },
            MenuEntry::Action {
                label: "Mark read".into(),
                event_id: "m1".into(),
                index: 1
            },
            MenuEntry::Dismiss {
                label: "Dismiss".into(),
                event_id: "m1".into()
            },
        ]
    );
}

struct ChatWindow {
    actions: Mutex<Vec<usize>>,
}

impl HandlingObject for ChatWindow {
    fn notification_action_triggered(&self, index: usize) {
        self.actions.lock().unwrap().push(index);
    }
}

#[test]
fn test_action_reaches_live_handler_and_skips_expired() {
    let (mut hub, sink) = hub();
    let window = Arc::new(ChatWindow {
        actions: Mutex::new(Vec::new()),
    });

    sink.submit(make_notification(
        notify("IM", "m1")
            .actions(["Open", "Reply"])
            .handling_object(HandlingRef::new(&window)),
    ));
    hub.drain();

    assert!(tray(&hub).trigger_action("m1", 1));
    assert_eq!(*window.actions.lock().unwrap(), vec![1]);

    drop(window);
    assert!(!tray(&hub).trigger_action("m1", 0));
    // 事件仍然存在，只是动作被丢弃
    assert!(tray(&hub).events().contains("m1"));
}

#[test]
fn test_visual_popup_follows_cancel() {
    let (mut hub, sink) = hub();

    sink.submit(make_notification(notify("IM", "m1")));
    hub.drain();
    let visual = hub
        .handler()
        .backend_as::<VisualBackend>(Method::Visual)
        .unwrap();
    assert!(visual.popup("m1").is_some());

    sink.submit(make_cancel("tester", "m1"));
    hub.drain();
    let visual = hub
        .handler()
        .backend_as::<VisualBackend>(Method::Visual)
        .unwrap();
    assert!(visual.popup("m1").is_none());
    assert!(tray(&hub).events().is_empty());
}

/// 简单的线性同余生成器，保证操作序列可复现
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn test_category_exists_iff_live_record() {
    for seed in [1u64, 7, 42, 1234] {
        let (mut hub, sink) = hub();
        let mut rng = Lcg(seed);
        let mut live: BTreeMap<String, &str> = BTreeMap::new();

        for _ in 0..200 {
            let id = rng.next(8);
            let event_id = format!("ev-{}", id);
            let category = CATEGORIES[(id % 3) as usize];

            match rng.next(4) {
                0 | 1 => {
                    sink.submit(make_notification(notify(category, &event_id).delta(1)));
                    live.insert(event_id, category);
                }
                2 => {
                    sink.submit(make_cancel("tester", &event_id));
                    live.remove(&event_id);
                }
                _ => {
                    sink.dismiss(Method::Tray, &event_id);
                    live.remove(&event_id);
                }
            }
            hub.drain();

            let tray = tray(&hub);
            let expected: HashSet<&str> = live.values().copied().collect();
            for category in CATEGORIES {
                assert_eq!(
                    tray.category(category).is_some(),
                    expected.contains(category),
                    "seed {} category {}",
                    seed,
                    category
                );
            }
            assert_eq!(tray.events().len(), live.len());
        }
    }
}
