//! 事件表 - 后端私有的聚合状态
//!
//! EventID 是表内唯一键。记录在首次出现时创建，之后每个同 ID 的 Entity
//! 原位更新，取消或用户关闭时删除。删除后同 ID 再出现会创建新记录。

use crate::entity::{keys, Entity, HandlingRef, Variant};
use crate::notification::priority::get_priority;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 通知图标
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pixmap {
    /// Entity 自带的图像数据
    Data(Vec<u8>),
    /// 主题图标名
    Themed(String),
}

impl Pixmap {
    /// 优先使用 Entity 自带的图像，否则按优先级选主题图标
    pub fn for_entity(entity: &Entity) -> Self {
        match entity.get(keys::NOTIFICATION_PIXMAP) {
            Some(Variant::Bytes(data)) if !data.is_empty() => Pixmap::Data(data.clone()),
            _ => Pixmap::Themed(get_priority(entity).icon_name().to_string()),
        }
    }
}

/// 单个事件的聚合记录
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event_id: String,
    pub category: String,
    /// 始终 >= 0
    pub count: i64,
    pub extended_text: String,
    pub full_text: String,
    pub visual_path: Vec<String>,
    pub actions: Vec<String>,
    pub pixmap: Pixmap,
    pub handling_object: Option<HandlingRef>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl EventRecord {
    /// 用首个 Entity 初始化，计数从 0 开始
    fn seed(event_id: &str, entity: &Entity) -> Self {
        let now = Utc::now();
        Self {
            event_id: event_id.to_string(),
            category: entity.event_category().to_string(),
            count: 0,
            extended_text: String::new(),
            full_text: String::new(),
            visual_path: entity.get_string_list(keys::VISUAL_PATH),
            actions: entity.get_string_list(keys::NOTIFICATION_ACTIONS),
            pixmap: Pixmap::for_entity(entity),
            handling_object: entity.handling_object(),
            first_seen: now,
            last_updated: now,
        }
    }

    /// 非零增量优先，否则按绝对值设置（缺省 1）
    fn apply_count(&mut self, entity: &Entity) {
        let delta = entity.get_i64(keys::DELTA_COUNT).unwrap_or(0);
        let count = if delta != 0 {
            self.count.saturating_add(delta)
        } else {
            entity.get_i64(keys::COUNT).unwrap_or(1)
        };
        self.count = count.max(0);
    }

    /// 文本和图标总是取最新 Entity 的值
    fn apply_latest(&mut self, entity: &Entity) {
        self.extended_text = entity
            .get_str(keys::EXTENDED_TEXT)
            .unwrap_or_default()
            .to_string();
        self.full_text = entity.get_str(keys::FULL_TEXT).unwrap_or_default().to_string();
        self.pixmap = Pixmap::for_entity(entity);
        self.last_updated = Utc::now();
    }
}

/// 事件表，按 EventID 排序以保证 Rebuild 输出稳定
#[derive(Debug, Default)]
pub struct EventTable {
    events: BTreeMap<String, EventRecord>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建或更新记录，返回是否新建
    pub fn upsert(&mut self, entity: &Entity) -> bool {
        let event_id = entity.event_id();
        let created = !self.events.contains_key(event_id);

        let record = self
            .events
            .entry(event_id.to_string())
            .or_insert_with(|| EventRecord::seed(event_id, entity));
        record.apply_count(entity);
        record.apply_latest(entity);

        created
    }

    pub fn remove(&mut self, event_id: &str) -> Option<EventRecord> {
        self.events.remove(event_id)
    }

    pub fn get(&self, event_id: &str) -> Option<&EventRecord> {
        self.events.get(event_id)
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.values()
    }

    /// 所有记录的计数之和
    pub fn total_count(&self) -> i64 {
        self.events.values().map(|r| r.count).sum()
    }

    /// 某个类别的计数之和
    pub fn category_count(&self, category: &str) -> i64 {
        self.events
            .values()
            .filter(|r| r.category == category)
            .map(|r| r.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{mime, Payload};

    fn base(event_id: &str) -> Entity {
        Entity::new(Payload::Empty, mime::NOTIFICATION)
            .with(keys::EVENT_ID, event_id)
            .with(keys::EVENT_CATEGORY, "Downloads")
    }

    #[test]
    fn test_new_record_defaults_to_count_one() {
        let mut table = EventTable::new();
        assert!(table.upsert(&base("dl-1")));
        assert_eq!(table.get("dl-1").unwrap().count, 1);
    }

    #[test]
    fn test_delta_accumulates() {
        let mut table = EventTable::new();
        for _ in 0..3 {
            table.upsert(&base("dl-1").with(keys::DELTA_COUNT, 1));
        }
        assert_eq!(table.get("dl-1").unwrap().count, 3);
    }

    #[test]
    fn test_delta_and_absolute_are_equivalent() {
        let mut by_delta = EventTable::new();
        for _ in 0..3 {
            by_delta.upsert(&base("x").with(keys::DELTA_COUNT, 1));
        }

        let mut by_count = EventTable::new();
        by_count.upsert(&base("x").with(keys::COUNT, 3));

        assert_eq!(by_delta.get("x").unwrap().count, by_count.get("x").unwrap().count);
    }

    #[test]
    fn test_zero_delta_falls_back_to_absolute() {
        let mut table = EventTable::new();
        table.upsert(&base("x").with(keys::COUNT, 5));
        table.upsert(&base("x").with(keys::DELTA_COUNT, 0).with(keys::COUNT, 2));
        assert_eq!(table.get("x").unwrap().count, 2);

        // 缺省绝对值为 1
        table.upsert(&base("x"));
        assert_eq!(table.get("x").unwrap().count, 1);
    }

    #[test]
    fn test_count_never_negative() {
        let mut table = EventTable::new();
        table.upsert(&base("x").with(keys::COUNT, 1));
        table.upsert(&base("x").with(keys::DELTA_COUNT, -5));
        assert_eq!(table.get("x").unwrap().count, 0);
    }

    #[test]
    fn test_seed_fields_kept_texts_replaced() {
        let mut table = EventTable::new();
        table.upsert(
            &base("x")
                .with(keys::VISUAL_PATH, vec!["Torrents".to_string()])
                .with(keys::NOTIFICATION_ACTIONS, vec!["Open".to_string()])
                .with(keys::EXTENDED_TEXT, "first")
                .with(keys::FULL_TEXT, "first full"),
        );
        table.upsert(
            &Entity::new(Payload::Empty, mime::NOTIFICATION)
                .with(keys::EVENT_ID, "x")
                .with(keys::EVENT_CATEGORY, "Other")
                .with(keys::EXTENDED_TEXT, "second"),
        );

        let record = table.get("x").unwrap();
        assert_eq!(record.category, "Downloads");
        assert_eq!(record.visual_path, vec!["Torrents".to_string()]);
        assert_eq!(record.actions, vec!["Open".to_string()]);
        assert_eq!(record.extended_text, "second");
        assert_eq!(record.full_text, "");
    }

    #[test]
    fn test_pixmap_fallback_by_priority() {
        let entity = base("x").with(keys::PRIORITY, "warning");
        assert_eq!(Pixmap::for_entity(&entity), Pixmap::Themed("dialog-warning".into()));

        let entity = base("x").with(keys::NOTIFICATION_PIXMAP, Variant::Bytes(vec![1, 2, 3]));
        assert_eq!(Pixmap::for_entity(&entity), Pixmap::Data(vec![1, 2, 3]));
    }

    #[test]
    fn test_category_count() {
        let mut table = EventTable::new();
        table.upsert(&base("a").with(keys::COUNT, 2));
        table.upsert(&base("b").with(keys::COUNT, 3));
        table.upsert(
            &Entity::new(Payload::Empty, mime::NOTIFICATION)
                .with(keys::EVENT_ID, "c")
                .with(keys::EVENT_CATEGORY, "IM")
                .with(keys::COUNT, 7),
        );

        assert_eq!(table.category_count("Downloads"), 5);
        assert_eq!(table.category_count("IM"), 7);
        assert_eq!(table.total_count(), 12);
    }
}
