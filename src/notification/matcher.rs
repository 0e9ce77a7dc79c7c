//! 规则匹配 - 把通知 Entity 映射到零到多条规则
//!
//! 与通用分发器不同，这里返回所有匹配的规则（扇出）。
//! 对取消类别的 Entity，返回当初为同一 EventID 匹配过的规则，
//! 让创建事件的那组展示方式有机会移除它。

use super::rule::NotificationRule;
use super::store::RuleStore;
use crate::entity::{mime, Entity};
use std::collections::HashMap;
use tracing::{debug, info};

/// 规则匹配器
#[derive(Debug, Default)]
pub struct RuleMatcher {
    store: RuleStore,
    /// EventID -> 创建时匹配的规则名
    applied: HashMap<String, Vec<String>>,
}

impl RuleMatcher {
    pub fn new(store: RuleStore) -> Self {
        Self {
            store,
            applied: HashMap::new(),
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RuleStore {
        &mut self.store
    }

    /// 匹配规则
    pub fn match_entity(&mut self, entity: &Entity) -> Vec<NotificationRule> {
        if entity.mime() != mime::NOTIFICATION {
            return Vec::new();
        }

        let event_id = entity.event_id();

        if entity.is_cancel() {
            let names = self.applied.remove(event_id).unwrap_or_default();
            return names
                .iter()
                .filter_map(|name| self.store.get(name))
                .cloned()
                .collect();
        }

        let mut matched = Vec::new();
        for rule in self.store.rules_mut() {
            if !rule.enabled || !rule.matches(entity) {
                continue;
            }
            if rule.single_shot {
                info!(rule = %rule.name, "Single-shot rule fired, disabling");
                rule.enabled = false;
            }
            matched.push(rule.clone());
        }

        if matched.is_empty() {
            debug!(
                category = entity.event_category(),
                event_type = entity.event_type(),
                "No notification rule matched"
            );
        } else if !event_id.is_empty() {
            let names = self.applied.entry(event_id.to_string()).or_default();
            for rule in &matched {
                if !names.contains(&rule.name) {
                    names.push(rule.name.clone());
                }
            }
        }

        matched
    }

    /// 忘记某个事件的匹配记录
    pub fn forget(&mut self, event_id: &str) {
        self.applied.remove(event_id);
    }

    /// 仍在跟踪的事件数
    pub fn tracked_events(&self) -> usize {
        self.applied.len()
    }
}
