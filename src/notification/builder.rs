//! 通知中心构建器 - 加载配置和规则，装配协调器

use super::general::GeneralHandler;
use super::matcher::RuleMatcher;
use super::store::RuleStore;
use crate::config::HubConfig;
use crate::coordinator::Coordinator;
use crate::dispatcher::EntityDispatcher;
use crate::entity::CapabilityProvider;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// 通知中心构建器
pub struct HubBuilder {
    config: HubConfig,
    rules_file: Option<PathBuf>,
    providers: Vec<Arc<dyn CapabilityProvider>>,
}

impl HubBuilder {
    pub fn new(config: HubConfig) -> Self {
        Self {
            rules_file: config.rules_file.clone(),
            config,
            providers: Vec::new(),
        }
    }

    /// 从默认配置文件构建
    pub fn from_default_config() -> Result<Self> {
        Ok(Self::new(HubConfig::load()?))
    }

    /// 覆盖配置中的规则文件
    pub fn rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_file = Some(path.into());
        self
    }

    /// 追加一个通用 provider
    pub fn provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// 只加载规则
    pub fn load_rules(&self) -> Result<RuleStore> {
        let mut store = RuleStore::new();
        if let Some(path) = &self.rules_file {
            store
                .load_file(path)
                .with_context(|| format!("failed to load rules from {}", path.display()))?;
        }
        Ok(store)
    }

    /// 构建协调器，使用全部内置展示后端
    pub fn build(self) -> Result<Coordinator> {
        let store = self.load_rules()?;
        let handler = GeneralHandler::with_default_backends(RuleMatcher::new(store), &self.config);

        let mut dispatcher = EntityDispatcher::new();
        for provider in self.providers {
            dispatcher.register(provider);
        }

        Ok(Coordinator::new(dispatcher, handler).with_drain_limit(self.config.drain_limit))
    }
}
