//! 配置 - `~/.config/notification-hub/config.json`
//!
//! 读取优先级：
//! 1. 命令行 `--config`
//! 2. 环境变量 `NHUB_CONFIG`
//! 3. `~/.config/notification-hub/config.json`
//!
//! 文件不存在时使用默认值。

use crate::coordinator::DEFAULT_DRAIN_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "NHUB_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// 启动时加载的规则文件（JSON 数组）
    pub rules_file: Option<PathBuf>,
    /// 托盘徽标显示数字的类别
    pub counter_categories: Vec<String>,
    /// 类别 -> 图标名
    pub category_icons: HashMap<String, String>,
    pub dismiss_label: String,
    pub drain_limit: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            counter_categories: Vec::new(),
            category_icons: default_category_icons(),
            dismiss_label: "Dismiss".to_string(),
            drain_limit: DEFAULT_DRAIN_LIMIT,
        }
    }
}

fn default_category_icons() -> HashMap<String, String> {
    [
        ("Downloads", "folder-downloads"),
        ("IM", "mail-unread-new"),
        ("Organizer", "view-calendar"),
        ("Generic", "preferences-desktop-notification-bell"),
        ("PackageManager", "system-software-update"),
        ("MediaPlayer", "applications-multimedia"),
    ]
    .into_iter()
    .map(|(category, icon)| (category.to_string(), icon.to_string()))
    .collect()
}

impl HubConfig {
    /// 默认配置文件路径
    pub fn path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::home_dir().map(|home| home.join(".config/notification-hub/config.json"))
    }

    /// 从默认位置加载
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// 从指定文件加载，文件不存在时返回默认值
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        // 规则文件的相对路径以配置文件所在目录为基准
        if let (Some(rules), Some(dir)) = (config.rules_file.as_mut(), path.parent()) {
            if rules.is_relative() {
                *rules = dir.join(&*rules);
            }
        }

        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }
}
