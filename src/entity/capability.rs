//! 能力查询协议
//!
//! 每个组件实现 [`CapabilityProvider`]：先回答 "能否处理、把握多大"，
//! 被选中后再执行处理副作用。

use super::Entity;
use crate::coordinator::EntitySink;
use anyhow::Result;
use std::cmp::Ordering;

/// 能力等级，越靠后越有把握
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityTier {
    /// 结构上无法处理（不是 "暂时忙"）
    Reject,
    Warning,
    Ideal,
    Critical,
}

impl CapabilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityTier::Reject => "reject",
            CapabilityTier::Warning => "warning",
            CapabilityTier::Ideal => "ideal",
            CapabilityTier::Critical => "critical",
        }
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 查询结果：等级 + 同级内的子排名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityResponse {
    pub tier: CapabilityTier,
    pub sub_rank: i32,
}

impl CapabilityResponse {
    pub const REJECT: Self = Self::new(CapabilityTier::Reject);

    pub const fn new(tier: CapabilityTier) -> Self {
        Self { tier, sub_rank: 0 }
    }

    pub const fn reject() -> Self {
        Self::REJECT
    }

    pub const fn warning() -> Self {
        Self::new(CapabilityTier::Warning)
    }

    pub const fn ideal() -> Self {
        Self::new(CapabilityTier::Ideal)
    }

    pub const fn critical() -> Self {
        Self::new(CapabilityTier::Critical)
    }

    pub const fn with_sub_rank(mut self, sub_rank: i32) -> Self {
        self.sub_rank = sub_rank;
        self
    }

    pub fn is_reject(&self) -> bool {
        self.tier == CapabilityTier::Reject
    }
}

impl PartialOrd for CapabilityResponse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapabilityResponse {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then(self.sub_rank.cmp(&other.sub_rank))
    }
}

/// provider 的角色，用于 `DOWNLOAD_ONLY` / `HANDLE_ONLY` 过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    Downloader,
    Handler,
    Both,
}

impl ProviderRole {
    pub fn can_download(&self) -> bool {
        matches!(self, ProviderRole::Downloader | ProviderRole::Both)
    }

    pub fn can_handle(&self) -> bool {
        matches!(self, ProviderRole::Handler | ProviderRole::Both)
    }
}

/// 能力提供者
pub trait CapabilityProvider: Send + Sync {
    /// 名称（用于日志）
    fn name(&self) -> &str;

    fn role(&self) -> ProviderRole {
        ProviderRole::Both
    }

    /// 纯查询，无副作用，应尽快返回
    fn query(&self, entity: &Entity) -> CapabilityResponse;

    /// 执行处理副作用；新的 Entity 只能通过 `sink` 排队发出
    fn accept(&self, entity: &Entity, sink: &EntitySink) -> Result<()>;
}
