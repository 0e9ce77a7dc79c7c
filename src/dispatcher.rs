//! Entity 分发器 - 查询所有 provider 并选出最合适的接收者
//!
//! # 选择规则
//! 1. 按注册顺序查询每个 provider
//! 2. 过滤掉 `Reject`
//! 3. `DOWNLOAD_ONLY` / `HANDLE_ONLY` 按角色再过滤
//! 4. 按 (等级降序, 子排名降序, 注册顺序升序) 排序
//! 5. 默认只调用最优的一个；Entity 标记 `FanOut` 时调用所有 `Ideal` 及以上的 provider
//! 6. 没有候选时静默丢弃

use crate::coordinator::EntitySink;
use crate::entity::{CapabilityProvider, CapabilityResponse, CapabilityTier, Entity, TaskParameters};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 分发结果
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// 已交给这些 provider
    Delivered { providers: Vec<String> },
    /// 部分或全部 provider 处理出错（不重试）
    DeliveredWithErrors {
        providers: Vec<String>,
        failed: Vec<String>,
    },
    /// 没有合格的 provider
    Dropped,
}

impl RouteOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, RouteOutcome::Dropped)
    }
}

/// 排序后的候选
#[derive(Clone)]
struct Candidate {
    order: usize,
    response: CapabilityResponse,
    provider: Arc<dyn CapabilityProvider>,
}

/// Entity 分发器
pub struct EntityDispatcher {
    /// 按注册顺序保存的 provider
    providers: Vec<Arc<dyn CapabilityProvider>>,
}

impl EntityDispatcher {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// 注册 provider，注册顺序即平局时的优先顺序
    pub fn register(&mut self, provider: Arc<dyn CapabilityProvider>) {
        info!(provider = provider.name(), order = self.providers.len(), "Registering capability provider");
        self.providers.push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn ranked_candidates(&self, entity: &Entity) -> Vec<Candidate> {
        let params = entity.parameters();

        let mut candidates: Vec<Candidate> = self
            .providers
            .iter()
            .enumerate()
            .map(|(order, provider)| Candidate {
                order,
                response: provider.query(entity),
                provider: Arc::clone(provider),
            })
            .filter(|c| !c.response.is_reject())
            .filter(|c| {
                let role = c.provider.role();
                if params.contains(TaskParameters::DOWNLOAD_ONLY) && !role.can_download() {
                    return false;
                }
                if params.contains(TaskParameters::HANDLE_ONLY) && !role.can_handle() {
                    return false;
                }
                true
            })
            .collect();

        candidates.sort_by(|a, b| b.response.cmp(&a.response).then(a.order.cmp(&b.order)));
        candidates
    }

    /// 返回将被调用的 provider 名称（按调用顺序），不执行副作用
    pub fn select(&self, entity: &Entity) -> Vec<String> {
        Self::choose(entity, self.ranked_candidates(entity))
            .iter()
            .map(|c| c.provider.name().to_string())
            .collect()
    }

    fn choose(entity: &Entity, ranked: Vec<Candidate>) -> Vec<Candidate> {
        if ranked.is_empty() {
            return ranked;
        }

        if entity.wants_fan_out() {
            let confident: Vec<Candidate> = ranked
                .iter()
                .filter(|c| c.response.tier >= CapabilityTier::Ideal)
                .cloned()
                .collect();
            if !confident.is_empty() {
                return confident;
            }
        }

        ranked.into_iter().take(1).collect()
    }

    /// 分发 Entity
    pub fn route(&self, entity: &Entity, sink: &EntitySink) -> RouteOutcome {
        let chosen = Self::choose(entity, self.ranked_candidates(entity));

        if chosen.is_empty() {
            debug!(mime = entity.mime(), "No eligible provider, entity dropped");
            return RouteOutcome::Dropped;
        }

        let mut providers = Vec::with_capacity(chosen.len());
        let mut failed = Vec::new();

        for candidate in chosen {
            let name = candidate.provider.name().to_string();
            debug!(
                provider = %name,
                mime = entity.mime(),
                tier = %candidate.response.tier,
                sub_rank = candidate.response.sub_rank,
                "Delivering entity"
            );

            let result = panic::catch_unwind(AssertUnwindSafe(|| candidate.provider.accept(entity, sink)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(provider = %name, mime = entity.mime(), error = %e, "Provider failed to accept entity");
                    failed.push(name.clone());
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    warn!(provider = %name, mime = entity.mime(), error = %message, "Provider panicked while accepting entity");
                    failed.push(name.clone());
                }
            }
            providers.push(name);
        }

        if failed.is_empty() {
            RouteOutcome::Delivered { providers }
        } else {
            RouteOutcome::DeliveredWithErrors { providers, failed }
        }
    }
}

impl Default for EntityDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
