//! 通知聚合 - 规则匹配、通用处理器与展示后端
//!
//! # 数据流
//! 1. 生产者发出 `x-app/notification` Entity（见 [`make_notification`]）
//! 2. [`GeneralHandler`] 用 [`RuleMatcher`] 找出所有匹配规则
//! 3. 每条规则的每个展示方式交给对应的 [`PresentationBackend`]
//! 4. 后端在自己的事件表里聚合，并重建展示状态
//!
//! # 使用示例
//! ```ignore
//! use notification_hub::notification::{make_notification, HubBuilder, NotificationDraft};
//!
//! let mut coordinator = HubBuilder::from_default_config()?.build()?;
//! let sink = coordinator.sink();
//! sink.submit(make_notification(NotificationDraft::new("IM", "m1", "alice", "hi")));
//! coordinator.drain();
//! ```

pub mod backend;
pub mod backends;
pub mod builder;
pub mod event;
pub mod general;
pub mod matcher;
pub mod priority;
pub mod rule;
pub mod store;

pub use backend::{BackendCommand, PresentationBackend};
pub use builder::HubBuilder;
pub use event::{make_cancel, make_notification, NotificationDraft};
pub use general::{GeneralHandler, HandleOutcome};
pub use matcher::RuleMatcher;
pub use priority::{get_priority, parse_priority, Priority};
pub use rule::{FieldMatch, MatchOp, Method, MethodParams, Methods, NotificationRule, RuleDefinition};
pub use store::RuleStore;
