//! Notification Hub - Entity 分发与通知聚合

pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod entity;
pub mod notification;

pub use config::HubConfig;
pub use coordinator::{Coordinator, EntitySink, HubMessage};
pub use dispatcher::{EntityDispatcher, RouteOutcome};
pub use entity::{
    CapabilityProvider, CapabilityResponse, CapabilityTier, Entity, HandlingObject, HandlingRef,
    Payload, ProviderRole, TaskParameters, Variant,
};
pub use notification::{
    make_cancel, make_notification, GeneralHandler, HubBuilder, Method, NotificationRule,
    NotificationDraft, PresentationBackend, RuleMatcher, RuleStore,
};
