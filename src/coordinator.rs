//! 协调上下文 - 唯一拥有分发器、规则匹配器和所有后端的地方
//!
//! 其他线程/任务只持有 [`EntitySink`]，所有跨边界调用都排队进入同一个
//! mpsc 队列，由 [`Coordinator`] 逐条处理。处理过程中发出的新 Entity
//! 也进入队列，在当前消息处理完之后才会执行，Rebuild 期间不会被重入。

use crate::dispatcher::{EntityDispatcher, RouteOutcome};
use crate::entity::{mime, Entity};
use crate::notification::backend::BackendCommand;
use crate::notification::general::GeneralHandler;
use crate::notification::rule::Method;
use anyhow::Result;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// 单次 drain 默认最多处理的消息数，防止互相发送的 provider 形成死循环
pub const DEFAULT_DRAIN_LIMIT: usize = 10_000;

/// 队列消息
#[derive(Debug)]
pub enum HubMessage {
    Entity(Entity),
    Backend {
        method: Method,
        command: BackendCommand,
    },
    Shutdown,
}

/// 投递入口，可跨线程克隆
#[derive(Debug, Clone)]
pub struct EntitySink {
    tx: UnboundedSender<HubMessage>,
}

impl EntitySink {
    /// 创建一个 sink 和对应的接收端
    pub fn channel() -> (Self, UnboundedReceiver<HubMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 提交 Entity；只保证 "已接受排队"
    pub fn submit(&self, entity: Entity) {
        self.send(HubMessage::Entity(entity));
    }

    /// UI 触发了某个事件的动作
    pub fn trigger_action(&self, method: Method, event_id: impl Into<String>, index: usize) {
        self.send(HubMessage::Backend {
            method,
            command: BackendCommand::TriggerAction {
                event_id: event_id.into(),
                index,
            },
        });
    }

    /// UI 关闭了某个事件
    pub fn dismiss(&self, method: Method, event_id: impl Into<String>) {
        self.send(HubMessage::Backend {
            method,
            command: BackendCommand::Dismiss {
                event_id: event_id.into(),
            },
        });
    }

    pub fn shutdown(&self) {
        self.send(HubMessage::Shutdown);
    }

    fn send(&self, message: HubMessage) {
        if self.tx.send(message).is_err() {
            debug!("Coordinator queue closed, message discarded");
        }
    }
}

/// 协调上下文
pub struct Coordinator {
    dispatcher: EntityDispatcher,
    handler: GeneralHandler,
    sink: EntitySink,
    rx: UnboundedReceiver<HubMessage>,
    drain_limit: usize,
}

impl Coordinator {
    pub fn new(dispatcher: EntityDispatcher, handler: GeneralHandler) -> Self {
        let (sink, rx) = EntitySink::channel();
        Self {
            dispatcher,
            handler,
            sink,
            rx,
            drain_limit: DEFAULT_DRAIN_LIMIT,
        }
    }

    pub fn with_drain_limit(mut self, limit: usize) -> Self {
        self.drain_limit = limit.max(1);
        self
    }

    /// 给生产者用的投递入口
    pub fn sink(&self) -> EntitySink {
        self.sink.clone()
    }

    pub fn dispatcher(&self) -> &EntityDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EntityDispatcher {
        &mut self.dispatcher
    }

    pub fn handler(&self) -> &GeneralHandler {
        &self.handler
    }

    /// 处理一条消息，收到 `Shutdown` 时返回 `false`
    pub fn process(&mut self, message: HubMessage) -> bool {
        match message {
            HubMessage::Entity(entity) => {
                self.route_entity(entity);
                true
            }
            HubMessage::Backend { method, command } => {
                self.handler.command(method, command, &self.sink);
                true
            }
            HubMessage::Shutdown => false,
        }
    }

    fn route_entity(&mut self, entity: Entity) {
        if is_notification_mime(entity.mime()) {
            let outcome = self.handler.handle(&entity, &self.sink);
            debug!(mime = entity.mime(), outcome = ?outcome, "Notification entity handled");
            return;
        }

        match self.dispatcher.route(&entity, &self.sink) {
            RouteOutcome::Dropped => {
                debug!(mime = entity.mime(), "Entity not routed");
            }
            RouteOutcome::Delivered { providers } => {
                debug!(mime = entity.mime(), providers = ?providers, "Entity routed");
            }
            RouteOutcome::DeliveredWithErrors { providers, failed } => {
                warn!(mime = entity.mime(), providers = ?providers, failed = ?failed, "Entity routed with errors");
            }
        }
    }

    /// 同步处理队列中已有的消息（包括处理中新产生的），返回处理数量
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while processed < self.drain_limit {
            match self.rx.try_recv() {
                Ok(message) => {
                    processed += 1;
                    if !self.process(message) {
                        break;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if self.stopped_at_limit(processed) {
            warn!(limit = self.drain_limit, "Drain limit reached, messages left in queue");
        }
        processed
    }

    /// 达到上限且队列里还有消息
    fn stopped_at_limit(&self, processed: usize) -> bool {
        processed >= self.drain_limit && !self.rx.is_empty()
    }

    /// 事件循环，直到收到 `Shutdown`
    ///
    /// Coordinator 自己也持有一个 sink，所以队列不会因为生产者全部退出而关闭。
    pub async fn run(mut self) -> Result<Self> {
        info!("Coordinator started");
        while let Some(message) = self.rx.recv().await {
            if !self.process(message) {
                break;
            }
        }
        info!("Coordinator stopped");
        Ok(self)
    }
}

/// 交给通知处理器而不是通用分发器的 MIME
pub fn is_notification_mime(mime_tag: &str) -> bool {
    mime_tag == mime::NOTIFICATION || mime_tag == mime::RULE_CREATE
}
