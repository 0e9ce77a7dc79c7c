//! 声音后端 - 把播放请求作为新 Entity 发给分发器
//!
//! 本身不播放音频，由注册了 `x-app/audio-play` 的 provider 负责。

use crate::coordinator::EntitySink;
use crate::entity::{keys, mime, Entity, Payload, TaskParameters};
use crate::notification::backend::PresentationBackend;
use crate::notification::rule::{Method, MethodParams, NotificationRule};
use std::any::Any;
use tracing::debug;

#[derive(Debug, Default)]
pub struct AudioBackend {
    played: u64,
}

impl AudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发出的播放请求数
    pub fn played(&self) -> u64 {
        self.played
    }
}

impl PresentationBackend for AudioBackend {
    fn method(&self) -> Method {
        Method::Audio
    }

    fn handle(&mut self, entity: &Entity, rule: &NotificationRule, sink: &EntitySink) {
        if entity.is_cancel() {
            return;
        }

        let Some(MethodParams::Audio { file }) = rule.params(Method::Audio) else {
            debug!(rule = %rule.name, "Audio rule without audio file");
            return;
        };

        debug!(event_id = entity.event_id(), file = %file.display(), "Requesting audio playback");
        sink.submit(
            Entity::new(Payload::Path(file.clone()), mime::AUDIO_PLAY)
                .with(keys::EVENT_ID, entity.event_id())
                .with_parameters(TaskParameters::AUTOMATIC | TaskParameters::HANDLE_ONLY),
        );
        self.played += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
