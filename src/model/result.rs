// src/model/result.rs

use crate::model::media_package::MediaPackage;
use crate::model::state::Action;
use crate::types::Properties;

/// Outcome of a handler call. Never persisted on its own.
///
/// Handlers may return `None` instead, which the orchestrator treats like
/// [`OperationResult::proceed`] with no changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationResult {
    pub action: Action,
    /// Replaces the workflow's media package when set.
    pub media_package: Option<MediaPackage>,
    /// Merged into the workflow configuration.
    pub properties: Properties,
    pub allow_continue: bool,
    pub allow_abort: bool,
    /// Milliseconds spent waiting in a queue on behalf of this operation.
    pub time_in_queue: u64,
}

impl OperationResult {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            allow_continue: true,
            allow_abort: true,
            ..Self::default()
        }
    }

    pub fn proceed() -> Self {
        Self::new(Action::Continue)
    }

    pub fn pause() -> Self {
        Self::new(Action::Pause)
    }

    pub fn skip() -> Self {
        Self::new(Action::Skip)
    }

    pub fn with_media_package(mut self, media_package: MediaPackage) -> Self {
        self.media_package = Some(media_package);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_pause_controls(mut self, allow_continue: bool, allow_abort: bool) -> Self {
        self.allow_continue = allow_continue;
        self.allow_abort = allow_abort;
        self
    }

    pub fn with_time_in_queue(mut self, millis: u64) -> Self {
        self.time_in_queue = millis;
        self
    }
}
