//! Poll loop settings

use crate::tables::OperationKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// What a not-found answer from the status query means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Stop and return [`crate::ConvergeError::HandleNotFound`]
    #[default]
    Propagate,
    /// Stop with a `Failure` outcome marked as a vanished handle
    Failure,
}

/// Delay, timeout and not-found handling of one poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between two status queries
    pub delay: Duration,

    /// Overall deadline measured from the first query
    pub timeout: Duration,

    pub not_found: NotFoundPolicy,
}

impl PollSettings {
    pub const fn new(delay: Duration, timeout: Duration) -> Self {
        Self {
            delay,
            timeout,
            not_found: NotFoundPolicy::Propagate,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }
}

/// Per-kind poll settings, falling back to each kind's defaults
#[derive(Debug, Clone, Default)]
pub struct PollProfile {
    overrides: HashMap<OperationKind, PollSettings>,
}

impl PollProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: OperationKind, settings: PollSettings) {
        self.overrides.insert(kind, settings);
    }

    pub fn with(mut self, kind: OperationKind, settings: PollSettings) -> Self {
        self.set(kind, settings);
        self
    }

    pub fn settings(&self, kind: OperationKind) -> PollSettings {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_settings())
    }

    pub fn is_overridden(&self, kind: OperationKind) -> bool {
        self.overrides.contains_key(&kind)
    }
}
