//! Fluent builder for constructing a [`DispatchEngine`].

use std::sync::Arc;

use rank_core::{Clock, DispatchConfig, SystemClock};
use rank_queue::{PositionIntegrityRepairer, QueueStore};
use rank_resilience::Resilience;
use rank_store::Storage;
use rank_trip::TripLifecycle;

use crate::{AllocationPolicy, DispatchEngine, DispatchError, DispatchObserver, DispatchResult, NoopObserver};

/// Fluent builder for [`DispatchEngine<S, O>`].
///
/// # Optional inputs (have defaults)
///
/// | Method          | Default        |
/// |-----------------|----------------|
/// | `.clock(c)`     | `SystemClock`  |
/// | `.observer(o)`  | `NoopObserver` |
///
/// # Example
///
/// ```rust,ignore
/// let engine = DispatchEngineBuilder::new(config, storage)
///     .clock(Arc::new(ManualClock::new(Timestamp(0))))
///     .observer(MyMetrics::default())
///     .build()?;
/// ```
pub struct DispatchEngineBuilder<S: Storage + ?Sized, O: DispatchObserver = NoopObserver> {
    config:   DispatchConfig,
    storage:  Arc<S>,
    clock:    Option<Arc<dyn Clock>>,
    observer: O,
}

impl<S: Storage + ?Sized> DispatchEngineBuilder<S, NoopObserver> {
    pub fn new(config: DispatchConfig, storage: Arc<S>) -> Self {
        Self { config, storage, clock: None, observer: NoopObserver }
    }
}

impl<S: Storage + ?Sized, O: DispatchObserver> DispatchEngineBuilder<S, O> {
    /// Source of record timestamps (trip creation, completion, audit).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn observer<O2: DispatchObserver>(self, observer: O2) -> DispatchEngineBuilder<S, O2> {
        DispatchEngineBuilder {
            config: self.config,
            storage: self.storage,
            clock: self.clock,
            observer,
        }
    }

    /// Validate the configuration and wire the engine's components around
    /// the shared storage handle.
    pub fn build(self) -> DispatchResult<DispatchEngine<S, O>> {
        let classes = self.config.validate().map_err(|e| DispatchError::Config(e.to_string()))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let guard = Resilience::new(&self.config.retry, &self.config.breaker, self.config.seed, clock.clone());
        let seats: Vec<u8> = classes.iter().map(|c| c.seats()).collect();
        tracing::info!(classes = ?seats, allow_upgrade = self.config.allow_upgrade, "dispatch engine ready");

        Ok(DispatchEngine {
            policy:   AllocationPolicy::new(classes, self.config.allow_upgrade),
            queues:   QueueStore::new(self.storage.clone(), clock.clone()),
            repairer: PositionIntegrityRepairer::new(self.storage.clone(), clock.clone()),
            trips:    TripLifecycle::new(self.storage.clone(), clock),
            storage:  self.storage,
            guard,
            config:   self.config,
            observer: self.observer,
        })
    }
}
