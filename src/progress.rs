//! Observer trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionObserver>`] via
//! [`crate::config::EngineConfigBuilder::observer`] (or
//! [`crate::Engine::set_observer`]) to be told when a conversion starts,
//! when each sub-pipeline finishes, and how the conversion ended.
//!
//! # Example
//!
//! ```rust
//! use zmarkdown::{ConversionObserver, EngineConfig, PipelineKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     pipelines: AtomicUsize,
//! }
//!
//! impl ConversionObserver for CountingObserver {
//!     fn on_pipeline_complete(&self, _kind: PipelineKind, _elapsed_ms: u64) {
//!         self.pipelines.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { pipelines: AtomicUsize::new(0) });
//!
//! let config = EngineConfig::builder()
//!     .observer(observer.clone() as Arc<dyn ConversionObserver>)
//!     .build()
//!     .unwrap();
//! let output = zmarkdown::convert("Hello *world*", &config).unwrap();
//! assert_eq!(output.html, "<p>Hello <em>world</em></p>");
//! assert_eq!(observer.pipelines.load(Ordering::SeqCst), 4);
//! ```

use crate::error::PipelineKind;
use crate::output::ConversionStats;
use std::sync::Arc;

/// Called by the engine as a conversion progresses.
///
/// All methods default to no-ops so implementors only override what they
/// care about. The engine itself is single-threaded, but one observer may be
/// shared by engines on several threads, hence `Send + Sync`.
pub trait ConversionObserver: Send + Sync {
    /// Called once the source has been normalised.
    ///
    /// # Arguments
    /// * `lines`: number of lines entering the preprocess pipeline
    fn on_conversion_start(&self, lines: usize) {
        let _ = lines;
    }

    /// Called after each of the four sub-pipelines.
    fn on_pipeline_complete(&self, kind: PipelineKind, elapsed_ms: u64) {
        let _ = (kind, elapsed_ms);
    }

    /// Called after serialisation, with the final statistics.
    fn on_conversion_complete(&self, stats: &ConversionStats) {
        let _ = stats;
    }

    /// Called when a stage fails and the conversion is abandoned.
    ///
    /// # Arguments
    /// * `error`: human-readable error description
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// Shared observer handle, as stored in [`crate::config::EngineConfig`].
pub type Observer = Arc<dyn ConversionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        started: AtomicUsize,
        kinds: Mutex<Vec<PipelineKind>>,
        errors: AtomicUsize,
    }

    impl ConversionObserver for Recording {
        fn on_conversion_start(&self, lines: usize) {
            self.started.store(lines, Ordering::SeqCst);
        }

        fn on_pipeline_complete(&self, kind: PipelineKind, _elapsed_ms: u64) {
            self.kinds.lock().unwrap().push(kind);
        }

        fn on_conversion_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_conversion_start(3);
        obs.on_pipeline_complete(PipelineKind::Block, 1);
        obs.on_conversion_complete(&ConversionStats::default());
        obs.on_conversion_error("boom");
    }

    #[test]
    fn recording_observer_receives_events() {
        let obs = Recording::default();
        obs.on_conversion_start(12);
        for kind in PipelineKind::ALL {
            obs.on_pipeline_complete(kind, 0);
        }
        obs.on_conversion_error("stage failed");
        assert_eq!(obs.started.load(Ordering::SeqCst), 12);
        assert_eq!(*obs.kinds.lock().unwrap(), PipelineKind::ALL);
        assert_eq!(obs.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: Observer = Arc::new(NoopObserver);
        obs.on_conversion_start(1);
    }
}
