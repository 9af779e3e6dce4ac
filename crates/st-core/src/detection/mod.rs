//! Anomaly detectors.
//!
//! A detector is a per-key synchronous state machine: the host feeds it
//! measurements for one stream in arrival order, and it occasionally emits
//! an anomaly event. The changepoint detector is the one shipped here;
//! additional detectors plug in behind the same seam.

pub mod changepoint;

use st_common::{ChangepointEvent, Measurement};

/// Per-key detector contract driven by the host runtime.
///
/// Implementations are purely synchronous and own their state
/// exclusively; the host guarantees in-order delivery within a stream.
pub trait Detector {
    /// Process one measurement, emitting at most one event.
    fn on_measurement(&mut self, measurement: &Measurement) -> Option<ChangepointEvent>;

    /// Discard all learned state, seeding from the given measurement.
    fn reset(&mut self, seed: &Measurement);
}
