//! Immutable event records handed to the caller for storage.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::SearchConfig;
use crate::noise::GaussianNoise;

/// What the detection looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// Strong transient reflection from the meteoroid's leading plasma.
    Head,
    /// Longer-lived, fainter ionization trail.
    Trail,
}

/// One detected event. Never mutated after assembly; the caller owns
/// serialization and storage.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub kind: EventKind,
    /// First pulse of the event interval (inclusive).
    pub start_pulse: usize,
    /// Last pulse of the event interval (inclusive).
    pub end_pulse: usize,
    /// Candidate pulse indices that triggered this event.
    pub found_indices: Vec<usize>,
    /// Source file(s) the pulses came from.
    pub files: Vec<PathBuf>,
    /// Event start, seconds since the Unix epoch: the recording start offset
    /// by `start_pulse` inter-pulse periods. `None` when the recording start
    /// is unknown.
    pub start_time: Option<f64>,
    /// When the search that produced this event ran, seconds since the Unix
    /// epoch.
    pub detected_at: f64,
    /// Snapshot of the configuration the search ran with.
    pub config: SearchConfig,
    /// Noise model active during the search, when one could be estimated.
    pub noise: Option<GaussianNoise>,
}

impl Event {
    /// Length of the event interval in pulses.
    pub fn pulse_span(&self) -> usize {
        self.end_pulse - self.start_pulse + 1
    }
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
