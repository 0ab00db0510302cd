//! Matched-filter and event-search core for meteor head-echo radar data.
//!
//! The crate turns raw in-phase/quadrature voltage recordings into discrete
//! detection events. A Doppler-delay matched filter reduces each pulse to a
//! set of best-match statistics, a Gaussian noise model and sliding-window
//! coherence counters adapt the detection thresholds, a fixed battery of
//! criteria selects candidate pulses, and a run-length clusterer turns the
//! candidates into non-overlapping head-echo and trail events.
//!
//! File parsing, storage, plotting and orbit determination are owned by
//! external layers; this core consumes an in-memory [`data::RawSamples`]
//! block plus a [`data::WaveformModel`] and produces [`events::Event`]
//! records.

pub mod config;
pub mod data;
pub mod events;
pub mod gmf;
pub mod math;
pub mod noise;
pub mod prelude;

pub use config::SearchConfig;
pub use data::{RawSamples, WaveformModel};
pub use events::{search, Event, EventKind, SearchOutcome};
pub use gmf::{DopplerGrid, PulseStatistics};
pub use noise::GaussianNoise;
pub use prelude::{CancelToken, SearchError, SearchResult};
