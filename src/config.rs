use serde::{Deserialize, Serialize};

use crate::gmf::DopplerGrid;
use crate::prelude::{SearchError, SearchResult};

/// Flat configuration surface for the whole search pipeline.
///
/// All values are plain scalars so a caller can populate the struct from any
/// key-value source. Defaults correspond to the MU-radar campaign settings
/// the detection thresholds were originally tuned against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of voted criteria that must agree for a head-echo candidate.
    pub criteria_n: u32,
    /// Sliding-window length for the Doppler/delay coherence statistics.
    pub move_std_window: usize,

    /// Sigma multiplier for the peak-above-baseline criterion.
    pub xcorr_sigma: f64,
    /// Sigma multiplier for the total-power-above-baseline criterion.
    pub totpow_sigma: f64,
    /// Sigma multiplier on the windowed Doppler std in the sustained regime.
    pub dop_std_sigma: f64,
    /// Sigma multiplier on the windowed delay std in the sustained regime.
    pub start_std_sigma: f64,

    /// Windowed-std limit under which a Doppler window counts as coherent [Hz].
    pub dop_std_coherr: f64,
    /// Windowed-std limit under which a delay window counts as coherent [samples].
    pub start_std_coherr: f64,
    /// Fraction of coherent Doppler windows that flags a sustained signal.
    pub dop_std_coherr_percent: f64,
    /// Fraction of coherent delay windows that flags a sustained signal.
    pub start_std_coherr_percent: f64,

    /// Sigma multiplier used when filtering quiet pulses for the baseline.
    pub pow_std_est: f64,
    /// Correlation-peak level below which a pulse counts as signal-free.
    pub xcorr_noise_limit: f64,

    /// Sigma multiplier for the Doppler excursion criterion (transient regime).
    pub dop_sigma: f64,
    /// Absolute delay excursion from the mean start index (transient regime).
    pub start_pm: f64,

    /// Minimum absolute Doppler shift; rejects zero-Doppler ground clutter [Hz].
    pub min_dop_allowed: f64,
    /// Lowest delay index inside the receiver's observation gate.
    pub min_start_allowed: f64,
    /// Highest delay index inside the receiver's observation gate.
    pub max_start_allowed: f64,

    /// Minimum candidate count for clustering to be trusted at all.
    pub least_ipp_available: usize,
    /// Pulse-index gap that splits a candidate run into two segments.
    pub min_ipp_separation_split: f64,
    /// Smoothed Doppler gap that splits a candidate run [Hz].
    pub min_dop_separation_split: f64,
    /// Smoothed delay gap that splits a candidate run [samples].
    pub min_range_separation_split: f64,

    /// Savitzky-Golay smoothing window (odd, > polyorder).
    pub smoothing_window: usize,
    /// Savitzky-Golay polynomial order.
    pub polyorder: usize,

    /// Pulses added on each side of a kept segment for the rise/fall skirt.
    pub ipp_extend: usize,
    /// Tolerated overlap against externally resolved intervals [pulses].
    pub allow_analysis_overlap: usize,
    /// Maximum tolerated overlap between adjacent head events [pulses].
    pub event_max_overlap: usize,

    /// Doppler search grid lower bound [Hz].
    pub dop_min_freq: f64,
    /// Doppler search grid upper bound [Hz].
    pub dop_max_freq: f64,
    /// Doppler search grid step [Hz].
    pub dop_step_size: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            criteria_n: 3,
            move_std_window: 10,
            xcorr_sigma: 1.0,
            totpow_sigma: 1.5,
            dop_std_sigma: 0.5,
            start_std_sigma: 0.5,
            dop_std_coherr: 7e3,
            start_std_coherr: 13.0,
            dop_std_coherr_percent: 0.6,
            start_std_coherr_percent: 0.7,
            pow_std_est: 3.0,
            xcorr_noise_limit: 0.5,
            dop_sigma: 3.0,
            start_pm: 3.0,
            // 1 kHz radial velocity floor at the 46.5 MHz carrier
            min_dop_allowed: 1e3 * 46.5e6 / 299_792_458.0,
            min_start_allowed: 0.0,
            max_start_allowed: 72.0,
            least_ipp_available: 5,
            min_ipp_separation_split: 20.0,
            min_dop_separation_split: 10e3 * 46.5e6 / 299_792_458.0,
            min_range_separation_split: 4.0,
            smoothing_window: 5,
            polyorder: 2,
            ipp_extend: 10,
            allow_analysis_overlap: 3,
            event_max_overlap: 5,
            dop_min_freq: -30_000.0,
            dop_max_freq: 5_000.0,
            dop_step_size: 1_000.0,
        }
    }
}

impl SearchConfig {
    /// Checks every numeric option against its valid range. Called once at
    /// search invocation; any violation is fatal before work starts.
    pub fn validate(&self) -> SearchResult<()> {
        if self.criteria_n == 0 {
            return Err(config_err("criteria_n must be at least 1"));
        }
        if self.move_std_window < 2 {
            return Err(config_err("move_std_window must be at least 2"));
        }
        if self.dop_step_size <= 0.0 {
            return Err(config_err("dop_step_size must be positive"));
        }
        if self.dop_max_freq < self.dop_min_freq {
            return Err(config_err("dop_max_freq must not be below dop_min_freq"));
        }
        if self.smoothing_window % 2 == 0 || self.smoothing_window <= self.polyorder {
            return Err(config_err(
                "smoothing_window must be odd and larger than polyorder",
            ));
        }
        if self.max_start_allowed < self.min_start_allowed {
            return Err(config_err(
                "max_start_allowed must not be below min_start_allowed",
            ));
        }
        if self.least_ipp_available == 0 {
            return Err(config_err("least_ipp_available must be at least 1"));
        }
        for (name, value) in [
            ("min_ipp_separation_split", self.min_ipp_separation_split),
            ("min_dop_separation_split", self.min_dop_separation_split),
            ("min_range_separation_split", self.min_range_separation_split),
            ("min_dop_allowed", self.min_dop_allowed),
        ] {
            if value < 0.0 {
                return Err(config_err(&format!("{name} must not be negative")));
            }
        }
        Ok(())
    }

    pub fn doppler_grid(&self) -> DopplerGrid {
        DopplerGrid {
            min: self.dop_min_freq,
            max: self.dop_max_freq,
            step: self.dop_step_size,
        }
    }
}

fn config_err(msg: &str) -> SearchError {
    SearchError::Configuration(msg.to_string())
}
