//! Baseline noise and coherence statistics used to adapt the detection
//! thresholds.
//!
//! Three independent estimates feed the criteria battery:
//! a Gaussian model of the signal-free voltage distribution with chi-squared
//! confidence bounds, sliding-window coherence counters over the per-pulse
//! Doppler/delay series, and mean/std baselines of peak and total power over
//! the quiet pulses.

use log::warn;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::SearchConfig;
use crate::data::RawSamples;
use crate::gmf::PulseStatistics;
use crate::math::stats::{mean, sliding_std, std_dev};
use crate::prelude::{SearchError, SearchResult};

/// Two-tailed confidence level for the noise confidence interval.
pub const DEFAULT_CONFIDENCE: f64 = 1e-6;

/// Gaussian noise model over the interleaved real and imaginary components
/// of the signal-free sample subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNoise {
    pub mean: f64,
    pub std_dev: f64,
    /// Two-sided chi-squared confidence bounds on the standard deviation.
    pub confidence_interval: (f64, f64),
}

/// Estimates the Gaussian noise model from the pulses for which `keep` is
/// true. Returns `None` (with a warning) when the subset is empty: downstream
/// thresholding then simply yields no detections.
pub fn estimate_gaussian(
    raw: &RawSamples,
    keep: &[bool],
    confidence: f64,
) -> Option<GaussianNoise> {
    let mut values = Vec::new();
    for sample in raw.iter_pulses_where(keep) {
        values.push(sample.re);
        values.push(sample.im);
    }
    if values.len() < 2 {
        warn!("no signal-free pulses available, noise model left empty");
        return None;
    }

    let noise_mean = mean(&values);
    let noise_std = std_dev(&values);
    let freedom = (values.len() - 1) as f64;
    let chi2 = match ChiSquared::new(freedom) {
        Ok(dist) => dist,
        Err(_) => {
            warn!("degenerate chi-squared freedom {freedom}, noise model left empty");
            return None;
        }
    };
    let bound = |p: f64| (freedom * noise_std * noise_std / chi2.inverse_cdf(p)).sqrt();
    Some(GaussianNoise {
        mean: noise_mean,
        std_dev: noise_std,
        confidence_interval: (bound(confidence / 2.0), bound(1.0 - confidence / 2.0)),
    })
}

/// Sliding-window variability of the best-Doppler and best-delay series,
/// plus the counters that decide between the transient and sustained-signal
/// search regimes.
#[derive(Debug, Clone)]
pub struct Coherence {
    /// Windowed Doppler std, padded to the pulse count by repeating the
    /// final window's value.
    pub doppler_std: Vec<f64>,
    /// Windowed delay std, padded likewise.
    pub start_std: Vec<f64>,
    /// Number of Doppler windows below the coherence threshold.
    pub doppler_coherence: usize,
    /// Number of delay windows below the coherence threshold.
    pub start_coherence: usize,
    /// Total number of sliding windows the counters were taken over.
    pub window_count: usize,
}

impl Coherence {
    pub fn compute(stats: &PulseStatistics, config: &SearchConfig) -> SearchResult<Self> {
        let window = config.move_std_window;
        if stats.len() < window {
            return Err(SearchError::Configuration(format!(
                "move_std_window {window} exceeds the {} available pulses",
                stats.len()
            )));
        }

        let doppler_windows = sliding_std(&stats.best_doppler, window);
        let start_windows = sliding_std(&stats.best_start, window);
        let count = doppler_windows.len();

        let doppler_limit = config.dop_std_coherr / count as f64;
        let start_limit = config.start_std_coherr / count as f64;
        let doppler_coherence = doppler_windows.iter().filter(|&&s| s < doppler_limit).count();
        let start_coherence = start_windows.iter().filter(|&&s| s < start_limit).count();

        let pad = |mut series: Vec<f64>| {
            let last = series.last().copied().unwrap_or(0.0);
            series.resize(stats.len(), last);
            series
        };

        Ok(Self {
            doppler_std: pad(doppler_windows),
            start_std: pad(start_windows),
            doppler_coherence,
            start_coherence,
            window_count: count,
        })
    }

    /// True when enough windows sit below the coherence threshold that the
    /// block looks like a near-constant signal (interference, calibration
    /// echo) rather than isolated transients.
    pub fn sustained(&self, config: &SearchConfig) -> bool {
        let count = self.window_count as f64;
        self.doppler_coherence as f64 / count >= config.dop_std_coherr_percent
            || self.start_coherence as f64 / count >= config.start_std_coherr_percent
    }
}

/// Peak and total-power baselines over the quiet pulses.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub peak_mean: f64,
    pub peak_std: f64,
    pub pow_mean: f64,
    pub pow_std: f64,
    /// Pulses whose total power stayed under the quiet threshold.
    pub quiet: Vec<bool>,
    /// Pulses whose peak exceeded the coherent-signal limit; excluded from
    /// the Gaussian noise subset.
    pub coherent: Vec<bool>,
}

impl Baseline {
    /// Computes the baselines, or `None` (with a warning) when every pulse
    /// carries coherent signal and no quiet subset exists.
    pub fn compute(stats: &PulseStatistics, config: &SearchConfig) -> Option<Self> {
        let peaks = stats.peak_magnitudes();
        let coherent: Vec<bool> = peaks.iter().map(|&p| p > config.xcorr_noise_limit).collect();

        let unremarkable: Vec<f64> = peaks
            .iter()
            .zip(&stats.total_power)
            .filter(|(&peak, _)| peak < config.xcorr_noise_limit)
            .map(|(_, &pow)| pow)
            .collect();
        if unremarkable.is_empty() {
            warn!("every pulse exceeds the coherent-signal limit, no baseline");
            return None;
        }
        let quiet_limit = mean(&unremarkable) + config.pow_std_est * std_dev(&unremarkable);
        let quiet: Vec<bool> = stats.total_power.iter().map(|&p| p < quiet_limit).collect();
        if !quiet.iter().any(|&q| q) {
            warn!("no noise found, returning empty baseline");
            return None;
        }

        let quiet_peaks: Vec<f64> = peaks
            .iter()
            .zip(&quiet)
            .filter(|(_, &q)| q)
            .map(|(&p, _)| p)
            .collect();
        let quiet_pows: Vec<f64> = stats
            .total_power
            .iter()
            .zip(&quiet)
            .filter(|(_, &q)| q)
            .map(|(&p, _)| p)
            .collect();

        Some(Self {
            peak_mean: mean(&quiet_peaks),
            peak_std: std_dev(&quiet_peaks),
            pow_mean: mean(&quiet_pows),
            pow_std: std_dev(&quiet_pows),
            quiet,
            coherent,
        })
    }
}
