//! The fixed, ordered battery of detection criteria.
//!
//! Each criterion produces one boolean per pulse. Criteria tagged `required`
//! must all hold for a head-echo candidate; criteria tagged
//! `required_for_trails` must all hold for a trail candidate; the remaining
//! voted criteria are counted and compared against `criteria_n`. The battery
//! is closed by design: the predicate set is fixed and order-dependent, so a
//! plugin registry would only add failure modes.

use crate::config::SearchConfig;
use crate::gmf::PulseStatistics;
use crate::math::stats::{mean, std_dev};
use crate::noise::{Baseline, Coherence};

/// Everything a criterion may look at, borrowed for one evaluation pass.
pub struct CriteriaContext<'a> {
    pub stats: &'a PulseStatistics,
    pub baseline: &'a Baseline,
    pub coherence: &'a Coherence,
    pub config: &'a SearchConfig,
}

/// One named detection test over the per-pulse statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Correlation peak exceeds the quiet-pulse baseline by `xcorr_sigma`.
    PeakAboveBaseline,
    /// Total summed power exceeds the quiet-pulse baseline by `totpow_sigma`.
    PowerAboveBaseline,
    /// Doppler behaves anomalously for the current regime: low windowed
    /// variance when a sustained signal is present, otherwise a large
    /// excursion from the global mean.
    DopplerExcursion,
    /// Delay counterpart of [`Criterion::DopplerExcursion`].
    DelayExcursion,
    /// Absolute Doppler above the physical floor; rejects zero-Doppler
    /// ground clutter.
    MinDopplerAllowed,
    /// Best delay inside the receiver's observation gate.
    MinMaxStartAllowed,
}

impl Criterion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeakAboveBaseline => "peak_above_baseline",
            Self::PowerAboveBaseline => "power_above_baseline",
            Self::DopplerExcursion => "doppler_excursion",
            Self::DelayExcursion => "delay_excursion",
            Self::MinDopplerAllowed => "min_doppler_allowed",
            Self::MinMaxStartAllowed => "min_max_start_allowed",
        }
    }

    /// Must hold for every head-echo candidate.
    pub fn required(&self) -> bool {
        matches!(self, Self::MinDopplerAllowed | Self::MinMaxStartAllowed)
    }

    /// Must hold for every trail candidate.
    pub fn required_for_trails(&self) -> bool {
        matches!(self, Self::MinDopplerAllowed)
    }

    /// Criteria that are neither required flavor contribute one vote each.
    pub fn voted(&self) -> bool {
        !self.required() && !self.required_for_trails()
    }

    pub fn evaluate(&self, ctx: &CriteriaContext<'_>) -> Vec<bool> {
        let stats = ctx.stats;
        let config = ctx.config;
        match self {
            Self::PeakAboveBaseline => {
                let limit = ctx.baseline.peak_mean + config.xcorr_sigma * ctx.baseline.peak_std;
                stats.peak_magnitudes().iter().map(|&p| p > limit).collect()
            }
            Self::PowerAboveBaseline => {
                let limit = ctx.baseline.pow_mean + config.totpow_sigma * ctx.baseline.pow_std;
                stats.total_power.iter().map(|&p| p > limit).collect()
            }
            Self::DopplerExcursion => {
                let global_std = std_dev(&stats.best_doppler);
                if ctx.coherence.sustained(config) {
                    let limit = config.dop_std_sigma * global_std;
                    ctx.coherence.doppler_std.iter().map(|&s| s < limit).collect()
                } else {
                    let global_mean = mean(&stats.best_doppler);
                    let limit = config.dop_sigma * global_std;
                    stats
                        .best_doppler
                        .iter()
                        .map(|&d| (d - global_mean).abs() > limit)
                        .collect()
                }
            }
            Self::DelayExcursion => {
                if ctx.coherence.sustained(config) {
                    let limit = config.start_std_sigma * std_dev(&stats.best_start);
                    ctx.coherence.start_std.iter().map(|&s| s < limit).collect()
                } else {
                    let global_mean = mean(&stats.best_start);
                    stats
                        .best_start
                        .iter()
                        .map(|&s| (s - global_mean).abs() > config.start_pm)
                        .collect()
                }
            }
            Self::MinDopplerAllowed => stats
                .best_doppler
                .iter()
                .map(|&d| d.abs() > config.min_dop_allowed)
                .collect(),
            Self::MinMaxStartAllowed => stats
                .best_start
                .iter()
                .map(|&s| s >= config.min_start_allowed && s <= config.max_start_allowed)
                .collect(),
        }
    }
}

/// The battery in evaluation order.
pub fn default_battery() -> Vec<Criterion> {
    vec![
        Criterion::PeakAboveBaseline,
        Criterion::PowerAboveBaseline,
        Criterion::DopplerExcursion,
        Criterion::DelayExcursion,
        Criterion::MinDopplerAllowed,
        Criterion::MinMaxStartAllowed,
    ]
}

/// AND-reduction over boolean vectors; an empty selection holds everywhere.
pub fn all_of(vectors: &[&Vec<bool>], len: usize) -> Vec<bool> {
    let mut out = vec![true; len];
    for vector in vectors {
        for (slot, &value) in out.iter_mut().zip(vector.iter()) {
            *slot &= value;
        }
    }
    out
}

/// Per-pulse count of true entries across the given boolean vectors.
pub fn vote_count(vectors: &[&Vec<bool>], len: usize) -> Vec<u32> {
    let mut out = vec![0u32; len];
    for vector in vectors {
        for (slot, &value) in out.iter_mut().zip(vector.iter()) {
            *slot += u32::from(value);
        }
    }
    out
}

/// Candidate pulses after applying the combination policy.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Pulses passing all required criteria with enough votes.
    pub head: Vec<usize>,
    /// Pulses passing the trail-required criteria but not qualifying as a
    /// head candidate; the fainter tail of a detection.
    pub trail: Vec<usize>,
    /// Vote total per pulse, kept for diagnostics.
    pub votes: Vec<u32>,
}

/// Evaluates the battery and applies the combination policy.
pub fn find_candidates(battery: &[Criterion], ctx: &CriteriaContext<'_>) -> CandidateSet {
    let len = ctx.stats.len();
    let outcomes: Vec<(Criterion, Vec<bool>)> = battery
        .iter()
        .map(|&criterion| (criterion, criterion.evaluate(ctx)))
        .collect();

    let required: Vec<&Vec<bool>> = outcomes
        .iter()
        .filter(|(c, _)| c.required())
        .map(|(_, v)| v)
        .collect();
    let trail_required: Vec<&Vec<bool>> = outcomes
        .iter()
        .filter(|(c, _)| c.required_for_trails())
        .map(|(_, v)| v)
        .collect();
    let voted: Vec<&Vec<bool>> = outcomes
        .iter()
        .filter(|(c, _)| c.voted())
        .map(|(_, v)| v)
        .collect();

    let all_required = all_of(&required, len);
    let all_trail = all_of(&trail_required, len);
    let votes = vote_count(&voted, len);

    let mut head = Vec::new();
    let mut trail = Vec::new();
    for pulse in 0..len {
        let is_head = all_required[pulse] && votes[pulse] >= ctx.config.criteria_n;
        if is_head {
            head.push(pulse);
        } else if all_trail[pulse] {
            trail.push(pulse);
        }
    }
    CandidateSet { head, trail, votes }
}
