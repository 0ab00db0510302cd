//! Top-level event search: matched filter, adaptive thresholds, criteria
//! battery, clustering and assembly, in that order.

use log::{info, warn};

use crate::config::SearchConfig;
use crate::data::{RawSamples, WaveformModel};
use crate::events::assemble::{assemble, drop_ignored, resolve_overlaps};
use crate::events::cluster::cluster;
use crate::events::criteria::{default_battery, find_candidates, CriteriaContext};
use crate::events::event::{Event, EventKind};
use crate::gmf::{xcorr_echo_search, PulseStatistics, SearchOptions};
use crate::noise::{estimate_gaussian, Baseline, Coherence, GaussianNoise, DEFAULT_CONFIDENCE};
use crate::prelude::{CancelToken, SearchResult};

/// Everything one search invocation produces.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub head_events: Vec<Event>,
    pub trail_events: Vec<Event>,
    /// Per-pulse statistics, reusable as `previous` for the next file so an
    /// event straddling two files is not lost.
    pub statistics: PulseStatistics,
    pub noise: Option<GaussianNoise>,
}

impl SearchOutcome {
    fn empty(statistics: PulseStatistics) -> Self {
        Self {
            head_events: Vec::new(),
            trail_events: Vec::new(),
            statistics,
            noise: None,
        }
    }
}

/// Searches a raw-data block for head-echo and trail events.
///
/// `previous` carries statistics from an earlier (shorter) pass over the
/// same recording; only the uncovered pulses are correlated. `ignore` lists
/// pulse intervals already resolved externally (such as events reported
/// from an overlapping neighbor file); spans falling into them are dropped
/// under the `allow_analysis_overlap` tolerance.
pub fn search(
    raw: &RawSamples,
    waveform: &WaveformModel,
    config: &SearchConfig,
    full_output: bool,
    previous: Option<PulseStatistics>,
    ignore: &[(usize, usize)],
    cancel: &CancelToken,
) -> SearchResult<SearchOutcome> {
    config.validate()?;

    let options = SearchOptions {
        grid: config.doppler_grid(),
        full_output,
    };
    let statistics = xcorr_echo_search(raw, waveform, &options, previous, cancel)?;

    let coherence = Coherence::compute(&statistics, config)?;
    let baseline = match Baseline::compute(&statistics, config) {
        Some(baseline) => baseline,
        None => {
            warn!("no signal-free baseline, returning without events");
            return Ok(SearchOutcome::empty(statistics));
        }
    };

    let keep: Vec<bool> = baseline.coherent.iter().map(|&c| !c).collect();
    let noise = estimate_gaussian(raw, &keep, DEFAULT_CONFIDENCE);

    let ctx = CriteriaContext {
        stats: &statistics,
        baseline: &baseline,
        coherence: &coherence,
        config,
    };
    let candidates = find_candidates(&default_battery(), &ctx);
    info!(
        "criteria battery matched {} head and {} trail candidates \
         (coherence {}/{})",
        candidates.head.len(),
        candidates.trail.len(),
        coherence.doppler_coherence,
        coherence.start_coherence,
    );

    let pulse_count = statistics.len();
    let mut head_spans = cluster(
        &candidates.head,
        &statistics.best_doppler,
        &statistics.best_start,
        pulse_count,
        config,
    )?;
    let trail_spans = cluster(
        &candidates.trail,
        &statistics.best_doppler,
        &statistics.best_start,
        pulse_count,
        config,
    )?;

    head_spans = drop_ignored(head_spans, ignore, config.allow_analysis_overlap);
    resolve_overlaps(&mut head_spans, config.event_max_overlap)?;

    let head_events = assemble(head_spans, EventKind::Head, raw, config, noise.as_ref())?;
    let trail_events = assemble(trail_spans, EventKind::Trail, raw, config, noise.as_ref())?;
    info!(
        "event search found {} head and {} trail events",
        head_events.len(),
        trail_events.len()
    );

    Ok(SearchOutcome {
        head_events,
        trail_events,
        statistics,
        noise,
    })
}
