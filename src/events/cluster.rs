//! Greedy run-length segmentation of candidate pulses into event spans.
//!
//! Detections belonging to one physical event are contiguous in time with
//! smoothly varying Doppler and delay, so the candidate run is simply split
//! wherever the pulse-index gap or the smoothed Doppler/delay gap exceeds
//! its threshold. No centroids, no iteration.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::math::savgol;
use crate::prelude::SearchResult;

/// Contiguous pulse-index interval produced by the clusterer, together with
/// the candidate indices that formed it.
#[derive(Debug, Clone, Serialize)]
pub struct EventSpan {
    pub start: usize,
    pub end: usize,
    pub members: Vec<usize>,
}

/// Segments the sorted `candidates` into event spans.
///
/// Fewer candidates than `least_ipp_available` is a normal empty outcome,
/// not an error: too sparse to trust. Kept segments are extended by
/// `ipp_extend` pulses on each side (clamped to the block) to include the
/// detection's rise and fall skirt.
pub fn cluster(
    candidates: &[usize],
    best_doppler: &[f64],
    best_start: &[f64],
    pulse_count: usize,
    config: &SearchConfig,
) -> SearchResult<Vec<EventSpan>> {
    if candidates.len() < config.least_ipp_available {
        return Ok(Vec::new());
    }

    let doppler_at: Vec<f64> = candidates.iter().map(|&i| best_doppler[i]).collect();
    let start_at: Vec<f64> = candidates.iter().map(|&i| best_start[i]).collect();
    let smooth_doppler =
        savgol::smooth(&doppler_at, config.smoothing_window, config.polyorder)?;
    let smooth_start = savgol::smooth(&start_at, config.smoothing_window, config.polyorder)?;

    // A candidate whose gap to its predecessor splits opens the next segment.
    let mut segments: Vec<Vec<usize>> = Vec::new();
    let mut current = vec![candidates[0]];
    for i in 1..candidates.len() {
        let index_gap = (candidates[i] - candidates[i - 1]) as f64;
        let doppler_gap = (smooth_doppler[i] - smooth_doppler[i - 1]).abs();
        let start_gap = (smooth_start[i] - smooth_start[i - 1]).abs();
        let split = index_gap >= config.min_ipp_separation_split
            || start_gap >= config.min_range_separation_split
            || doppler_gap >= config.min_dop_separation_split;
        if split {
            segments.push(std::mem::take(&mut current));
        }
        current.push(candidates[i]);
    }
    segments.push(current);

    let spans = segments
        .into_iter()
        .filter(|segment| segment.len() > config.least_ipp_available)
        .map(|segment| {
            let first = segment[0];
            let last = segment[segment.len() - 1];
            EventSpan {
                start: first.saturating_sub(config.ipp_extend),
                end: (last + config.ipp_extend).min(pulse_count.saturating_sub(1)),
                members: segment,
            }
        })
        .collect();
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_series(len: usize) -> Vec<f64> {
        vec![0.0; len]
    }

    #[test]
    fn sparse_candidates_yield_no_spans() {
        let config = SearchConfig::default();
        let spans = cluster(
            &[3, 4, 5],
            &flat_series(100),
            &flat_series(100),
            100,
            &config,
        )
        .unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn index_gap_splits_into_exactly_two_spans() {
        let config = SearchConfig::default();
        // Two runs of 8 candidates separated by a 30-pulse hole.
        let mut candidates: Vec<usize> = (20..28).collect();
        candidates.extend(58..66);
        let spans = cluster(
            &candidates,
            &flat_series(200),
            &flat_series(200),
            200,
            &config,
        )
        .unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, 20 - config.ipp_extend);
        assert_eq!(spans[0].end, 27 + config.ipp_extend);
        assert_eq!(spans[1].start, 58 - config.ipp_extend);
        assert_eq!(spans[1].end, 65 + config.ipp_extend);
        assert_eq!(spans[0].members, (20..28).collect::<Vec<_>>());
        assert_eq!(spans[1].members, (58..66).collect::<Vec<_>>());
    }

    #[test]
    fn short_segments_after_a_split_are_dropped() {
        let config = SearchConfig::default();
        // Second run has only 4 candidates, below least_ipp_available.
        let mut candidates: Vec<usize> = (20..28).collect();
        candidates.extend(58..62);
        let spans = cluster(
            &candidates,
            &flat_series(200),
            &flat_series(200),
            200,
            &config,
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].members.len(), 8);
    }

    #[test]
    fn doppler_jump_splits_a_contiguous_run() {
        let config = SearchConfig::default();
        let candidates: Vec<usize> = (10..26).collect();
        let mut doppler = flat_series(100);
        // First half near -20 kHz, second half near zero: the smoothed jump
        // far exceeds min_dop_separation_split (~1.55 kHz).
        for i in 10..18 {
            doppler[i] = -20_000.0;
        }
        let spans = cluster(&candidates, &doppler, &flat_series(100), 100, &config).unwrap();
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn extension_is_clamped_to_the_block() {
        let config = SearchConfig::default();
        let candidates: Vec<usize> = (2..10).collect();
        let spans = cluster(
            &candidates,
            &flat_series(12),
            &flat_series(12),
            12,
            &config,
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 11);
    }
}
