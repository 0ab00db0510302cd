//! Matched-filter search driver: runs the correlation kernel over every
//! pulse of a raw-data block and assembles the per-pulse statistics.
//!
//! Pulses are independent, so the kernel sweep runs data-parallel over a
//! rayon pool; each pulse writes only its own output slot, which keeps the
//! result bit-identical regardless of worker count. Incremental extension
//! lets sequential files share one statistics accumulator: pulses already
//! covered by a previous run are never recomputed.

use log::debug;
use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::data::{RawSamples, WaveformModel};
use crate::gmf::statistics::PulseStatistics;
use crate::gmf::xcorr::{xcorr_pulse, DopplerGrid, PulseXcorr};
use crate::prelude::{CancelToken, SearchError, SearchResult};

/// Knobs for one matched-filter invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub grid: DopplerGrid,
    /// Retain the complete (Doppler x delay) grid per pulse. Multiplies
    /// memory use by the grid size; off unless explicitly requested.
    pub full_output: bool,
}

/// Correlates every not-yet-processed pulse of `raw` against the waveform
/// model and returns the extended statistics.
///
/// When `previous` covers the first K pulses of the block, only pulses
/// [K, total) are processed and concatenated onto it. Shape mismatches
/// between the waveform, the raw data and `previous` fail with
/// [`SearchError::InvalidInput`] before any correlation work begins.
pub fn xcorr_echo_search(
    raw: &RawSamples,
    waveform: &WaveformModel,
    options: &SearchOptions,
    previous: Option<PulseStatistics>,
    cancel: &CancelToken,
) -> SearchResult<PulseStatistics> {
    let total = raw.pulse_count();
    let n = raw.sample_count();
    let l = waveform.code_len();

    waveform.check_compatible(total)?;
    if l > n {
        return Err(SearchError::InvalidInput(format!(
            "waveform code length {l} exceeds the {n}-sample receive window"
        )));
    }
    let delay_bins = n + l;

    let mut stats =
        previous.unwrap_or_else(|| PulseStatistics::empty(delay_bins, options.full_output));
    if stats.delay_bins() != delay_bins {
        return Err(SearchError::InvalidInput(format!(
            "existing statistics have {} delay bins but this block needs {delay_bins}",
            stats.delay_bins()
        )));
    }
    let done = stats.len();
    if done > total {
        return Err(SearchError::InvalidInput(format!(
            "existing statistics cover {done} pulses but the block only has {total}"
        )));
    }
    if done == total {
        return Ok(stats);
    }

    debug!(
        "starting crosscorrelation echo search over pulses {done}..{total} \
         ({} doppler bins, {delay_bins} delay bins)",
        options.grid.size()
    );

    let summed = raw.sum_channels();
    let sample_period = raw.meta().sample_period;
    let grid = options.grid;

    let results: Vec<PulseXcorr> = (done..total)
        .into_par_iter()
        .map(|pulse| -> SearchResult<PulseXcorr> {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled(pulse));
            }
            let samples = summed.column(pulse).to_vec();
            let code = waveform.row(pulse).to_vec();
            Ok(xcorr_pulse(&samples, &code, &grid, sample_period))
        })
        .collect::<SearchResult<Vec<_>>>()?;

    let fresh = results.len();
    let mut chunk = PulseStatistics::empty(delay_bins, options.full_output);
    chunk.best_peak = results.iter().map(|r| r.best_peak).collect();
    chunk.best_start = results.iter().map(|r| r.best_start).collect();
    chunk.best_doppler = results.iter().map(|r| r.best_doppler).collect();
    chunk.total_power = (done..total)
        .map(|pulse| summed.column(pulse).iter().map(|v| v.norm_sqr()).sum())
        .collect();

    let mut max_pow = Array2::zeros((delay_bins, fresh));
    for (i, result) in results.iter().enumerate() {
        for (row, value) in result.max_over_doppler().into_iter().enumerate() {
            max_pow[[row, i]] = value;
        }
    }
    chunk.max_pow_per_delay = max_pow;
    if options.full_output {
        chunk.gmf = Some(results.into_iter().map(|r| r.power).collect());
    }

    stats.append(chunk)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AxisOrder, RecordingMeta};
    use ndarray::Array3;

    fn test_meta() -> RecordingMeta {
        RecordingMeta {
            sample_period: 6e-6,
            ipp: 3.12e-3,
            start_offset: 0.0,
            carrier_frequency: 46.5e6,
            start_time: None,
            path: None,
        }
    }

    /// Deterministic pseudo-noise block with an echo planted in some pulses.
    fn synthetic_block(pulses: usize) -> RawSamples {
        let code = WaveformModel::barker13(1, 1).unwrap().row(0).to_vec();
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        };
        let mut data = Array3::zeros((1, 60, pulses));
        for pulse in 0..pulses {
            for sample in 0..60 {
                data[[0, sample, pulse]] = Complex64::new(0.005 * next(), 0.005 * next());
            }
            if (10..20).contains(&pulse) {
                for (j, &chip) in code.iter().enumerate() {
                    data[[0, 15 + j, pulse]] += chip;
                }
            }
        }
        RawSamples::new(data, AxisOrder::standard(), test_meta()).unwrap()
    }

    fn options() -> SearchOptions {
        SearchOptions {
            grid: DopplerGrid {
                min: -3_000.0,
                max: 3_000.0,
                step: 1_000.0,
            },
            full_output: false,
        }
    }

    #[test]
    fn search_is_idempotent() {
        let raw = synthetic_block(24);
        let waveform = WaveformModel::barker13(1, 1).unwrap();
        let token = CancelToken::new();
        let first = xcorr_echo_search(&raw, &waveform, &options(), None, &token).unwrap();
        let second = xcorr_echo_search(&raw, &waveform, &options(), None, &token).unwrap();
        assert_eq!(first.best_peak, second.best_peak);
        assert_eq!(first.best_start, second.best_start);
        assert_eq!(first.best_doppler, second.best_doppler);
        assert_eq!(first.max_pow_per_delay, second.max_pow_per_delay);
    }

    #[test]
    fn incremental_extension_equals_a_single_pass() {
        let waveform = WaveformModel::barker13(1, 1).unwrap();
        let token = CancelToken::new();
        let full = synthetic_block(24);

        let whole = xcorr_echo_search(&full, &waveform, &options(), None, &token).unwrap();

        // First pass sees only the leading 9 pulses of the same recording.
        let head_data = full.data().slice(ndarray::s![.., .., ..9]).to_owned();
        let head = RawSamples::new(head_data, AxisOrder::standard(), test_meta()).unwrap();
        let partial = xcorr_echo_search(&head, &waveform, &options(), None, &token).unwrap();
        assert_eq!(partial.len(), 9);

        let extended =
            xcorr_echo_search(&full, &waveform, &options(), Some(partial), &token).unwrap();
        assert_eq!(extended.len(), 24);
        assert_eq!(extended.best_peak, whole.best_peak);
        assert_eq!(extended.best_start, whole.best_start);
        assert_eq!(extended.best_doppler, whole.best_doppler);
        assert_eq!(extended.total_power, whole.total_power);
        assert_eq!(extended.max_pow_per_delay, whole.max_pow_per_delay);
    }

    #[test]
    fn planted_echo_dominates_its_pulses() {
        let raw = synthetic_block(24);
        let waveform = WaveformModel::barker13(1, 1).unwrap();
        let stats =
            xcorr_echo_search(&raw, &waveform, &options(), None, &CancelToken::new()).unwrap();
        for pulse in 12..18 {
            assert_eq!(stats.best_start[pulse], 15.0, "pulse {pulse}");
            assert_eq!(stats.best_doppler[pulse], 0.0, "pulse {pulse}");
        }
    }

    #[test]
    fn incompatible_waveform_fails_before_any_work() {
        let raw = synthetic_block(8);
        let waveform = WaveformModel::barker13(5, 1).unwrap();
        let err = xcorr_echo_search(&raw, &waveform, &options(), None, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn cancelled_token_aborts_the_batch() {
        let raw = synthetic_block(8);
        let waveform = WaveformModel::barker13(1, 1).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = xcorr_echo_search(&raw, &waveform, &options(), None, &token).unwrap_err();
        assert!(matches!(err, SearchError::Cancelled(_)));
    }

    #[test]
    fn full_output_keeps_one_grid_per_pulse() {
        let raw = synthetic_block(6);
        let waveform = WaveformModel::barker13(1, 1).unwrap();
        let opts = SearchOptions {
            full_output: true,
            ..options()
        };
        let stats =
            xcorr_echo_search(&raw, &waveform, &opts, None, &CancelToken::new()).unwrap();
        let grids = stats.gmf.as_ref().unwrap();
        assert_eq!(grids.len(), 6);
        assert_eq!(grids[0].dim(), (7, 60 + 13));
    }
}
