//! Fixed-schema accumulator for per-pulse matched-filter output.

use ndarray::{concatenate, Array2, Axis};
use num_complex::Complex64;

use crate::prelude::{SearchError, SearchResult};

/// Per-pulse best-match statistics, growable across sequential raw-data
/// chunks. Every per-pulse field always has exactly [`PulseStatistics::len`]
/// entries; [`PulseStatistics::append`] preserves that invariant or fails
/// without modifying anything.
#[derive(Debug, Clone)]
pub struct PulseStatistics {
    /// Best normalized correlation power per pulse.
    pub best_peak: Vec<Complex64>,
    /// Delay index of the best peak per pulse (code placement in samples).
    pub best_start: Vec<f64>,
    /// Doppler frequency of the best peak per pulse [Hz].
    pub best_doppler: Vec<f64>,
    /// Total summed received power per pulse.
    pub total_power: Vec<f64>,
    /// Per-delay maximum power over all Doppler bins, shape
    /// (samples + code length, pulses).
    pub max_pow_per_delay: Array2<Complex64>,
    /// Complete per-pulse power grids, kept only on request.
    pub gmf: Option<Vec<Array2<Complex64>>>,
}

impl PulseStatistics {
    /// An empty accumulator for the given delay-axis size.
    pub fn empty(delay_bins: usize, keep_gmf: bool) -> Self {
        Self {
            best_peak: Vec::new(),
            best_start: Vec::new(),
            best_doppler: Vec::new(),
            total_power: Vec::new(),
            max_pow_per_delay: Array2::zeros((delay_bins, 0)),
            gmf: keep_gmf.then(Vec::new),
        }
    }

    /// Number of pulses processed so far.
    pub fn len(&self) -> usize {
        self.best_peak.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_peak.is_empty()
    }

    /// Number of delay bins (samples + code length).
    pub fn delay_bins(&self) -> usize {
        self.max_pow_per_delay.nrows()
    }

    /// Magnitudes of the per-pulse best peaks.
    pub fn peak_magnitudes(&self) -> Vec<f64> {
        self.best_peak.iter().map(|p| p.norm()).collect()
    }

    fn check_consistent(&self) -> SearchResult<()> {
        let len = self.len();
        let fields = [
            self.best_start.len(),
            self.best_doppler.len(),
            self.total_power.len(),
            self.max_pow_per_delay.ncols(),
        ];
        if fields.iter().any(|&l| l != len) {
            return Err(SearchError::Internal(format!(
                "pulse statistics arrays out of sync: {len} vs {fields:?}"
            )));
        }
        if let Some(gmf) = &self.gmf {
            if gmf.len() != len {
                return Err(SearchError::Internal(
                    "gmf grid count out of sync with pulse count".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Concatenates a newer chunk's statistics onto this one along the pulse
    /// axis.
    pub fn append(&mut self, newer: PulseStatistics) -> SearchResult<()> {
        self.check_consistent()?;
        newer.check_consistent()?;
        if self.delay_bins() != newer.delay_bins() {
            return Err(SearchError::InvalidInput(format!(
                "delay-axis size changed between chunks: {} vs {}",
                self.delay_bins(),
                newer.delay_bins()
            )));
        }

        self.max_pow_per_delay = concatenate(
            Axis(1),
            &[self.max_pow_per_delay.view(), newer.max_pow_per_delay.view()],
        )
        .map_err(|e| SearchError::Internal(e.to_string()))?;
        self.best_peak.extend(newer.best_peak);
        self.best_start.extend(newer.best_start);
        self.best_doppler.extend(newer.best_doppler);
        self.total_power.extend(newer.total_power);
        match (&mut self.gmf, newer.gmf) {
            (Some(existing), Some(appended)) => existing.extend(appended),
            // Full-output retention must be consistent across chunks; if one
            // side lacks the grids the merged statistics cannot keep them.
            (gmf, _) => *gmf = None,
        }
        self.check_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(pulses: usize, delay_bins: usize, offset: f64) -> PulseStatistics {
        PulseStatistics {
            best_peak: vec![Complex64::new(offset, 0.0); pulses],
            best_start: vec![offset; pulses],
            best_doppler: vec![offset * 10.0; pulses],
            total_power: vec![offset * 100.0; pulses],
            max_pow_per_delay: Array2::from_elem(
                (delay_bins, pulses),
                Complex64::new(offset, 0.0),
            ),
            gmf: None,
        }
    }

    #[test]
    fn append_concatenates_along_the_pulse_axis() {
        let mut stats = chunk(4, 10, 1.0);
        stats.append(chunk(3, 10, 2.0)).unwrap();
        assert_eq!(stats.len(), 7);
        assert_eq!(stats.max_pow_per_delay.dim(), (10, 7));
        assert_eq!(stats.best_start[4], 2.0);
        assert_eq!(stats.best_doppler[0], 10.0);
    }

    #[test]
    fn append_rejects_mismatched_delay_axes() {
        let mut stats = chunk(4, 10, 1.0);
        let err = stats.append(chunk(2, 12, 1.0)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
        // Nothing was modified.
        assert_eq!(stats.len(), 4);
    }

    #[test]
    fn empty_accumulator_accepts_a_first_chunk() {
        let mut stats = PulseStatistics::empty(10, false);
        assert!(stats.is_empty());
        stats.append(chunk(5, 10, 3.0)).unwrap();
        assert_eq!(stats.len(), 5);
    }

    #[test]
    fn gmf_grids_survive_append_when_both_sides_keep_them() {
        let mut first = chunk(2, 6, 1.0);
        first.gmf = Some(vec![Array2::zeros((3, 6)); 2]);
        let mut second = chunk(3, 6, 2.0);
        second.gmf = Some(vec![Array2::zeros((3, 6)); 3]);
        first.append(second).unwrap();
        assert_eq!(first.gmf.as_ref().unwrap().len(), 5);
    }
}
