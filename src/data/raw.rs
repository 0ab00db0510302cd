//! In-memory raw-voltage block handed over by the data-ingestion layer.
//!
//! The ingestion backends (MU binary, EISCAT Matlab, digital receivers) live
//! outside this crate; they deliver a 3-D complex voltage tensor with a named
//! axis order plus the scalar timing metadata the search needs.

use std::path::PathBuf;

use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::prelude::{SearchError, SearchResult};

/// Positions of the named axes inside the sample tensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisOrder {
    pub channel: usize,
    pub sample: usize,
    pub pulse: usize,
}

impl AxisOrder {
    /// Conventional (channel, sample, pulse) storage order.
    pub fn standard() -> Self {
        Self {
            channel: 0,
            sample: 1,
            pulse: 2,
        }
    }

    fn validate(&self) -> SearchResult<()> {
        let mut seen = [false; 3];
        for axis in [self.channel, self.sample, self.pulse] {
            if axis > 2 || seen[axis] {
                return Err(SearchError::InvalidInput(format!(
                    "axis order {self:?} does not name three distinct axes"
                )));
            }
            seen[axis] = true;
        }
        Ok(())
    }
}

/// Scalar recording metadata delivered next to the sample tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMeta {
    /// Sample period [s].
    pub sample_period: f64,
    /// Inter-pulse period [s].
    pub ipp: f64,
    /// Receiver-gate start offset [s].
    pub start_offset: f64,
    /// Carrier frequency [Hz].
    pub carrier_frequency: f64,
    /// Recording start, seconds since the Unix epoch, when known.
    pub start_time: Option<f64>,
    /// Source file, carried for event provenance only.
    pub path: Option<PathBuf>,
}

/// Read-only raw-data block: the complex voltage tensor plus its metadata.
#[derive(Debug, Clone)]
pub struct RawSamples {
    data: Array3<Complex64>,
    axes: AxisOrder,
    meta: RecordingMeta,
}

impl RawSamples {
    pub fn new(
        data: Array3<Complex64>,
        axes: AxisOrder,
        meta: RecordingMeta,
    ) -> SearchResult<Self> {
        axes.validate()?;
        if meta.sample_period <= 0.0 || meta.ipp <= 0.0 {
            return Err(SearchError::InvalidInput(
                "sample period and inter-pulse period must be positive".to_string(),
            ));
        }
        Ok(Self { data, axes, meta })
    }

    pub fn data(&self) -> &Array3<Complex64> {
        &self.data
    }

    pub fn axes(&self) -> AxisOrder {
        self.axes
    }

    pub fn meta(&self) -> &RecordingMeta {
        &self.meta
    }

    pub fn channel_count(&self) -> usize {
        self.data.shape()[self.axes.channel]
    }

    pub fn sample_count(&self) -> usize {
        self.data.shape()[self.axes.sample]
    }

    pub fn pulse_count(&self) -> usize {
        self.data.shape()[self.axes.pulse]
    }

    /// Sums the channel axis away and returns a (sample, pulse) matrix in
    /// standard layout, regardless of how the backend ordered the axes.
    pub fn sum_channels(&self) -> Array2<Complex64> {
        let mut summed = self.data.sum_axis(Axis(self.axes.channel));
        if self.axes.sample > self.axes.pulse {
            summed = summed.reversed_axes();
        }
        summed.as_standard_layout().to_owned()
    }

    /// Iterates every voltage sample of the pulses for which `keep` is true.
    /// Used by the noise estimator to walk the signal-free subset.
    pub fn iter_pulses_where<'a>(
        &'a self,
        keep: &'a [bool],
    ) -> impl Iterator<Item = Complex64> + 'a {
        self.data
            .axis_iter(Axis(self.axes.pulse))
            .enumerate()
            .filter(move |(pulse, _)| keep.get(*pulse).copied().unwrap_or(false))
            .flat_map(|(_, lane)| lane.iter().copied().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn meta() -> RecordingMeta {
        RecordingMeta {
            sample_period: 6e-6,
            ipp: 3.12e-3,
            start_offset: 0.0,
            carrier_frequency: 46.5e6,
            start_time: None,
            path: None,
        }
    }

    #[test]
    fn sum_channels_collapses_the_channel_axis() {
        let mut data = Array3::zeros((2, 4, 3));
        data[[0, 1, 2]] = Complex64::new(1.0, 0.0);
        data[[1, 1, 2]] = Complex64::new(2.0, 1.0);
        let raw = RawSamples::new(data, AxisOrder::standard(), meta()).unwrap();
        let summed = raw.sum_channels();
        assert_eq!(summed.dim(), (4, 3));
        assert_eq!(summed[[1, 2]], Complex64::new(3.0, 1.0));
    }

    #[test]
    fn sum_channels_reorders_swapped_axes() {
        // Stored as (pulse, sample, channel).
        let mut data = Array3::zeros((3, 4, 2));
        data[[2, 1, 0]] = Complex64::new(5.0, 0.0);
        let axes = AxisOrder {
            channel: 2,
            sample: 1,
            pulse: 0,
        };
        let raw = RawSamples::new(data, axes, meta()).unwrap();
        let summed = raw.sum_channels();
        assert_eq!(summed.dim(), (4, 3));
        assert_eq!(summed[[1, 2]], Complex64::new(5.0, 0.0));
    }

    #[test]
    fn rejects_duplicate_axis_positions() {
        let data = Array3::zeros((1, 2, 3));
        let axes = AxisOrder {
            channel: 0,
            sample: 0,
            pulse: 2,
        };
        assert!(RawSamples::new(data, axes, meta()).is_err());
    }

    #[test]
    fn pulse_iteration_skips_excluded_pulses() {
        let mut data = Array3::zeros((1, 2, 3));
        data[[0, 0, 1]] = Complex64::new(9.0, 0.0);
        let raw = RawSamples::new(data, AxisOrder::standard(), meta()).unwrap();
        let kept: Vec<_> = raw.iter_pulses_where(&[true, false, true]).collect();
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|v| v.norm() == 0.0));
    }
}
