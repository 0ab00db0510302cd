//! Transmitted-waveform model used as the correlation reference.

use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;

use crate::prelude::{SearchError, SearchResult};

/// The 13-element Barker phase code transmitted by the MU radar.
pub const BARKER13: [f64; 13] = [
    1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0,
];

/// Complex code sequence, either one row shared across all pulses or one row
/// per pulse.
#[derive(Debug, Clone)]
pub struct WaveformModel {
    rows: Array2<Complex64>,
}

impl WaveformModel {
    /// A single code shared by every pulse.
    pub fn shared(code: Vec<Complex64>) -> SearchResult<Self> {
        if code.is_empty() {
            return Err(SearchError::InvalidInput("empty waveform code".to_string()));
        }
        let len = code.len();
        let rows = Array2::from_shape_vec((1, len), code)
            .map_err(|e| SearchError::InvalidInput(e.to_string()))?;
        Ok(Self { rows })
    }

    /// One code row per pulse, shape (pulses, code length).
    pub fn per_pulse(rows: Array2<Complex64>) -> SearchResult<Self> {
        if rows.nrows() == 0 || rows.ncols() == 0 {
            return Err(SearchError::InvalidInput(
                "waveform matrix must be non-empty".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    /// Barker-13 reference with each chip repeated `oversampling` times,
    /// replicated for `pulse_count` pulses.
    pub fn barker13(pulse_count: usize, oversampling: usize) -> SearchResult<Self> {
        if pulse_count == 0 || oversampling == 0 {
            return Err(SearchError::InvalidInput(
                "pulse count and oversampling must be positive".to_string(),
            ));
        }
        let code: Vec<Complex64> = BARKER13
            .iter()
            .flat_map(|&chip| std::iter::repeat(Complex64::new(chip, 0.0)).take(oversampling))
            .collect();
        let len = code.len();
        let mut rows = Array2::zeros((pulse_count, len));
        for mut row in rows.rows_mut() {
            for (dst, src) in row.iter_mut().zip(&code) {
                *dst = *src;
            }
        }
        Ok(Self { rows })
    }

    pub fn code_len(&self) -> usize {
        self.rows.ncols()
    }

    pub fn row_count(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_shared(&self) -> bool {
        self.rows.nrows() == 1
    }

    /// Code row for the given absolute pulse index.
    pub fn row(&self, pulse: usize) -> ArrayView1<'_, Complex64> {
        if self.is_shared() {
            self.rows.row(0)
        } else {
            self.rows.row(pulse)
        }
    }

    /// A model is compatible with a raw-data block when it is shared or has
    /// exactly one row per pulse.
    pub fn check_compatible(&self, pulse_count: usize) -> SearchResult<()> {
        if !self.is_shared() && self.row_count() != pulse_count {
            return Err(SearchError::InvalidInput(format!(
                "waveform model has {} rows but the raw data has {} pulses",
                self.row_count(),
                pulse_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barker13_oversampling_repeats_chips() {
        let model = WaveformModel::barker13(4, 2).unwrap();
        assert_eq!(model.code_len(), 26);
        assert_eq!(model.row_count(), 4);
        let row = model.row(3);
        assert_eq!(row[0], Complex64::new(1.0, 0.0));
        assert_eq!(row[1], Complex64::new(1.0, 0.0));
        assert_eq!(row[10], Complex64::new(-1.0, 0.0));
        assert_eq!(row[11], Complex64::new(-1.0, 0.0));
    }

    #[test]
    fn shared_code_serves_every_pulse() {
        let model = WaveformModel::shared(vec![Complex64::new(1.0, 0.0); 7]).unwrap();
        model.check_compatible(100).unwrap();
        assert_eq!(model.row(42).len(), 7);
    }

    #[test]
    fn per_pulse_row_count_must_match() {
        let rows = Array2::from_elem((5, 13), Complex64::new(1.0, 0.0));
        let model = WaveformModel::per_pulse(rows).unwrap();
        assert!(model.check_compatible(5).is_ok());
        assert!(model.check_compatible(6).is_err());
    }

    #[test]
    fn empty_code_is_rejected() {
        assert!(WaveformModel::shared(Vec::new()).is_err());
    }
}
