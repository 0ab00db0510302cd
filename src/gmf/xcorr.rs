//! Doppler-delay correlation kernel for a single pulse.
//!
//! For every candidate Doppler shift the transmitted code is phase-rotated
//! into a compensated reference, cross-correlated against the received
//! samples over the full delay space, and normalized by the received power
//! inside the overlapping window. The delay space deliberately covers code
//! placements from `-L` to `N-1` so an echo straddling the window boundary
//! still correlates on its overlapping part.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Inclusive, evenly spaced set of candidate Doppler frequencies [Hz].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DopplerGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl DopplerGrid {
    /// Number of bins; the grid is inclusive of both endpoints.
    pub fn size(&self) -> usize {
        ((self.max - self.min) / self.step) as usize + 1
    }

    pub fn freq(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.step
    }
}

/// Kernel output for one pulse.
#[derive(Debug, Clone)]
pub struct PulseXcorr {
    /// Normalized correlation power, shape (doppler bins, N + L). Values are
    /// real powers kept in complex storage; comparisons use the magnitude.
    pub power: Array2<Complex64>,
    /// Largest normalized power over the whole grid.
    pub best_peak: Complex64,
    /// Code placement of the best peak, in samples relative to the window
    /// start; ranges over [-L, N).
    pub best_start: f64,
    /// Doppler frequency of the best peak [Hz].
    pub best_doppler: f64,
}

impl PulseXcorr {
    /// Reduces the power matrix to the per-delay maximum over Doppler bins.
    pub fn max_over_doppler(&self) -> Vec<Complex64> {
        let delays = self.power.ncols();
        let mut out = vec![Complex64::new(0.0, 0.0); delays];
        for (delay, slot) in out.iter_mut().enumerate() {
            let mut best = -1.0;
            for bin in 0..self.power.nrows() {
                let value = self.power[[bin, delay]];
                if value.norm() > best {
                    best = value.norm();
                    *slot = value;
                }
            }
        }
        out
    }
}

/// Correlates `x` against `conj(y)` at a single relative delay:
/// `Σ x[i] · conj(y[i + delay])`, with out-of-range reference indices
/// contributing nothing.
pub fn crosscorrelate_single_delay(x: &[Complex64], y: &[Complex64], delay: i64) -> Complex64 {
    let mut correlation = Complex64::new(0.0, 0.0);
    for (i, &value) in x.iter().enumerate() {
        let j = i as i64 + delay;
        if j >= 0 && (j as usize) < y.len() {
            correlation += value * y[j as usize].conj();
        }
    }
    correlation
}

/// Sweeps [`crosscorrelate_single_delay`] from `max_delay` down to just above
/// `min_delay`, one output element per delay. Does not normalize.
pub fn crosscorrelate(
    x: &[Complex64],
    y: &[Complex64],
    min_delay: i64,
    max_delay: i64,
) -> Vec<Complex64> {
    debug_assert!(max_delay > min_delay);
    let mut result = Vec::with_capacity((max_delay - min_delay) as usize);
    let mut delay = max_delay;
    while delay > min_delay {
        result.push(crosscorrelate_single_delay(x, y, delay));
        delay -= 1;
    }
    result
}

/// Normalization coefficients: received power `Σ|s|²` inside the length-`l`
/// window overlapping each code placement, clamped to the first/last full
/// window at the edges. Requires `samples.len() >= l`.
fn norm_coefficients(samples: &[Complex64], l: usize) -> Vec<f64> {
    let n = samples.len();
    let mut cumulative = vec![0.0; n + 1];
    for (i, value) in samples.iter().enumerate() {
        cumulative[i + 1] = cumulative[i] + value.norm_sqr();
    }
    (0..n + l)
        .map(|j| {
            let hi = j.clamp(l, n);
            cumulative[hi] - cumulative[hi - l]
        })
        .collect()
}

/// Runs the full Doppler-delay search for one pulse.
///
/// `samples` has length N, `code` length L with L <= N. The returned power
/// matrix covers every (Doppler bin, delay) pair; ties resolve to the lowest
/// delay, then the lowest Doppler bin, matching the scan order.
pub fn xcorr_pulse(
    samples: &[Complex64],
    code: &[Complex64],
    grid: &DopplerGrid,
    sample_period: f64,
) -> PulseXcorr {
    let n = samples.len();
    let l = code.len();
    debug_assert!(l <= n, "code longer than sample window");
    let delays = n + l;
    let bins = grid.size();

    let norm = norm_coefficients(samples, l);
    let mut power = Array2::zeros((bins, delays));

    let mut best_mag = -1.0;
    let mut best_peak = Complex64::new(0.0, 0.0);
    let mut best_start = 0.0;
    let mut best_doppler = grid.freq(0);

    let mut reference = vec![Complex64::new(0.0, 0.0); l];
    for bin in 0..bins {
        let freq = grid.freq(bin);
        for (j, slot) in reference.iter_mut().enumerate() {
            let phase = (j as f64 + 1.0) * 2.0 * std::f64::consts::PI * freq * sample_period;
            *slot = Complex64::from_polar(1.0, phase) * code[j];
        }
        let energy: f64 = reference.iter().map(|m| m.norm_sqr()).sum();

        let mut row_mag = -1.0;
        let mut row_peak = Complex64::new(0.0, 0.0);
        let mut row_start = 0i64;
        for delay in 0..delays {
            // Code placement relative to the sample window.
            let tau = delay as i64 - l as i64;
            let j_lo = (-tau).max(0) as usize;
            let j_hi = ((n as i64 - tau).min(l as i64)).max(0) as usize;
            let mut correlation = Complex64::new(0.0, 0.0);
            for j in j_lo..j_hi {
                correlation += samples[(tau + j as i64) as usize] * reference[j].conj();
            }

            let mut norm_coef = norm[delay];
            if norm_coef < f64::EPSILON {
                norm_coef = 1.0;
            }
            let value = correlation.norm_sqr() / (norm_coef * energy);
            power[[bin, delay]] = Complex64::new(value, 0.0);

            if value > row_mag {
                row_mag = value;
                row_peak = power[[bin, delay]];
                row_start = tau;
            }
        }

        if row_mag > best_mag {
            best_mag = row_mag;
            best_peak = row_peak;
            best_start = row_start as f64;
            best_doppler = freq;
        }
    }

    PulseXcorr {
        power,
        best_peak,
        best_start,
        best_doppler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::waveform::WaveformModel;
    use approx::assert_relative_eq;

    fn barker13_code() -> Vec<Complex64> {
        WaveformModel::barker13(1, 1).unwrap().row(0).to_vec()
    }

    fn embed(code: &[Complex64], offset: usize, total: usize) -> Vec<Complex64> {
        let mut buffer = vec![Complex64::new(0.0, 0.0); total];
        buffer[offset..offset + code.len()].copy_from_slice(code);
        buffer
    }

    #[test]
    fn single_delay_correlation_recovers_code_energy() {
        let code = barker13_code();
        let samples = embed(&code, 23, 85);
        let peak = crosscorrelate_single_delay(&samples, &code, -23);
        assert_relative_eq!(peak.re, 13.0, epsilon = 1e-12);
        assert_relative_eq!(peak.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn delay_sweep_covers_the_requested_range() {
        let code = barker13_code();
        let samples = embed(&code, 23, 85);
        let sweep = crosscorrelate(&samples, &code, -(samples.len() as i64), code.len() as i64);
        assert_eq!(sweep.len(), samples.len() + code.len());
        let peak_mag = sweep.iter().map(|c| c.norm()).fold(0.0, f64::max);
        assert_relative_eq!(peak_mag, 13.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_doppler_echo_is_located_exactly() {
        let code = barker13_code();
        let offset = 31;
        let samples = embed(&code, offset, 85);
        let grid = DopplerGrid {
            min: 0.0,
            max: 0.0,
            step: 1.0,
        };
        let result = xcorr_pulse(&samples, &code, &grid, 6e-6);
        assert_eq!(result.best_start, offset as f64);
        assert_eq!(result.best_doppler, 0.0);
        // Perfect alignment of a noise-free echo gives unit normalized power.
        assert_relative_eq!(result.best_peak.re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn doppler_shifted_echo_lands_in_the_right_bin() {
        let sample_period = 6e-6;
        let code = barker13_code();
        let freq = -2_000.0;
        let shifted: Vec<Complex64> = code
            .iter()
            .enumerate()
            .map(|(j, &c)| {
                let phase =
                    (j as f64 + 1.0) * 2.0 * std::f64::consts::PI * freq * sample_period;
                Complex64::from_polar(1.0, phase) * c
            })
            .collect();
        let samples = embed(&shifted, 10, 60);
        let grid = DopplerGrid {
            min: -5_000.0,
            max: 5_000.0,
            step: 1_000.0,
        };
        let result = xcorr_pulse(&samples, &code, &grid, sample_period);
        assert_eq!(result.best_doppler, freq);
        assert_eq!(result.best_start, 10.0);
        assert_relative_eq!(result.best_peak.re, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn edge_straddling_echo_is_still_found() {
        let code = barker13_code();
        // Only the last 5 chips of the code fall inside the window.
        let mut samples = vec![Complex64::new(0.0, 0.0); 40];
        samples[..5].copy_from_slice(&code[8..]);
        let grid = DopplerGrid {
            min: 0.0,
            max: 0.0,
            step: 1.0,
        };
        let result = xcorr_pulse(&samples, &code, &grid, 6e-6);
        assert_eq!(result.best_start, -8.0);
    }

    #[test]
    fn power_matrix_covers_the_full_delay_space() {
        let code = barker13_code();
        let samples = embed(&code, 0, 40);
        let grid = DopplerGrid {
            min: -1_000.0,
            max: 1_000.0,
            step: 1_000.0,
        };
        let result = xcorr_pulse(&samples, &code, &grid, 6e-6);
        assert_eq!(result.power.dim(), (3, 40 + 13));
        assert_eq!(result.max_over_doppler().len(), 53);
    }

    #[test]
    fn grid_size_is_inclusive() {
        let grid = DopplerGrid {
            min: -30_000.0,
            max: 5_000.0,
            step: 1_000.0,
        };
        assert_eq!(grid.size(), 36);
        assert_eq!(grid.freq(35), 5_000.0);
    }
}
