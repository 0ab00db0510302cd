//! Savitzky-Golay smoothing used to condition the per-candidate Doppler and
//! delay series before gap measurement. Fits a local polynomial over each
//! window, which preserves peak positions far better than a moving average.

use crate::prelude::{SearchError, SearchResult};

/// Convolution coefficients for a smoothing (zeroth-derivative)
/// Savitzky-Golay filter with the given odd `window` and polynomial order.
pub fn coefficients(window: usize, polyorder: usize) -> SearchResult<Vec<f64>> {
    if window % 2 == 0 || window == 0 {
        return Err(SearchError::Configuration(
            "smoothing window must be odd".to_string(),
        ));
    }
    if polyorder >= window {
        return Err(SearchError::Configuration(format!(
            "polynomial order {polyorder} must be below window size {window}"
        )));
    }
    let half = (window - 1) / 2;
    let terms = polyorder + 1;

    // Vandermonde matrix over offsets -half..=half.
    let mut vander = vec![vec![0.0; terms]; window];
    for (row, entries) in vander.iter_mut().enumerate() {
        let x = row as f64 - half as f64;
        let mut power = 1.0;
        for entry in entries.iter_mut() {
            *entry = power;
            power *= x;
        }
    }

    // Normal equations A = V^T V, solved against the identity to recover the
    // top row of the pseudoinverse (the smoothing coefficients).
    let mut aug = vec![vec![0.0; 2 * terms]; terms];
    for i in 0..terms {
        for j in 0..terms {
            aug[i][j] = (0..window).map(|k| vander[k][i] * vander[k][j]).sum();
        }
        aug[i][terms + i] = 1.0;
    }
    for col in 0..terms {
        let pivot_row = (col..terms)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap_or(col);
        aug.swap(col, pivot_row);
        let pivot = aug[col][col];
        if pivot.abs() < 1e-12 {
            return Err(SearchError::Internal(
                "singular normal equations in smoothing filter".to_string(),
            ));
        }
        for j in 0..2 * terms {
            aug[col][j] /= pivot;
        }
        for row in 0..terms {
            if row != col {
                let factor = aug[row][col];
                for j in 0..2 * terms {
                    aug[row][j] -= factor * aug[col][j];
                }
            }
        }
    }

    let mut coeffs = vec![0.0; window];
    for (k, coeff) in coeffs.iter_mut().enumerate() {
        *coeff = (0..terms).map(|i| aug[0][terms + i] * vander[k][i]).sum();
    }
    Ok(coeffs)
}

/// Smooths `data` in place of scipy's `savgol_filter`. Edges are handled by
/// mirroring the signal around its endpoints. Inputs shorter than the window
/// are returned unchanged.
pub fn smooth(data: &[f64], window: usize, polyorder: usize) -> SearchResult<Vec<f64>> {
    if data.len() < window {
        return Ok(data.to_vec());
    }
    let coeffs = coefficients(window, polyorder)?;
    let n = data.len() as i64;
    let half = (window as i64 - 1) / 2;

    let output = (0..n)
        .map(|i| {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| {
                    let mut j = i + k as i64 - half;
                    if j < 0 {
                        j = -j;
                    } else if j >= n {
                        j = 2 * n - 2 - j;
                    }
                    c * data[j as usize]
                })
                .sum()
        })
        .collect();
    Ok(output)
}
