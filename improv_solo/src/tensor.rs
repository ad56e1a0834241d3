// Flat tensors and the handful of numeric kernels the experts need.
//
// Weights arrive as flat f32 arrays with a shape and are kept that way:
// a `Matrix` is row-major `[rows, cols]` and is applied to a row vector
// (`z · W + b`), matching the layout of the trained bundles. Distributions
// are computed in f64 from here on.

use serde::{Deserialize, Serialize};

/// Flat f32 array with shape metadata, as stored in weight bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Tensor { shape, data }
    }

    /// Number of elements the shape describes.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Row-major `[rows, cols]` weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Wrap row-major data. Callers validate the length beforehand.
    pub(crate) fn from_flat(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `out = x · W + bias`, with `x` of length `rows` and `out`/`bias` of
    /// length `cols`.
    pub fn affine(&self, x: &[f32], bias: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.rows);
        debug_assert_eq!(bias.len(), self.cols);
        debug_assert_eq!(out.len(), self.cols);

        out.copy_from_slice(bias);
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            let row = &self.data[i * self.cols..(i + 1) * self.cols];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
    }
}

/// Logistic sigmoid, clamped so `exp` cannot overflow.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-30.0, 30.0);
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over logits, returned in f64.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let mut out: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = out.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for p in &mut out {
            *p /= sum;
        }
    }
    out
}

/// Scale `values` in place to sum to 1. Returns `false` (leaving the slice
/// untouched) when the sum is zero or not finite.
pub fn normalize(values: &mut [f64]) -> bool {
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return false;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_is_row_vector_times_matrix() {
        // x = [1, 2], W = [[1, 0, 2], [3, 1, 0]], b = [0.5, 0, -1]
        let m = Matrix::from_flat(2, 3, vec![1.0, 0.0, 2.0, 3.0, 1.0, 0.0]);
        let mut out = [0.0; 3];
        m.affine(&[1.0, 2.0], &[0.5, 0.0, -1.0], &mut out);
        assert_eq!(out, [7.5, 2.0, 1.0]);
    }

    #[test]
    fn sigmoid_limits() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(100.0) - 1.0).abs() < 1e-6);
        assert!(sigmoid(-100.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_sums_to_one_and_survives_large_logits() {
        let p = softmax(&[1000.0, 1000.0, -1000.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!(p[2] < 1e-12);
    }

    #[test]
    fn normalize_rejects_zero_sum() {
        let mut v = [0.0, 0.0];
        assert!(!normalize(&mut v));
        let mut v = [1.0, 3.0];
        assert!(normalize(&mut v));
        assert_eq!(v, [0.25, 0.75]);
    }

    #[test]
    fn tensor_numel() {
        let t = Tensor::new(vec![3, 4], vec![0.0; 12]);
        assert_eq!(t.numel(), 12);
    }
}
