//! Row-wise kernels used by the reference decoder.

use anyhow::{ensure, Result};
use ndarray::{ArrayView1, ArrayViewMut2, Axis};
use rayon::prelude::*;

/// Normalise each row to zero mean / unit variance, then apply `gamma` and
/// `beta` (both of feature length).
pub fn layer_norm_inplace(
    mut data: ArrayViewMut2<'_, f32>,
    gamma: ArrayView1<'_, f32>,
    beta: ArrayView1<'_, f32>,
    epsilon: f32,
) -> Result<()> {
    let feature_dim = data.len_of(Axis(1));
    ensure!(
        gamma.len() == feature_dim,
        "gamma length {} must equal feature dimension {}",
        gamma.len(),
        feature_dim
    );
    ensure!(
        beta.len() == feature_dim,
        "beta length {} must equal feature dimension {}",
        beta.len(),
        feature_dim
    );

    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            let len = row.len() as f32;
            let mean = row.iter().sum::<f32>() / len;
            let var = row.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / len;
            let inv_std = 1.0 / (var + epsilon).sqrt();

            for (idx, value) in row.iter_mut().enumerate() {
                *value = (*value - mean) * inv_std * gamma[idx] + beta[idx];
            }
        });

    Ok(())
}

pub fn softmax_inplace(mut scores: ArrayViewMut2<'_, f32>) {
    scores
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            row -= max;
            row.mapv_inplace(|x| x.exp());
            let sum = row.sum();
            row /= sum.max(f32::EPSILON);
        });
}

/// Index and value of the largest element; ties resolve to the lowest index.
pub fn argmax(row: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    row.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((idx, value)),
        })
}
