//! First principal component of a handful of standardized columns.
//!
//! Driver tables have few features (rarely more than 9), so the covariance
//! matrix is decomposed directly with [`SymmetricEigen`] rather than an SVD
//! of the data matrix.
//!
//! Sign convention: the loading with the largest magnitude is made positive.
//! Flipping the sign of a component mirrors its scores, which after min-max
//! normalization turns `e` into `1 - e`, so the convention is part of the
//! contract.

use nalgebra::{DMatrix, SymmetricEigen};

/// Result of projecting onto the first principal component
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponent {
    /// Unit loading vector, one entry per input column
    pub loadings: Vec<f64>,
    /// Share of total variance captured (0 when there is no variance at all)
    pub explained_variance_ratio: f64,
    /// Projection of every row onto the component
    pub scores: Vec<f64>,
}

/// Center each column and scale it to unit population variance.
///
/// Columns with (near) zero variance are only centered.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn standardize(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    columns
        .iter()
        .map(|column| {
            if column.is_empty() {
                return Vec::new();
            }
            let n = column.len() as f64;
            let mean = column.iter().sum::<f64>() / n;
            let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            let scale = if std < 10.0 * f64::EPSILON { 1.0 } else { std };
            column.iter().map(|x| (x - mean) / scale).collect()
        })
        .collect()
}

/// Standardize `columns` and project them onto their first principal component.
///
/// `columns` is feature-major: one `Vec` per feature, all the same length.
#[must_use]
pub fn first_component(columns: &[Vec<f64>]) -> PrincipalComponent {
    let standardized = standardize(columns);
    if standardized.is_empty() {
        return PrincipalComponent {
            loadings: Vec::new(),
            explained_variance_ratio: 0.0,
            scores: Vec::new(),
        };
    }

    let eigen = SymmetricEigen::new(covariance(&standardized));
    let eigenvalues: Vec<f64> = eigen.eigenvalues.iter().copied().collect();

    let top = argmax(&eigenvalues, |a, b| a > b).unwrap_or(0);
    let mut loadings: Vec<f64> = eigen.eigenvectors.column(top).iter().copied().collect();

    if let Some(pivot) = argmax(&loadings, |a, b| a.abs() > b.abs()) {
        if loadings[pivot] < 0.0 {
            loadings.iter_mut().for_each(|v| *v = -*v);
        }
    }

    let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let explained_variance_ratio = if total > 0.0 {
        eigenvalues[top].max(0.0) / total
    } else {
        0.0
    };

    let rows = standardized.first().map_or(0, Vec::len);
    let scores = (0..rows)
        .map(|r| {
            standardized
                .iter()
                .zip(&loadings)
                .map(|(column, w)| column[r] * w)
                .sum()
        })
        .collect();

    PrincipalComponent {
        loadings,
        explained_variance_ratio,
        scores,
    }
}

/// Index of the first element that beats every other under `better`.
fn argmax(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if !better(v, values[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Sample covariance (`n - 1` denominator) of already centered columns.
#[allow(clippy::cast_precision_loss)]
fn covariance(columns: &[Vec<f64>]) -> DMatrix<f64> {
    let rows = columns.first().map_or(0, Vec::len);
    let denom = rows.saturating_sub(1).max(1) as f64;
    let d = columns.len();

    DMatrix::from_fn(d, d, |i, j| {
        columns[i]
            .iter()
            .zip(&columns[j])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / denom
    })
}
