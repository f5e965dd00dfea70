//! Latent-factor energy model
//!
//! Treats every present driver column as a noisy view of one underlying
//! "energy" factor and recovers it as the first principal component of the
//! standardized drivers. With fewer than two drivers there is nothing to
//! decompose, and the model degrades to a single normalized column or to
//! zeros. [`LatentInfo::mode`] records which path ran.

use arrow::record_batch::RecordBatch;
use serde::Serialize;

use super::pca::first_component;
use super::weighted::owned;
use super::{co2_proxy, mci_proxy, normalized_predictions, DEFAULT_PREDICTION_COLUMN};
use crate::normalize::normalize01;
use crate::table::{append_columns, numeric_or_zero};
use crate::Result;

/// Output column: latent energy proxy
pub const ENERGY_PCA_PROXY: &str = "energy_pca_proxy";
/// Output column: CO2 proxy derived from the latent energy
pub const CO2_PCA_PROXY: &str = "co2_pca_proxy";
/// Output column: circularity proxy derived from the latent energy
pub const MCI_PCA_PROXY: &str = "mci_pca_proxy";

/// Which path produced the energy column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatentMode {
    /// Two or more drivers, first principal component
    Pca,
    /// Exactly one driver, normalized as is
    SingleColumnFallback,
    /// No drivers, energy is all zeros
    NoColumnsFallback,
}

/// Provenance of a [`LatentEnergyModel::apply`] call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatentInfo {
    /// Driver columns found in the table, in candidate order
    pub used_columns: Vec<String>,
    /// Path taken
    pub mode: LatentMode,
    /// Share of variance on the first component (`pca` mode only)
    pub explained_variance_ratio: Option<f64>,
    /// Loadings of the first component, aligned with `used_columns`
    pub pca_components: Option<Vec<f64>>,
    /// The lone driver column (`single_column_fallback` mode only)
    pub fallback_column: Option<String>,
}

/// Energy as the first principal component of the present driver columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatentEnergyModel {
    feature_candidates: Vec<String>,
    prediction_column: String,
}

impl Default for LatentEnergyModel {
    fn default() -> Self {
        Self {
            feature_candidates: owned(&[
                "time_s",
                "time",
                "t",
                "temperature",
                "temp",
                "T",
                "stiring",
                "stirring",
                "rpm",
            ]),
            prediction_column: DEFAULT_PREDICTION_COLUMN.to_string(),
        }
    }
}

impl LatentEnergyModel {
    /// Model with the default candidates
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the driver candidates. Every candidate present is used.
    #[must_use]
    pub fn with_feature_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Read predictions from `column` instead of `y_pred`.
    #[must_use]
    pub fn with_prediction_column(mut self, column: impl Into<String>) -> Self {
        self.prediction_column = column.into();
        self
    }

    /// Append `energy_pca_proxy`, `co2_pca_proxy` and `mci_pca_proxy` to a
    /// copy of `batch`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ColumnNotFound`] if the prediction column is
    /// missing.
    pub fn apply(&self, batch: &RecordBatch) -> Result<(RecordBatch, LatentInfo)> {
        let y_pred_n = normalized_predictions(batch, &self.prediction_column)?;

        let mut used_columns: Vec<String> = Vec::new();
        let mut features: Vec<Vec<f64>> = Vec::new();
        for name in &self.feature_candidates {
            if used_columns.contains(name) {
                continue;
            }
            if let Some(array) = batch.column_by_name(name) {
                used_columns.push(name.clone());
                features.push(numeric_or_zero(array));
            }
        }

        let (energy, info) = match features.len() {
            0 => (
                vec![0.0; batch.num_rows()],
                LatentInfo {
                    used_columns,
                    mode: LatentMode::NoColumnsFallback,
                    explained_variance_ratio: None,
                    pca_components: None,
                    fallback_column: None,
                },
            ),
            1 => {
                let fallback_column = used_columns.first().cloned();
                (
                    normalize01(&features[0]),
                    LatentInfo {
                        used_columns,
                        mode: LatentMode::SingleColumnFallback,
                        explained_variance_ratio: None,
                        pca_components: None,
                        fallback_column,
                    },
                )
            }
            _ => {
                let pc = first_component(&features);
                (
                    normalize01(&pc.scores),
                    LatentInfo {
                        used_columns,
                        mode: LatentMode::Pca,
                        explained_variance_ratio: Some(pc.explained_variance_ratio),
                        pca_components: Some(pc.loadings),
                        fallback_column: None,
                    },
                )
            }
        };

        tracing::debug!(
            mode = ?info.mode,
            columns = ?info.used_columns,
            ratio = ?info.explained_variance_ratio,
            "latent energy computed"
        );

        let co2 = co2_proxy(&energy, &y_pred_n);
        let mci = mci_proxy(&energy, &y_pred_n);
        let out = append_columns(
            batch,
            vec![
                (ENERGY_PCA_PROXY.to_string(), energy),
                (CO2_PCA_PROXY.to_string(), co2),
                (MCI_PCA_PROXY.to_string(), mci),
            ],
        )?;
        Ok((out, info))
    }
}
