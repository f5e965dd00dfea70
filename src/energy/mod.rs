//! Energy proxy models
//!
//! Both models reduce process drivers (time, temperature, stirring) to a
//! single 0..1 energy signal and derive the same two secondary proxies from
//! it and the normalized prediction:
//!
//! ```text
//! co2 = 0.70 * energy + 0.30 * y_pred_n
//! mci = clip(1 - (0.60 * energy + 0.40 * y_pred_n), 0, 1)   (higher = better)
//! ```
//!
//! - [`WeightedEnergyModel`]: fixed weighted sum of normalized drivers
//! - [`LatentEnergyModel`]: first principal component of standardized drivers

pub mod latent;
pub mod pca;
pub mod weighted;

pub use latent::{LatentEnergyModel, LatentInfo, LatentMode};
pub use weighted::{DriversUsed, EnergyWeights, WeightedEnergyModel};

use arrow::record_batch::RecordBatch;

use crate::normalize::{clip, normalize01};
use crate::table::float_values;
use crate::Result;

/// Default prediction column
pub const DEFAULT_PREDICTION_COLUMN: &str = "y_pred";

const CO2_ENERGY: f64 = 0.70;
const CO2_PREDICTION: f64 = 0.30;
const MCI_ENERGY: f64 = 0.60;
const MCI_PREDICTION: f64 = 0.40;

/// `0.70 * energy + 0.30 * y_pred_n`, row by row.
#[must_use]
pub fn co2_proxy(energy: &[f64], y_pred_n: &[f64]) -> Vec<f64> {
    energy
        .iter()
        .zip(y_pred_n)
        .map(|(e, y)| CO2_ENERGY * e + CO2_PREDICTION * y)
        .collect()
}

/// `clip(1 - (0.60 * energy + 0.40 * y_pred_n), 0, 1)`, row by row.
#[must_use]
pub fn mci_proxy(energy: &[f64], y_pred_n: &[f64]) -> Vec<f64> {
    energy
        .iter()
        .zip(y_pred_n)
        .map(|(e, y)| clip(1.0 - (MCI_ENERGY * e + MCI_PREDICTION * y), 0.0, 1.0))
        .collect()
}

/// Read the prediction column and rescale it to `[0, 1]`.
pub(crate) fn normalized_predictions(batch: &RecordBatch, column: &str) -> Result<Vec<f64>> {
    Ok(normalize01(&float_values(batch, column)?))
}
