//! Fixed-weight energy model

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::{co2_proxy, mci_proxy, normalized_predictions, DEFAULT_PREDICTION_COLUMN};
use crate::normalize::normalize01;
use crate::table::{append_columns, float_values, resolve_column};
use crate::Result;

/// Output column: weighted energy proxy
pub const ENERGY_PROXY: &str = "energy_proxy";
/// Output column: CO2 proxy
pub const CO2_PROXY: &str = "co2_proxy";
/// Output column: material circularity proxy
pub const MCI_PROXY: &str = "mci_proxy";

/// Driver weights for [`WeightedEnergyModel`].
///
/// Weights are taken as given; they are not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyWeights {
    /// Weight of normalized process time
    pub time: f64,
    /// Weight of normalized temperature
    pub temp: f64,
    /// Weight of normalized stirring speed
    pub stir: f64,
}

impl Default for EnergyWeights {
    fn default() -> Self {
        Self {
            time: 0.40,
            temp: 0.40,
            stir: 0.20,
        }
    }
}

impl EnergyWeights {
    /// Sum of the three weights
    #[must_use]
    pub fn total(&self) -> f64 {
        self.time + self.temp + self.stir
    }
}

/// Physical columns picked for each driver (`None` = not present, zeros used)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriversUsed {
    /// Temperature column
    pub temperature: Option<String>,
    /// Time column
    pub time: Option<String>,
    /// Stirring column
    pub stirring: Option<String>,
}

/// Weighted sum of normalized time, temperature and stirring.
///
/// ```text
/// energy = w_time * time_n + w_temp * temp_n + w_stir * stir_n
/// ```
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use arrow::array::Float64Array;
/// use arrow::datatypes::{DataType, Field, Schema};
/// use arrow::record_batch::RecordBatch;
/// use ecoproxy::energy::WeightedEnergyModel;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![
///     Field::new("time_s", DataType::Float64, false),
///     Field::new("y_pred", DataType::Float64, false),
/// ]));
/// let batch = RecordBatch::try_new(
///     schema,
///     vec![
///         Arc::new(Float64Array::from(vec![0.0, 10.0])),
///         Arc::new(Float64Array::from(vec![1.0, 2.0])),
///     ],
/// )?;
///
/// let (out, used) = WeightedEnergyModel::default().apply(&batch)?;
/// assert_eq!(out.num_columns(), 5);
/// assert_eq!(used.time.as_deref(), Some("time_s"));
/// assert!(used.temperature.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEnergyModel {
    prediction_column: String,
    time_candidates: Vec<String>,
    temperature_candidates: Vec<String>,
    stirring_candidates: Vec<String>,
    weights: EnergyWeights,
}

impl Default for WeightedEnergyModel {
    fn default() -> Self {
        Self {
            prediction_column: DEFAULT_PREDICTION_COLUMN.to_string(),
            time_candidates: owned(&["time_s", "time", "t", "Time"]),
            temperature_candidates: owned(&["temperature", "temp", "T", "Temperature"]),
            stirring_candidates: owned(&["stiring", "Stiring", "stirring", "Stirring", "rpm", "RPM"]),
            weights: EnergyWeights::default(),
        }
    }
}

pub(super) fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

impl WeightedEnergyModel {
    /// Model with the default candidates and weights
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read predictions from `column` instead of `y_pred`.
    #[must_use]
    pub fn with_prediction_column(mut self, column: impl Into<String>) -> Self {
        self.prediction_column = column.into();
        self
    }

    /// Replace the time candidates.
    #[must_use]
    pub fn with_time_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the temperature candidates.
    #[must_use]
    pub fn with_temperature_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.temperature_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the stirring candidates.
    #[must_use]
    pub fn with_stirring_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stirring_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the driver weights.
    #[must_use]
    pub const fn with_weights(mut self, weights: EnergyWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Configured weights
    #[must_use]
    pub const fn weights(&self) -> EnergyWeights {
        self.weights
    }

    /// Append `energy_proxy`, `co2_proxy` and `mci_proxy` to a copy of `batch`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ColumnNotFound`] if the prediction column is
    /// missing.
    pub fn apply(&self, batch: &RecordBatch) -> Result<(RecordBatch, DriversUsed)> {
        let y_pred_n = normalized_predictions(batch, &self.prediction_column)?;

        let used = DriversUsed {
            temperature: resolve_column(batch, &self.temperature_candidates).map(ToString::to_string),
            time: resolve_column(batch, &self.time_candidates).map(ToString::to_string),
            stirring: resolve_column(batch, &self.stirring_candidates).map(ToString::to_string),
        };
        tracing::debug!(?used, "fixed-weight drivers resolved");

        let rows = batch.num_rows();
        let driver = |column: Option<&String>| -> Result<Vec<f64>> {
            match column {
                Some(name) => Ok(normalize01(&float_values(batch, name)?)),
                None => Ok(vec![0.0; rows]),
            }
        };
        let temp_n = driver(used.temperature.as_ref())?;
        let time_n = driver(used.time.as_ref())?;
        let stir_n = driver(used.stirring.as_ref())?;

        let w = self.weights;
        if (w.total() - 1.0).abs() > 1e-9 {
            tracing::debug!(total = w.total(), "energy weights do not sum to 1");
        }

        let energy: Vec<f64> = (0..rows)
            .map(|i| w.time * time_n[i] + w.temp * temp_n[i] + w.stir * stir_n[i])
            .collect();
        let co2 = co2_proxy(&energy, &y_pred_n);
        let mci = mci_proxy(&energy, &y_pred_n);

        let out = append_columns(
            batch,
            vec![
                (ENERGY_PROXY.to_string(), energy),
                (CO2_PROXY.to_string(), co2),
                (MCI_PROXY.to_string(), mci),
            ],
        )?;
        Ok((out, used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use arrow::array::Float64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch(columns: &[(&str, Vec<f64>)]) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Float64, false))
            .collect();
        let arrays = columns
            .iter()
            .map(|(_, values)| Arc::new(Float64Array::from(values.clone())) as _)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn column(batch: &RecordBatch, name: &str) -> Vec<f64> {
        float_values(batch, name).unwrap()
    }

    #[test]
    fn test_all_drivers_present() {
        let input = batch(&[
            ("time_s", vec![0.0, 5.0, 10.0]),
            ("temperature", vec![20.0, 40.0, 60.0]),
            ("rpm", vec![100.0, 100.0, 300.0]),
            ("y_pred", vec![3.0, 2.0, 1.0]),
        ]);
        let (out, used) = WeightedEnergyModel::new().apply(&input).unwrap();

        assert_eq!(
            used,
            DriversUsed {
                temperature: Some("temperature".to_string()),
                time: Some("time_s".to_string()),
                stirring: Some("rpm".to_string()),
            }
        );

        let energy = column(&out, ENERGY_PROXY);
        // time_n = temp_n = [0, .5, 1], stir_n = [0, 0, 1]
        let expected = [0.0, 0.4, 1.0];
        for (e, x) in energy.iter().zip(expected) {
            assert!((e - x).abs() < 1e-12);
        }

        // y_pred_n = [1, .5, 0]
        let co2 = column(&out, CO2_PROXY);
        assert!((co2[0] - 0.3).abs() < 1e-12);
        assert!((co2[2] - 0.7).abs() < 1e-12);

        let mci = column(&out, MCI_PROXY);
        assert!((mci[0] - 0.6).abs() < 1e-12);
        assert!((mci[2] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_missing_drivers_default_to_zero() {
        let input = batch(&[("y_pred", vec![1.0, 2.0])]);
        let (out, used) = WeightedEnergyModel::new().apply(&input).unwrap();

        assert_eq!(used.time, None);
        assert_eq!(used.temperature, None);
        assert_eq!(used.stirring, None);
        assert_eq!(column(&out, ENERGY_PROXY), vec![0.0, 0.0]);
        assert_eq!(column(&out, MCI_PROXY), vec![1.0, 0.6]);
    }

    #[test]
    fn test_missing_prediction_column() {
        let input = batch(&[("time", vec![1.0, 2.0])]);
        let err = WeightedEnergyModel::new().apply(&input).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "y_pred"));
    }

    #[test]
    fn test_weights_not_required_to_sum_to_one() {
        let input = batch(&[("time", vec![0.0, 1.0]), ("y_pred", vec![0.0, 0.0])]);
        let model = WeightedEnergyModel::new().with_weights(EnergyWeights {
            time: 2.0,
            temp: 0.0,
            stir: 0.0,
        });
        let (out, _) = model.apply(&input).unwrap();
        assert_eq!(column(&out, ENERGY_PROXY), vec![0.0, 2.0]);
        // 1 - 0.6 * 2 is negative, clipped
        assert_eq!(column(&out, MCI_PROXY), vec![1.0, 0.0]);
    }

    #[test]
    fn test_custom_candidates_and_prediction_column() {
        let input = batch(&[("duration", vec![0.0, 4.0]), ("pred", vec![1.0, 3.0])]);
        let model = WeightedEnergyModel::new()
            .with_time_candidates(["duration"])
            .with_prediction_column("pred");
        let (out, used) = model.apply(&input).unwrap();

        assert_eq!(used.time.as_deref(), Some("duration"));
        assert_eq!(column(&out, ENERGY_PROXY), vec![0.0, 0.4]);
    }

    #[test]
    fn test_input_untouched() {
        let input = batch(&[("time", vec![0.0, 1.0]), ("y_pred", vec![0.0, 1.0])]);
        let (out, _) = WeightedEnergyModel::new().apply(&input).unwrap();
        assert_eq!(input.num_columns(), 2);
        assert_eq!(out.num_columns(), 5);
        assert_eq!(out.num_rows(), input.num_rows());
    }
}
