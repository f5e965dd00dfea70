//! Metric computation from a validated [`Assumptions`] document

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use serde::ser::Serializer;
use serde::Serialize;

use super::config::{
    Assumptions, EnergyMethod, EnergySpec, MetricSpec, Normalization, ENERGY_NAME, Y_PRED_NAME,
    Y_PRED_N_NAME,
};
use crate::expr::{CompiledExpr, Scope};
use crate::normalize::normalize01;
use crate::table::{append_columns, float_values, resolve_driver, DriverColumn};
use crate::{Error, Result};

/// Column that always receives the computed energy
pub const ENERGY_ASSUMED: &str = "energy_assumed";

/// Where a metric ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputedMetric {
    /// Expression source as written in the document
    pub expression: String,
    /// Output column
    pub column: String,
}

/// Energy settings as applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyInfo {
    /// Combination method
    pub method: EnergyMethod,
    /// Post-processing
    pub normalize: Normalization,
    /// Weights in document order
    #[serde(serialize_with = "as_map")]
    pub weights: Vec<(String, f64)>,
}

impl From<&EnergySpec> for EnergyInfo {
    fn from(spec: &EnergySpec) -> Self {
        Self {
            method: spec.method,
            normalize: spec.normalize,
            weights: spec.weights.clone(),
        }
    }
}

/// Provenance of a [`compute_from_assumptions`] call.
///
/// Ordered collections serialize as JSON objects in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssumptionsInfo {
    /// Source document, when computed from a file
    pub assumptions_file: Option<PathBuf>,
    /// Driver name to matched column (`null` when nothing matched)
    #[serde(serialize_with = "as_map")]
    pub resolved_driver_columns: Vec<(String, Option<String>)>,
    /// Energy settings
    pub energy: EnergyInfo,
    /// Metric name to expression and output column
    #[serde(serialize_with = "as_map")]
    pub computed_metrics: Vec<(String, ComputedMetric)>,
}

fn as_map<S, K, V>(pairs: &[(K, V)], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Serialize,
    V: Serialize,
{
    serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
}

/// Compute `energy_assumed` and one `<metric>_assumed` column per metric.
///
/// Every expression is compiled before any column is computed, so a bad
/// metric fails the whole call and no partial table is produced. `batch`
/// itself is never modified.
///
/// # Errors
/// - [`Error::UnsafeExpression`] / [`Error::InvalidExpression`] for a metric
///   that fails to compile
/// - [`Error::ColumnNotFound`] if `y_pred_column` is absent
pub fn compute_from_assumptions(
    batch: &RecordBatch,
    assumptions: &Assumptions,
    y_pred_column: &str,
) -> Result<(RecordBatch, AssumptionsInfo)> {
    let names = assumptions.scope_names();
    let compiled = assumptions
        .metrics
        .iter()
        .map(|metric| Ok((metric, CompiledExpr::compile(&metric.expression, &names)?)))
        .collect::<Result<Vec<(&MetricSpec, CompiledExpr)>>>()?;

    let y_pred = float_values(batch, y_pred_column)?;
    let y_pred_n = normalize01(&y_pred);

    let drivers: Vec<DriverColumn> = assumptions
        .drivers
        .iter()
        .map(|spec| resolve_driver(batch, &spec.name, &spec.candidates))
        .collect();
    for driver in drivers.iter().filter(|d| !d.is_resolved()) {
        tracing::warn!(driver = %driver.driver, "driver unresolved, using zeros");
    }

    let energy = weighted_energy(batch.num_rows(), &assumptions.energy, &drivers)?;

    let mut scope = Scope::new(batch.num_rows());
    scope.insert(ENERGY_NAME, energy.clone());
    scope.insert(Y_PRED_NAME, y_pred);
    scope.insert(Y_PRED_N_NAME, y_pred_n);
    for driver in &drivers {
        scope.insert(driver.driver.clone(), driver.values.clone());
    }

    let mut columns = vec![(ENERGY_ASSUMED.to_string(), energy)];
    let mut computed_metrics = Vec::with_capacity(compiled.len());
    for (metric, expr) in &compiled {
        let column = metric.column();
        columns.push((column.clone(), expr.evaluate(&scope)?));
        computed_metrics.push((
            metric.name.clone(),
            ComputedMetric {
                expression: metric.expression.clone(),
                column,
            },
        ));
    }

    let out = append_columns(batch, columns)?;
    tracing::info!(
        metrics = computed_metrics.len(),
        rows = out.num_rows(),
        "assumption metrics computed"
    );

    let info = AssumptionsInfo {
        assumptions_file: None,
        resolved_driver_columns: drivers.into_iter().map(|d| (d.driver, d.column)).collect(),
        energy: EnergyInfo::from(&assumptions.energy),
        computed_metrics,
    };
    Ok((out, info))
}

/// Load the document at `path` and run [`compute_from_assumptions`].
///
/// # Errors
/// [`Error::FileNotFound`] if `path` does not exist, plus everything
/// [`Assumptions::load`] and [`compute_from_assumptions`] return.
pub fn compute_from_assumptions_file(
    batch: &RecordBatch,
    path: impl AsRef<Path>,
    y_pred_column: &str,
) -> Result<(RecordBatch, AssumptionsInfo)> {
    let path = path.as_ref();
    let assumptions = Assumptions::load(path)?;
    let (out, mut info) = compute_from_assumptions(batch, &assumptions, y_pred_column)?;
    info.assumptions_file = Some(path.to_path_buf());
    Ok((out, info))
}

fn weighted_energy(rows: usize, spec: &EnergySpec, drivers: &[DriverColumn]) -> Result<Vec<f64>> {
    let total: f64 = spec.weights.iter().map(|(_, w)| w).sum();
    if (total - 1.0).abs() > 1e-9 {
        tracing::debug!(total, "energy weights do not sum to 1");
    }

    let mut energy = vec![0.0; rows];
    match spec.method {
        EnergyMethod::WeightedSum => {
            for (name, weight) in &spec.weights {
                let driver = drivers
                    .iter()
                    .find(|d| d.driver == *name)
                    .ok_or_else(|| Error::config(format!("energy.weights refers to unknown driver '{name}'")))?;
                for (e, v) in energy.iter_mut().zip(&driver.values) {
                    *e += weight * v;
                }
            }
        }
    }

    Ok(match spec.normalize {
        Normalization::MinMax => normalize01(&energy),
        Normalization::None => energy,
    })
}
