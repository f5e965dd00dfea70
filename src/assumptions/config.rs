//! Assumptions document parsing and validation
//!
//! The document is read as an untyped `serde_json::Value` and checked section
//! by section so that every rejection names the offending key. Key order is
//! preserved (the crate enables `serde_json/preserve_order`), which fixes the
//! order of driver scope entries and of the appended metric columns.

use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::energy::DEFAULT_PREDICTION_COLUMN;
use crate::{Error, Result};

/// Scope name holding the computed energy array
pub const ENERGY_NAME: &str = "energy";
/// Scope name holding the raw predictions
pub const Y_PRED_NAME: &str = DEFAULT_PREDICTION_COLUMN;
/// Scope name holding the min-max normalized predictions
pub const Y_PRED_N_NAME: &str = "y_pred_n";

/// One logical driver and its candidate columns, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverSpec {
    /// Logical name, also the name the driver has inside metric expressions
    pub name: String,
    /// Physical column candidates
    pub candidates: Vec<String>,
}

/// How driver arrays are combined into energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMethod {
    /// `sum(w_k * driver_k)`
    #[default]
    WeightedSum,
}

impl FromStr for EnergyMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weighted_sum" => Ok(Self::WeightedSum),
            other => Err(Error::config(format!(
                "unsupported energy.method '{other}', only 'weighted_sum' is supported"
            ))),
        }
    }
}

/// Post-processing applied to the weighted sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Normalization {
    /// Rescale to `[0, 1]`
    #[default]
    #[serde(rename = "minmax")]
    MinMax,
    /// Keep the raw weighted sum
    #[serde(rename = "none")]
    None,
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minmax" => Ok(Self::MinMax),
            "none" => Ok(Self::None),
            other => Err(Error::config(format!(
                "unsupported energy.normalize '{other}', expected 'minmax' or 'none'"
            ))),
        }
    }
}

/// The `energy` section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySpec {
    /// Combination method
    pub method: EnergyMethod,
    /// Driver weights in document order; never empty
    pub weights: Vec<(String, f64)>,
    /// Post-processing
    pub normalize: Normalization,
}

/// One derived metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSpec {
    /// Metric name; the output column is `<name>_assumed`
    pub name: String,
    /// Expression source
    pub expression: String,
}

impl MetricSpec {
    /// Name of the column this metric is written to
    #[must_use]
    pub fn column(&self) -> String {
        format!("{}_assumed", self.name)
    }
}

/// A validated assumptions document.
///
/// # Example
/// ```
/// use ecoproxy::assumptions::Assumptions;
///
/// let doc = r#"{
///     "drivers": {"time": ["time_s", "time"]},
///     "energy": {"weights": {"time": 1.0}},
///     "metrics": {"co2": "0.7 * energy + 0.3 * y_pred_n"}
/// }"#;
/// let assumptions: Assumptions = doc.parse().unwrap();
/// assert_eq!(assumptions.metrics[0].column(), "co2_assumed");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assumptions {
    /// Declared drivers in document order
    pub drivers: Vec<DriverSpec>,
    /// Energy combination
    pub energy: EnergySpec,
    /// Metrics in document order; never empty
    pub metrics: Vec<MetricSpec>,
}

impl FromStr for Assumptions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json_str(s)
    }
}

impl Assumptions {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    /// [`Error::Json`] for malformed JSON, [`Error::Config`] for a document
    /// that parses but breaks a structural rule.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Read and validate the document at `path`.
    ///
    /// # Errors
    /// [`Error::FileNotFound`] if `path` does not exist, otherwise as
    /// [`Assumptions::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading assumptions");
        Self::from_json_str(&text)
    }

    /// Validate an already parsed document.
    ///
    /// # Errors
    /// [`Error::Config`] on any structural problem.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| Error::config("assumptions document must be a JSON object"))?;

        let drivers = parse_drivers(section(root, "drivers")?)?;
        let energy = parse_energy(section(root, "energy")?, &drivers)?;
        let metrics = parse_metrics(section(root, "metrics")?)?;

        Ok(Self {
            drivers,
            energy,
            metrics,
        })
    }

    /// Names a metric expression may reference
    #[must_use]
    pub fn scope_names(&self) -> Vec<&str> {
        let mut names = vec![ENERGY_NAME, Y_PRED_NAME, Y_PRED_N_NAME];
        names.extend(self.drivers.iter().map(|d| d.name.as_str()));
        names
    }
}

/// Fetch an optional object section; absent or `null` reads as empty.
fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Result<Option<&'a Map<String, Value>>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::config(format!("'{key}' must be a JSON object"))),
    }
}

fn is_reserved(name: &str) -> bool {
    [ENERGY_NAME, Y_PRED_NAME, Y_PRED_N_NAME].contains(&name)
}

fn parse_drivers(section: Option<&Map<String, Value>>) -> Result<Vec<DriverSpec>> {
    let Some(map) = section else {
        return Ok(Vec::new());
    };

    map.iter()
        .map(|(name, candidates)| {
            if is_reserved(name) {
                return Err(Error::config(format!(
                    "driver name '{name}' is reserved in metric expressions"
                )));
            }
            let list = candidates.as_array().ok_or_else(|| {
                Error::config(format!("drivers.{name} must be a list of column candidates"))
            })?;
            let candidates = list
                .iter()
                .map(|c| {
                    c.as_str().map(ToString::to_string).ok_or_else(|| {
                        Error::config(format!("drivers.{name} candidates must be strings, got {c}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(DriverSpec {
                name: name.clone(),
                candidates,
            })
        })
        .collect()
}

fn parse_energy(section: Option<&Map<String, Value>>, drivers: &[DriverSpec]) -> Result<EnergySpec> {
    let empty = Map::new();
    let map = section.unwrap_or(&empty);

    let method = match map.get("method") {
        None | Some(Value::Null) => EnergyMethod::default(),
        Some(Value::String(s)) => s.parse()?,
        Some(other) => return Err(Error::config(format!("energy.method must be a string, got {other}"))),
    };

    let normalize = match map.get("normalize") {
        None | Some(Value::Null) => Normalization::default(),
        Some(Value::String(s)) => s.parse()?,
        Some(other) => {
            return Err(Error::config(format!("energy.normalize must be a string, got {other}")))
        }
    };

    let weights = match map.get("weights") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(w)) => w
            .iter()
            .map(|(driver, weight)| {
                let weight = weight.as_f64().ok_or_else(|| {
                    Error::config(format!("energy.weights.{driver} must be a number, got {weight}"))
                })?;
                if !drivers.iter().any(|d| d.name == *driver) {
                    let declared: Vec<&str> = drivers.iter().map(|d| d.name.as_str()).collect();
                    return Err(Error::config(format!(
                        "energy.weights refers to unknown driver '{driver}', declared drivers: {declared:?}"
                    )));
                }
                Ok((driver.clone(), weight))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::config("energy.weights must be a JSON object")),
    };
    if weights.is_empty() {
        return Err(Error::config("energy.weights missing or empty"));
    }

    Ok(EnergySpec {
        method,
        weights,
        normalize,
    })
}

fn parse_metrics(section: Option<&Map<String, Value>>) -> Result<Vec<MetricSpec>> {
    let metrics = section
        .filter(|map| !map.is_empty())
        .ok_or_else(|| Error::config("metrics section missing or empty"))?;

    metrics
        .iter()
        .map(|(name, expression)| {
            if name == ENERGY_NAME {
                return Err(Error::config(
                    "metric name 'energy' collides with the energy_assumed column",
                ));
            }
            let expression = expression.as_str().ok_or_else(|| {
                Error::config(format!("metrics.{name} must be a string expression"))
            })?;
            Ok(MetricSpec {
                name: name.clone(),
                expression: expression.to_string(),
            })
        })
        .collect()
}
