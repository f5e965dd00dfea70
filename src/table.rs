//! Column access over Arrow record batches
//!
//! Experiment tables arrive with inconsistent column naming (`time_s` vs
//! `time`, `stirring` vs `rpm`), so every engine goes through the resolver
//! here instead of indexing columns directly.
//!
//! Nothing in this module mutates its input: [`append_columns`] builds a new
//! batch that shares the untouched column buffers with the original.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::{Error, Result};

/// A driver resolved against a concrete table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverColumn {
    /// Logical driver name (`time`, `temperature`, ...)
    pub driver: String,
    /// Physical column that matched, `None` when no candidate was present
    pub column: Option<String>,
    /// Coerced values; all zeros when unresolved
    #[serde(skip)]
    pub values: Vec<f64>,
}

impl DriverColumn {
    /// Whether a physical column backs this driver.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.column.is_some()
    }
}

/// Return the first candidate that exists as a column in `batch`.
///
/// An empty candidate list simply resolves to `None`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use arrow::array::Float64Array;
/// use arrow::datatypes::{DataType, Field, Schema};
/// use arrow::record_batch::RecordBatch;
/// use ecoproxy::table::resolve_column;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![Field::new("rpm", DataType::Float64, false)]));
/// let batch = RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(vec![1.0]))])?;
///
/// assert_eq!(resolve_column(&batch, &["stirring", "rpm"]), Some("rpm"));
/// assert_eq!(resolve_column::<&str>(&batch, &[]), None);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn resolve_column<'a, S: AsRef<str>>(batch: &RecordBatch, candidates: &'a [S]) -> Option<&'a str> {
    let schema = batch.schema_ref();
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|name| schema.column_with_name(name).is_some())
}

/// Resolve a driver and coerce its column with [`numeric_or_zero`].
#[must_use]
pub fn resolve_driver<S: AsRef<str>>(
    batch: &RecordBatch,
    driver: &str,
    candidates: &[S],
) -> DriverColumn {
    let column = resolve_column(batch, candidates);
    let values = column
        .and_then(|name| batch.column_by_name(name))
        .map_or_else(|| vec![0.0; batch.num_rows()], numeric_or_zero);

    if column.is_none() {
        tracing::debug!(driver, "no candidate column present, using zeros");
    }

    DriverColumn {
        driver: driver.to_string(),
        column: column.map(ToString::to_string),
        values,
    }
}

/// Read a column as `f64`, mapping nulls and unparseable cells to NaN.
///
/// # Errors
/// Returns [`Error::ColumnNotFound`] if `name` is absent, or an Arrow error if
/// the column type cannot be cast to `Float64`.
pub fn float_values(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
    cast_f64(column)
}

/// Coerce an array to `f64`, mapping nulls, NaN, infinities and unparseable
/// cells to 0.0.
///
/// Types Arrow cannot cast to `Float64` become all zeros.
#[must_use]
pub fn numeric_or_zero(array: &ArrayRef) -> Vec<f64> {
    match cast_f64(array) {
        Ok(values) => values
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "column is not numeric, treating as zeros");
            vec![0.0; array.len()]
        }
    }
}

fn cast_f64(array: &ArrayRef) -> Result<Vec<f64>> {
    let casted = compute::cast(array, &DataType::Float64)?;
    let floats = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::StorageError("Failed to downcast to Float64Array".to_string()))?;
    Ok(floats.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Build a new batch with `columns` appended as non-null `Float64` fields.
///
/// A column whose name already exists replaces the old one in place.
///
/// # Errors
/// Returns an Arrow error if a column length differs from the batch row count.
pub fn append_columns(batch: &RecordBatch, columns: Vec<(String, Vec<f64>)>) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

    for (name, values) in columns {
        let array: ArrayRef = Arc::new(Float64Array::from(values));
        let field = Arc::new(Field::new(name.clone(), DataType::Float64, false));
        match fields.iter().position(|f| f.name() == &name) {
            Some(idx) => {
                fields[idx] = field;
                arrays[idx] = array;
            }
            None => {
                fields.push(field);
                arrays.push(array);
            }
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};

    fn create_test_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("time_s", DataType::Int32, false),
            Field::new("temp", DataType::Float64, true),
            Field::new("note", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![5, 10, 15])),
                Arc::new(Float64Array::from(vec![Some(20.0), None, Some(f64::NAN)])),
                Arc::new(StringArray::from(vec![Some("1.5"), Some("n/a"), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let batch = create_test_batch();
        assert_eq!(resolve_column(&batch, &["time", "time_s", "temp"]), Some("time_s"));
        assert_eq!(resolve_column(&batch, &["temp", "time_s"]), Some("temp"));
    }

    #[test]
    fn test_resolve_none() {
        let batch = create_test_batch();
        assert_eq!(resolve_column(&batch, &["rpm", "stirring"]), None);
        let empty: [String; 0] = [];
        assert_eq!(resolve_column(&batch, &empty), None);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let batch = create_test_batch();
        assert_eq!(resolve_column(&batch, &["Time_s"]), None);
    }

    #[test]
    fn test_resolve_driver_unresolved_is_zeros() {
        let batch = create_test_batch();
        let driver = resolve_driver(&batch, "stirring", &["rpm"]);
        assert!(!driver.is_resolved());
        assert_eq!(driver.values, vec![0.0; 3]);
    }

    #[test]
    fn test_resolve_driver_coerces_invalid_to_zero() {
        let batch = create_test_batch();
        let temp = resolve_driver(&batch, "temperature", &["temp"]);
        assert_eq!(temp.column.as_deref(), Some("temp"));
        assert_eq!(temp.values, vec![20.0, 0.0, 0.0]);

        let note = resolve_driver(&batch, "note", &["note"]);
        assert_eq!(note.values, vec![1.5, 0.0, 0.0]);
    }

    #[test]
    fn test_numeric_or_zero_maps_infinities_to_zero() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![
            Some(1.0),
            Some(f64::INFINITY),
            Some(f64::NEG_INFINITY),
            None,
        ]));
        assert_eq!(numeric_or_zero(&array), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_float_values_keeps_nan() {
        let batch = create_test_batch();
        let values = float_values(&batch, "temp").unwrap();
        assert_eq!(values[0], 20.0);
        assert!(values[1].is_nan());
        assert!(values[2].is_nan());

        let ints = float_values(&batch, "time_s").unwrap();
        assert_eq!(ints, vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_float_values_missing_column() {
        let batch = create_test_batch();
        let err = float_values(&batch, "y_pred").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "y_pred"));
    }

    #[test]
    fn test_append_columns_preserves_original() {
        let batch = create_test_batch();
        let out = append_columns(&batch, vec![("energy".to_string(), vec![0.0, 0.5, 1.0])]).unwrap();

        assert_eq!(batch.num_columns(), 3);
        assert_eq!(out.num_columns(), 4);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.schema().field(3).name(), "energy");
        assert_eq!(out.column(0), batch.column(0));
    }

    #[test]
    fn test_append_columns_replaces_existing() {
        let batch = create_test_batch();
        let out = append_columns(&batch, vec![("temp".to_string(), vec![1.0, 2.0, 3.0])]).unwrap();

        assert_eq!(out.num_columns(), 3);
        assert_eq!(float_values(&out, "temp").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_append_columns_length_mismatch() {
        let batch = create_test_batch();
        let result = append_columns(&batch, vec![("bad".to_string(), vec![1.0])]);
        assert!(matches!(result, Err(Error::Arrow(_))));
    }
}
