//! End-to-end tests for assumption-driven metrics

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ecoproxy::assumptions::{
    compute_from_assumptions, compute_from_assumptions_file, Assumptions, ENERGY_ASSUMED,
};
use ecoproxy::table::float_values;
use ecoproxy::Error;

// ============================================================================
// Fixtures
// ============================================================================

fn float_batch(columns: &[(&str, Vec<f64>)]) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Float64, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(Float64Array::from(values.clone())) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// temperature/time_s/y_pred all increasing over three rows
fn scenario_batch() -> RecordBatch {
    float_batch(&[
        ("temperature", vec![10.0, 20.0, 30.0]),
        ("time_s", vec![5.0, 10.0, 15.0]),
        ("y_pred", vec![1.0, 2.0, 3.0]),
    ])
}

const SCENARIO: &str = r#"{
    "drivers": {
        "temperature": ["temperature", "temp"],
        "time": ["time_s", "time"]
    },
    "energy": {"weights": {"temperature": 0.5, "time": 0.5}},
    "metrics": {
        "co2": "0.7*energy + 0.3*y_pred_n",
        "mci": "clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)"
    }
}"#;

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_golden_scenario() {
    let assumptions = Assumptions::from_json_str(SCENARIO).unwrap();
    let (out, info) = compute_from_assumptions(&scenario_batch(), &assumptions, "y_pred").unwrap();

    assert_close(&float_values(&out, ENERGY_ASSUMED).unwrap(), &[0.0, 0.5, 1.0]);
    assert_close(&float_values(&out, "co2_assumed").unwrap(), &[0.0, 0.5, 1.0]);
    assert_close(&float_values(&out, "mci_assumed").unwrap(), &[1.0, 0.5, 0.0]);

    assert_eq!(info.computed_metrics.len(), 2);
    assert_eq!(info.computed_metrics[0].0, "co2");
    assert_eq!(info.computed_metrics[1].1.column, "mci_assumed");
}

#[test]
fn test_output_has_n_plus_one_new_columns() {
    let assumptions = Assumptions::from_json_str(SCENARIO).unwrap();
    let input = scenario_batch();
    let (out, _) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();

    assert_eq!(out.num_columns(), input.num_columns() + assumptions.metrics.len() + 1);
    assert_eq!(out.num_rows(), input.num_rows());
    // input is untouched
    assert_eq!(input.num_columns(), 3);
}

#[test]
fn test_driver_fallback_to_second_candidate_and_zeros() {
    let input = float_batch(&[
        ("temp", vec![0.0, 50.0, 100.0]),
        ("y_pred", vec![3.0, 3.0, 3.0]),
    ]);
    let assumptions = Assumptions::from_json_str(SCENARIO).unwrap();
    let (out, info) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();

    assert_eq!(
        info.resolved_driver_columns,
        vec![
            ("temperature".to_string(), Some("temp".to_string())),
            ("time".to_string(), None),
        ]
    );
    // time contributes zeros; normalized energy follows temp alone
    assert_close(&float_values(&out, ENERGY_ASSUMED).unwrap(), &[0.0, 0.5, 1.0]);
}

#[test]
fn test_driver_values_in_scope() {
    let assumptions = Assumptions::from_json_str(
        r#"{
            "drivers": {"time": ["time_s"], "temperature": ["temperature"]},
            "energy": {"weights": {"time": 1}, "normalize": "none"},
            "metrics": {"heat_per_s": "temperature / time", "hot": "temperature >= 20"}
        }"#,
    )
    .unwrap();
    let (out, _) = compute_from_assumptions(&scenario_batch(), &assumptions, "y_pred").unwrap();

    assert_close(&float_values(&out, ENERGY_ASSUMED).unwrap(), &[5.0, 10.0, 15.0]);
    assert_close(&float_values(&out, "heat_per_s_assumed").unwrap(), &[2.0, 2.0, 2.0]);
    assert_close(&float_values(&out, "hot_assumed").unwrap(), &[0.0, 1.0, 1.0]);
}

#[test]
fn test_driver_named_like_a_function() {
    let assumptions = Assumptions::from_json_str(
        r#"{
            "drivers": {"exp": ["temperature"], "time": ["time_s"], "max": ["y_pred"]},
            "energy": {"weights": {"time": 1}, "normalize": "none"},
            "metrics": {"m": "exp + energy", "calls": "exp(0) * exp + max(max, 2)"}
        }"#,
    )
    .unwrap();
    let (out, info) = compute_from_assumptions(&scenario_batch(), &assumptions, "y_pred").unwrap();

    assert_eq!(info.resolved_driver_columns[0], ("exp".to_string(), Some("temperature".to_string())));
    assert_close(&float_values(&out, "m_assumed").unwrap(), &[15.0, 30.0, 45.0]);
    assert_close(&float_values(&out, "calls_assumed").unwrap(), &[12.0, 22.0, 33.0]);
}

#[test]
fn test_non_numeric_driver_cells_become_zero() {
    let schema = Schema::new(vec![
        Field::new("time_s", DataType::Utf8, true),
        Field::new("y_pred", DataType::Float64, false),
    ]);
    let input = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(vec![Some("4"), Some("abc"), None])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
        ],
    )
    .unwrap();
    let assumptions = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"time": 1}, "normalize": "none"}, "metrics": {"t": "time"}}"#,
    )
    .unwrap();
    let (out, _) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();
    assert_eq!(float_values(&out, "t_assumed").unwrap(), vec![4.0, 0.0, 0.0]);
}

#[test]
fn test_predictions_keep_nan() {
    let input = float_batch(&[
        ("time_s", vec![1.0, 2.0, 3.0]),
        ("y_pred", vec![1.0, f64::NAN, 3.0]),
    ]);
    let assumptions = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"time": 1}}, "metrics": {"y": "y_pred_n"}}"#,
    )
    .unwrap();
    let (out, _) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();
    let y = float_values(&out, "y_assumed").unwrap();
    assert_eq!(y[0], 0.0);
    assert!(y[1].is_nan());
    assert_eq!(y[2], 1.0);
}

#[test]
fn test_existing_output_column_is_replaced() {
    let input = float_batch(&[
        ("time_s", vec![0.0, 1.0]),
        ("y_pred", vec![0.0, 1.0]),
        ("co2_assumed", vec![99.0, 99.0]),
    ]);
    let assumptions = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"time": 1}}, "metrics": {"co2": "energy * 2"}}"#,
    )
    .unwrap();
    let (out, _) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();

    assert_eq!(out.num_columns(), 4);
    assert_eq!(out.schema().field(2).name(), "co2_assumed");
    assert_eq!(float_values(&out, "co2_assumed").unwrap(), vec![0.0, 2.0]);
}

#[test]
fn test_zero_row_table() {
    let input = float_batch(&[("time_s", vec![]), ("y_pred", vec![])]);
    let assumptions = Assumptions::from_json_str(SCENARIO).unwrap();
    let (out, _) = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap();
    assert_eq!(out.num_rows(), 0);
    assert_eq!(out.num_columns(), 5);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_unsafe_metric_fails_whole_call() {
    let assumptions = Assumptions::from_json_str(
        r#"{
            "drivers": {"time": ["time_s"]},
            "energy": {"weights": {"time": 1}},
            "metrics": {"ok": "energy", "evil": "os.system('rm -rf /')"}
        }"#,
    )
    .unwrap();
    let err = compute_from_assumptions(&scenario_batch(), &assumptions, "y_pred").unwrap_err();
    match err {
        Error::UnsafeExpression { pattern, .. } => assert_eq!(pattern, "os."),
        other => panic!("expected unsafe expression, got {other:?}"),
    }
}

#[test]
fn test_dunder_metric_is_unsafe() {
    let assumptions = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"time": 1}}, "metrics": {"x": "energy.__class__"}}"#,
    )
    .unwrap();
    let err = compute_from_assumptions(&scenario_batch(), &assumptions, "y_pred").unwrap_err();
    assert!(matches!(err, Error::UnsafeExpression { ref pattern, .. } if pattern == "__"));
}

#[test]
fn test_unknown_name_is_invalid_before_any_computation() {
    let assumptions = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"time": 1}}, "metrics": {"x": "energy + humidity"}}"#,
    )
    .unwrap();
    // missing prediction column would also fail, but compilation comes first
    let err = compute_from_assumptions(&scenario_batch(), &assumptions, "no_such").unwrap_err();
    match err {
        Error::InvalidExpression { reason, .. } => assert!(reason.contains("humidity")),
        other => panic!("expected invalid expression, got {other:?}"),
    }
}

#[test]
fn test_weight_for_undeclared_driver() {
    let err = Assumptions::from_json_str(
        r#"{"drivers": {"time": ["time_s"]}, "energy": {"weights": {"stirring": 1}}, "metrics": {"x": "energy"}}"#,
    )
    .unwrap_err();
    match err {
        Error::Config(msg) => assert!(msg.contains("unknown driver 'stirring'")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_missing_prediction_column() {
    let assumptions = Assumptions::from_json_str(SCENARIO).unwrap();
    let input = float_batch(&[("time_s", vec![1.0])]);
    let err = compute_from_assumptions(&input, &assumptions, "y_pred").unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "y_pred"));
}

// ============================================================================
// File entry point
// ============================================================================

#[test]
fn test_compute_from_file_records_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assumptions.json");
    std::fs::write(&path, SCENARIO).unwrap();

    let (out, info) = compute_from_assumptions_file(&scenario_batch(), &path, "y_pred").unwrap();
    assert_eq!(info.assumptions_file.as_deref(), Some(path.as_path()));
    assert!(out.column_by_name("mci_assumed").is_some());

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["assumptions_file"], path.display().to_string());
}

#[test]
fn test_compute_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = compute_from_assumptions_file(&scenario_batch(), &path, "y_pred").unwrap_err();
    match err {
        Error::FileNotFound(p) => assert_eq!(p, path),
        other => panic!("expected file not found, got {other:?}"),
    }
}
