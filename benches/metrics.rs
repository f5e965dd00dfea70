//! Metric engine benchmarks
//!
//! - Fixed-weight energy model
//! - Latent (PCA) energy model
//! - Assumptions engine: compile + evaluate
//! - Expression evaluation alone

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecoproxy::assumptions::{compute_from_assumptions, Assumptions};
use ecoproxy::energy::{LatentEnergyModel, WeightedEnergyModel};
use ecoproxy::expr::{CompiledExpr, Scope};
use std::sync::Arc;

const ASSUMPTIONS: &str = r#"{
    "drivers": {
        "time": ["time_s", "time"],
        "temperature": ["temperature", "temp"],
        "stirring": ["stirring", "rpm"]
    },
    "energy": {
        "weights": {"time": 0.4, "temperature": 0.4, "stirring": 0.2}
    },
    "metrics": {
        "co2": "0.7*energy + 0.3*y_pred_n",
        "mci": "clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)",
        "intensity": "sqrt(temperature ** 2 + time ** 2) / (1 + stirring)"
    }
}"#;

/// Deterministic process table with `num_rows` rows
#[allow(clippy::cast_precision_loss)]
fn create_process_batch(num_rows: usize) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("time_s", DataType::Float64, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("rpm", DataType::Float64, false),
        Field::new("y_pred", DataType::Float64, false),
    ]);
    let column = |f: &dyn Fn(f64) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values((0..num_rows).map(|i| f(i as f64))))
    };

    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            column(&|i| (i * 7.0) % 3600.0),
            column(&|i| 20.0 + (i * 13.0) % 80.0),
            column(&|i| 100.0 + (i * 31.0) % 900.0),
            column(&|i| (i * 0.37).sin()),
        ],
    )
    .unwrap()
}

fn bench_energy_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("energy_models");

    for size in [1_000, 10_000, 100_000] {
        let batch = create_process_batch(size);

        group.bench_with_input(BenchmarkId::new("weighted", size), &batch, |b, batch| {
            b.iter(|| black_box(WeightedEnergyModel::new().apply(batch).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("latent", size), &batch, |b, batch| {
            b.iter(|| black_box(LatentEnergyModel::new().apply(batch).unwrap()));
        });
    }

    group.finish();
}

fn bench_assumptions(c: &mut Criterion) {
    let mut group = c.benchmark_group("assumptions");
    let assumptions = Assumptions::from_json_str(ASSUMPTIONS).unwrap();

    group.bench_function("parse_document", |b| {
        b.iter(|| black_box(Assumptions::from_json_str(black_box(ASSUMPTIONS)).unwrap()));
    });

    for size in [1_000, 10_000, 100_000] {
        let batch = create_process_batch(size);
        group.bench_with_input(BenchmarkId::new("compute", size), &batch, |b, batch| {
            b.iter(|| black_box(compute_from_assumptions(batch, &assumptions, "y_pred").unwrap()));
        });
    }

    group.finish();
}

#[allow(clippy::cast_precision_loss)]
fn bench_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression");
    let source = "clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)";
    let names = ["energy", "y_pred_n"];

    group.bench_function("compile", |b| {
        b.iter(|| black_box(CompiledExpr::compile(black_box(source), &names).unwrap()));
    });

    let expr = CompiledExpr::compile(source, &names).unwrap();
    for size in [1_000, 100_000] {
        let mut scope = Scope::new(size);
        scope.insert("energy", (0..size).map(|i| (i % 100) as f64 / 100.0).collect());
        scope.insert("y_pred_n", (0..size).map(|i| (i % 37) as f64 / 37.0).collect());

        group.bench_with_input(BenchmarkId::new("evaluate", size), &scope, |b, scope| {
            b.iter(|| black_box(expr.evaluate(scope).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_energy_models, bench_assumptions, bench_expression);
criterion_main!(benches);
