//! Sustainability Pipeline: CSV → Energy Models → Assumptions → Run Log
//!
//! This example demonstrates the complete workflow:
//! 1. Load a process table from CSV
//! 2. Apply the fixed-weight and latent energy models
//! 3. Compute metrics from an assumptions document
//! 4. Write the result table and a run log
//!
//! Run with: cargo run --example assumptions_pipeline

use ecoproxy::assumptions::compute_from_assumptions_file;
use ecoproxy::energy::{LatentEnergyModel, WeightedEnergyModel};
use ecoproxy::logging::init_tracing;
use ecoproxy::runlog::{sha256_file, RunLogWriter};
use ecoproxy::storage::{load_csv, write_csv};
use serde_json::json;

const PROCESS_CSV: &str = "\
sample,time_s,temperature,stiring,y_pred
S1,600,25,200,0.62
S2,900,40,350,0.71
S3,1200,55,300,0.80
S4,1800,60,500,0.77
S5,2400,80,650,0.91
";

const ASSUMPTIONS: &str = r#"{
  "drivers": {
    "time": ["time_s", "time"],
    "temperature": ["temperature", "temp"],
    "stirring": ["stirring", "stiring", "rpm"]
  },
  "energy": {
    "method": "weighted_sum",
    "weights": {"time": 0.5, "temperature": 0.3, "stirring": 0.2},
    "normalize": "minmax"
  },
  "metrics": {
    "co2": "0.7*energy + 0.3*y_pred_n",
    "mci": "clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)",
    "hot_run": "temperature >= 55"
  }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let workspace = tempfile::tempdir()?;
    let data_path = workspace.path().join("data").join("processed.csv");
    let assumptions_path = workspace.path().join("metadata").join("assumptions.json");
    std::fs::create_dir_all(data_path.parent().ok_or("no parent")?)?;
    std::fs::create_dir_all(assumptions_path.parent().ok_or("no parent")?)?;
    std::fs::write(&data_path, PROCESS_CSV)?;
    std::fs::write(&assumptions_path, ASSUMPTIONS)?;

    // Step 1: load
    let table = load_csv(&data_path)?;
    println!("Loaded {} rows x {} columns", table.num_rows(), table.num_columns());

    // Step 2: energy models
    let (weighted, used) = WeightedEnergyModel::new().apply(&table)?;
    println!("Fixed-weight drivers: {}", serde_json::to_string(&used)?);

    let (latent, info) = LatentEnergyModel::new().apply(&weighted)?;
    println!("Latent model: {}", serde_json::to_string(&info)?);

    // Step 3: assumptions
    let (out, assumptions_info) = compute_from_assumptions_file(&latent, &assumptions_path, "y_pred")?;
    println!("Assumptions: {}", serde_json::to_string_pretty(&assumptions_info)?);

    // Step 4: persist
    let report = workspace.path().join("reports").join("sustainability.csv");
    write_csv(&out, &report)?;
    println!("Wrote {} columns to {}", out.num_columns(), report.display());

    let log = RunLogWriter::new(workspace.path()).write(
        "sustainability_eval",
        json!({
            "input": data_path.display().to_string(),
            "input_sha256": sha256_file(&data_path)?,
            "assumptions": assumptions_info,
            "latent": info,
            "output": report.display().to_string(),
        }),
    )?;
    println!("Run log: {}", log.display());

    Ok(())
}
