//! # ecoproxy: Sustainability Proxy Metrics for Process Data
//!
//! **Version**: 0.2.0
//!
//! ecoproxy turns experiment tables (process drivers such as time,
//! temperature and stirring, plus a model prediction column) into 0..1
//! sustainability proxies: an energy signal, a CO2 proxy and a material
//! circularity proxy.
//!
//! ## Engines
//!
//! - [`energy::WeightedEnergyModel`]: fixed-weight sum of normalized drivers
//! - [`energy::LatentEnergyModel`]: first principal component of the drivers
//! - [`assumptions`]: drivers, weights and metric formulas from a JSON
//!   document, evaluated by the restricted [`expr`] language
//!
//! Every engine takes an Arrow [`RecordBatch`](arrow::record_batch::RecordBatch),
//! leaves it untouched and returns a new batch plus a serializable info
//! record.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ecoproxy::assumptions::compute_from_assumptions_file;
//! use ecoproxy::storage::{load_csv, write_csv};
//!
//! let table = load_csv("data/processed.csv")?;
//! let (out, info) = compute_from_assumptions_file(&table, "metadata/assumptions.json", "y_pred")?;
//! write_csv(&out, "reports/sustainability.csv")?;
//! println!("{}", serde_json::to_string_pretty(&info)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod assumptions;
pub mod energy;
pub mod error;
pub mod expr;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod runlog;
pub mod storage;
pub mod table;

pub use assumptions::{compute_from_assumptions, compute_from_assumptions_file, Assumptions};
pub use energy::{LatentEnergyModel, WeightedEnergyModel};
pub use error::{Error, Result};
