//! Assumption-driven sustainability metrics
//!
//! A JSON document declares which columns feed each driver, how the drivers
//! combine into a 0..1 energy signal, and a set of named metric expressions
//! over that energy, the predictions and the drivers:
//!
//! ```json
//! {
//!   "drivers": {
//!     "time": ["time_s", "time"],
//!     "temperature": ["temperature", "temp"],
//!     "stirring": ["stirring", "rpm"]
//!   },
//!   "energy": {
//!     "method": "weighted_sum",
//!     "weights": {"time": 0.4, "temperature": 0.4, "stirring": 0.2},
//!     "normalize": "minmax"
//!   },
//!   "metrics": {
//!     "co2": "0.7*energy + 0.3*y_pred_n",
//!     "mci": "clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)"
//!   }
//! }
//! ```
//!
//! Each metric lands in `<name>_assumed`; the energy itself in
//! `energy_assumed`. Expressions are compiled by [`crate::expr`].

mod config;
mod engine;

pub use config::{
    Assumptions, DriverSpec, EnergyMethod, EnergySpec, MetricSpec, Normalization, ENERGY_NAME,
    Y_PRED_NAME, Y_PRED_N_NAME,
};
pub use engine::{
    compute_from_assumptions, compute_from_assumptions_file, AssumptionsInfo, ComputedMetric,
    EnergyInfo, ENERGY_ASSUMED,
};
