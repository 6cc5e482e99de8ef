//! Hausman Test Missingness Simulation Library
//!
//! This library provides a Monte Carlo harness for measuring how missing-data
//! mechanisms degrade the reliability of the Hausman specification test when
//! choosing between fixed-effects and random-effects panel models.
//!
//! ## Modules
//!
//! - `panel`: balanced panel data synthesis
//! - `missing`: the four missingness injection mechanisms
//! - `estimator`: FE/RE estimation and the Hausman statistic
//! - `scenario`: experiment grid and feasibility pruning
//! - `trial`: single-trial pipeline with failure classification
//! - `results`: flat results table and per-mechanism summaries
//! - `sweep`: full scenario sweep controller
//!
//! ## Usage
//!
//! ```bash
//! # Run the full sweep (144 feasible scenarios x 100 replications)
//! cargo run --bin sweep --release
//!
//! # Smaller, reproducible run on one thread
//! cargo run --bin sweep --release -- --replications 10 --seed 7 --sequential
//! ```

pub mod estimator;
pub mod missing;
pub mod panel;
pub mod results;
pub mod scenario;
pub mod sweep;
pub mod trial;
