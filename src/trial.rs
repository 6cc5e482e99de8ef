//! Single-trial execution and outcome classification.
//!
//! One trial is the unit of failure isolation for the whole sweep:
//! generate a panel, inject missingness, drop units left without enough
//! observations, fit both panel models, run the Hausman test, and classify
//! whatever happened into a `TrialOutcome`. A trial always returns a record;
//! estimation errors become labeled failures and unexpected panics are
//! caught at the trial boundary and recorded as system errors.

use std::panic::{self, AssertUnwindSafe};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::debug;

use crate::estimator::{fit_fixed_effects, fit_random_effects, hausman_test, UnitBlock};
use crate::panel::{generate_panel, PanelData};
use crate::scenario::Scenario;

/// Significance threshold for the specificity indicator.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Terminal outcome of one trial, ordered by pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum TrialOutcome {
    Success { p_value: f64 },
    DataFailure,
    ModelFailureFe,
    ModelFailureRe,
    HausmanFailure,
    SystemError,
}

impl TrialOutcome {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Success { .. } => "Success",
            Self::DataFailure => "Data Failure: Insufficient individuals",
            Self::ModelFailureFe => "Model Failure: FE model failed",
            Self::ModelFailureRe => "Model Failure: RE model failed",
            Self::HausmanFailure => "Hausman Test Failure",
            Self::SystemError => "System Error",
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self {
            Self::Success { p_value } => Some(*p_value),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One replication's record: the scenario it ran under, its index, and what
/// happened. Owned by the results table once produced.
#[derive(Clone, Debug, Serialize)]
pub struct TrialRecord {
    pub scenario: Scenario,
    pub replication: usize,
    pub outcome: TrialOutcome,
}

impl TrialRecord {
    pub fn p_value(&self) -> Option<f64> {
        self.outcome.p_value()
    }

    pub fn reason(&self) -> &'static str {
        self.outcome.reason()
    }

    /// 1 if the test fails to reject at the significance threshold, 0 if it
    /// rejects, absent when the trial produced no p-value.
    pub fn specificity(&self) -> Option<u8> {
        self.p_value()
            .map(|p| if p > SIGNIFICANCE_LEVEL { 1 } else { 0 })
    }
}

/// Units that keep enough observed outcomes to identify k coefficients in
/// the within transformation: strictly more than max(1, k) rows. Returns
/// their complete-case observations.
pub fn viable_units(panel: &PanelData, k: usize) -> Vec<UnitBlock> {
    let min_obs = k.max(1);
    let mut blocks = Vec::new();
    for unit in 0..panel.n_units {
        if panel.observed_outcomes(unit) <= min_obs {
            continue;
        }
        let rows = panel.unit_rows(unit);
        let mut outcomes = Vec::new();
        let mut covariates = Vec::new();
        for row in rows.iter().filter(|r| r.is_complete()) {
            outcomes.push(row.outcome.unwrap());
            covariates.push(row.covariates.iter().map(|c| c.unwrap()).collect());
        }
        blocks.push(UnitBlock {
            unit: unit as u32,
            outcomes,
            covariates,
        });
    }
    blocks
}

/// Run one replication to completion. Never panics and never aborts the
/// sweep: any outcome, including a caught panic, becomes a record.
pub fn run_trial(scenario: &Scenario, replication: usize, seed: u64) -> TrialRecord {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute_trial(scenario, seed)))
        .unwrap_or(TrialOutcome::SystemError);
    TrialRecord {
        scenario: *scenario,
        replication,
        outcome,
    }
}

fn execute_trial(scenario: &Scenario, seed: u64) -> TrialOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = scenario.shape.units();
    let t = scenario.shape.periods();
    let k = scenario.complexity.covariates();

    let mut panel = generate_panel(n, t, k, &mut rng);
    if scenario.dropout > 0.0 {
        scenario.mechanism.inject(&mut panel, scenario.dropout, &mut rng);
    }

    let sample = viable_units(&panel, k);
    if sample.len() < 2 {
        return TrialOutcome::DataFailure;
    }

    let fe = match fit_fixed_effects(&sample, k) {
        Ok(model) => model,
        Err(err) => {
            debug!(scenario = %scenario.label(), %err, "FE fit failed");
            return TrialOutcome::ModelFailureFe;
        }
    };

    let re = match fit_random_effects(&sample, k) {
        Ok(model) => model,
        Err(err) => {
            debug!(scenario = %scenario.label(), %err, "RE fit failed");
            return TrialOutcome::ModelFailureRe;
        }
    };

    match hausman_test(&fe, &re) {
        Ok(result) => TrialOutcome::Success {
            p_value: result.p_value,
        },
        Err(err) => {
            debug!(scenario = %scenario.label(), %err, "Hausman test failed");
            TrialOutcome::HausmanFailure
        }
    }
}
