//! Balanced panel data synthesis.
//!
//! Generates the complete (pre-missingness) panel for one trial: N units
//! observed over T periods with k covariates and a linear outcome.
//!
//! ## Data generating process
//! - Unit effect: Normal(0, 2), drawn once per unit, constant over its periods
//! - Covariates: k independent standard Normal draws per row
//! - Idiosyncratic error: Normal(0, 1.5) per row
//! - Outcome: sum of covariates (unit coefficients) + unit effect + error
//!
//! Covariates are independent of the unit effect, so the random-effects
//! orthogonality assumption holds by construction and the Hausman null is
//! true in every generated panel.

use rand::Rng;
use rand_distr::{Distribution, Normal};

pub const UNIT_EFFECT_SD: f64 = 2.0;
pub const ERROR_SD: f64 = 1.5;

/// One (unit, period) observation. A cell that has been overwritten by a
/// missingness mechanism is `None`; identifiers and the latent unit effect
/// are never cleared.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelRow {
    pub unit: u32,
    /// 1-based time period.
    pub period: u32,
    pub unit_effect: f64,
    pub covariates: Vec<Option<f64>>,
    pub outcome: Option<f64>,
}

impl PanelRow {
    /// True when the outcome and every covariate are observed.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some() && self.covariates.iter().all(|c| c.is_some())
    }

    /// Overwrite the observed cells (outcome + covariates) with missing.
    pub(crate) fn clear_observed(&mut self) {
        self.outcome = None;
        for c in &mut self.covariates {
            *c = None;
        }
    }
}

/// A dense panel, unit-major and period-ascending: row index = unit * T + (period - 1).
#[derive(Clone, Debug, PartialEq)]
pub struct PanelData {
    pub n_units: usize,
    pub n_periods: usize,
    pub n_covariates: usize,
    pub rows: Vec<PanelRow>,
}

impl PanelData {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn unit_rows(&self, unit: usize) -> &[PanelRow] {
        let t = self.n_periods;
        &self.rows[unit * t..(unit + 1) * t]
    }

    pub(crate) fn unit_rows_mut(&mut self, unit: usize) -> &mut [PanelRow] {
        let t = self.n_periods;
        &mut self.rows[unit * t..(unit + 1) * t]
    }

    /// Number of rows whose outcome is observed, per unit.
    pub fn observed_outcomes(&self, unit: usize) -> usize {
        self.unit_rows(unit)
            .iter()
            .filter(|r| r.outcome.is_some())
            .count()
    }
}

/// Synthesize a complete balanced panel of `n_units` x `n_periods` rows.
pub fn generate_panel(
    n_units: usize,
    n_periods: usize,
    n_covariates: usize,
    rng: &mut impl Rng,
) -> PanelData {
    let effect_dist = Normal::new(0.0, UNIT_EFFECT_SD).unwrap();
    let covariate_dist = Normal::new(0.0, 1.0).unwrap();
    let error_dist = Normal::new(0.0, ERROR_SD).unwrap();

    let mut rows = Vec::with_capacity(n_units * n_periods);
    for unit in 0..n_units {
        let unit_effect: f64 = effect_dist.sample(rng);
        for period in 1..=n_periods {
            let covariates: Vec<f64> =
                (0..n_covariates).map(|_| covariate_dist.sample(rng)).collect();
            let error: f64 = error_dist.sample(rng);
            let outcome = covariates.iter().sum::<f64>() + unit_effect + error;

            rows.push(PanelRow {
                unit: unit as u32,
                period: period as u32,
                unit_effect,
                covariates: covariates.into_iter().map(Some).collect(),
                outcome: Some(outcome),
            });
        }
    }

    PanelData {
        n_units,
        n_periods,
        n_covariates,
        rows,
    }
}
