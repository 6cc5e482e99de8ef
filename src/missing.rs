//! Missingness injection mechanisms.
//!
//! Four interchangeable strategies that overwrite outcome/covariate cells of
//! a complete panel with missing, given a target dropout fraction. Rows are
//! never removed and unit/period keys are never touched; only the observed
//! cells change.
//!
//! ## Mechanisms
//! - `Random`: MCAR, exact round(delta * N * T) rows uniformly without replacement
//! - `EarlyExit`: absorbing dropout, selected units never return after their exit period
//! - `LateMissing`: MAR, per-row probability grows linearly in the time period
//! - `Cyclical`: MAR, elevated probability inside a contiguous mid-sample window
//!
//! Only `Random` hits the target fraction exactly; the other three flip rows
//! independently and realize the target only in expectation.

use rand::Rng;
use serde::Serialize;

use crate::panel::PanelData;

/// Ceiling on any per-row missingness probability.
const MAX_ROW_PROB: f64 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MissingMechanism {
    Random,
    EarlyExit,
    LateMissing,
    Cyclical,
}

impl MissingMechanism {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Random,
            Self::EarlyExit,
            Self::LateMissing,
            Self::Cyclical,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::EarlyExit => "Early Exit",
            Self::LateMissing => "Late Missing",
            Self::Cyclical => "Cyclical",
        }
    }

    /// Statistical classification of the mechanism.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Random => "MCAR",
            Self::EarlyExit => "MNAR (right-censoring)",
            Self::LateMissing => "MAR (time-increasing)",
            Self::Cyclical => "MAR (periodic)",
        }
    }

    /// Inject missingness into `panel` at target fraction `dropout`.
    /// `dropout = 0` leaves the panel untouched for every mechanism.
    pub fn inject(&self, panel: &mut PanelData, dropout: f64, rng: &mut impl Rng) {
        if dropout <= 0.0 {
            return;
        }
        match self {
            Self::Random => inject_random(panel, dropout, rng),
            Self::EarlyExit => inject_early_exit(panel, dropout, rng),
            Self::LateMissing => inject_late_missing(panel, dropout, rng),
            Self::Cyclical => inject_cyclical(panel, dropout, rng),
        }
    }
}

/// MCAR: null out an exact count of uniformly chosen rows.
fn inject_random(panel: &mut PanelData, dropout: f64, rng: &mut impl Rng) {
    let total = panel.total_rows();
    let target = ((dropout * total as f64).round() as usize).min(total);
    if target == 0 {
        return;
    }

    for idx in rand::seq::index::sample(rng, total, target) {
        panel.rows[idx].clear_observed();
    }
}

/// Absorbing dropout: each selected unit draws an exit period in {2..T} and
/// contributes no observed cells from that period on. The unit count formula
/// round(2 * N * dropout) is capped at N so dropout > 0.5 stays well defined.
fn inject_early_exit(panel: &mut PanelData, dropout: f64, rng: &mut impl Rng) {
    let n_units = panel.n_units;
    let t = panel.n_periods;
    if t < 2 {
        return; // no exit period to draw
    }

    let target = (2.0 * n_units as f64 * dropout).round() as usize;
    let n_exiting = target.max(1).min(n_units);

    let chosen: Vec<usize> = rand::seq::index::sample(rng, n_units, n_exiting).into_vec();
    for unit in chosen {
        let exit_period = rng.gen_range(2..=t) as u32;
        for row in panel.unit_rows_mut(unit) {
            if row.period >= exit_period {
                row.clear_observed();
            }
        }
    }
}

/// MAR with probability rising linearly in the period: p(t) = min(c*t, 0.95)
/// with c = 2*dropout/(T+1), which integrates to the target fraction.
fn inject_late_missing(panel: &mut PanelData, dropout: f64, rng: &mut impl Rng) {
    let t = panel.n_periods as f64;
    let slope = 2.0 * dropout / (t + 1.0);

    for row in &mut panel.rows {
        let p = (slope * row.period as f64).min(MAX_ROW_PROB);
        if rng.gen::<f64>() < p {
            row.clear_observed();
        }
    }
}

/// MAR with a contiguous "high" window over the middle third of the sample.
/// p_low is solved so the expected overall fraction equals the target when
/// the cap does not bind: p_low = T*dropout / (3*T_high + T_low).
fn inject_cyclical(panel: &mut PanelData, dropout: f64, rng: &mut impl Rng) {
    let t = panel.n_periods;
    let window_start = (t / 3 + 1) as u32;
    let window_end = (2 * t / 3) as u32;
    let t_high = if window_end >= window_start {
        (window_end - window_start + 1) as usize
    } else {
        0
    };
    let t_low = t - t_high;

    let p_low = t as f64 * dropout / (3.0 * t_high as f64 + t_low as f64);
    let p_high = (3.0 * p_low).min(MAX_ROW_PROB);

    for row in &mut panel.rows {
        let in_window = row.period >= window_start && row.period <= window_end;
        let p = if in_window { p_high } else { p_low };
        if rng.gen::<f64>() < p {
            row.clear_observed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::generate_panel;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fresh_panel(seed: u64) -> PanelData {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generate_panel(100, 8, 2, &mut rng)
    }

    fn missing_rows(panel: &PanelData) -> usize {
        panel.rows.iter().filter(|r| !r.is_complete()).count()
    }

    #[test]
    fn test_zero_dropout_is_noop() {
        for mechanism in MissingMechanism::all() {
            let mut rng = ChaCha8Rng::seed_from_u64(10);
            let panel = fresh_panel(10);
            let mut injected = panel.clone();
            mechanism.inject(&mut injected, 0.0, &mut rng);
            assert_eq!(injected, panel, "{} altered the panel at dropout 0", mechanism.name());
        }
    }

    #[test]
    fn test_shape_and_keys_preserved() {
        for mechanism in MissingMechanism::all() {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let panel = fresh_panel(11);
            let mut injected = panel.clone();
            mechanism.inject(&mut injected, 0.3, &mut rng);

            assert_eq!(injected.total_rows(), panel.total_rows());
            for (before, after) in panel.rows.iter().zip(&injected.rows) {
                assert_eq!(after.unit, before.unit);
                assert_eq!(after.period, before.period);
                assert_eq!(after.unit_effect, before.unit_effect);
                // Cells are either untouched or cleared, never rewritten.
                match after.outcome {
                    Some(y) => assert_eq!(Some(y), before.outcome),
                    None => {
                        assert!(after.covariates.iter().all(|c| c.is_none()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_random_hits_exact_row_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut panel = fresh_panel(12);
        let total = panel.total_rows();

        MissingMechanism::Random.inject(&mut panel, 0.25, &mut rng);
        let expected = (0.25 * total as f64).round() as usize;
        assert_eq!(missing_rows(&panel), expected);
    }

    #[test]
    fn test_early_exit_is_monotone_per_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut panel = fresh_panel(13);
        MissingMechanism::EarlyExit.inject(&mut panel, 0.4, &mut rng);

        for unit in 0..panel.n_units {
            let mut seen_missing = false;
            for row in panel.unit_rows(unit) {
                if row.outcome.is_none() {
                    seen_missing = true;
                } else {
                    assert!(!seen_missing, "unit {} resumed after exiting", unit);
                }
            }
        }
    }

    #[test]
    fn test_early_exit_never_clears_first_period() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let mut panel = fresh_panel(14);
        MissingMechanism::EarlyExit.inject(&mut panel, 0.4, &mut rng);

        for unit in 0..panel.n_units {
            assert!(panel.unit_rows(unit)[0].outcome.is_some());
        }
    }

    #[test]
    fn test_early_exit_unit_count_caps_at_n() {
        // 2 * N * 0.8 = 16 > N = 10; the cap keeps the sample size valid.
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut panel = {
            let mut gen_rng = ChaCha8Rng::seed_from_u64(15);
            generate_panel(10, 4, 1, &mut gen_rng)
        };
        MissingMechanism::EarlyExit.inject(&mut panel, 0.8, &mut rng);

        let exited = (0..panel.n_units)
            .filter(|&u| panel.observed_outcomes(u) < panel.n_periods)
            .count();
        assert_eq!(exited, 10);
    }

    #[test]
    fn test_stochastic_mechanisms_land_near_target() {
        // Large panel so sampling noise stays well inside the tolerance.
        for mechanism in [MissingMechanism::LateMissing, MissingMechanism::Cyclical] {
            let mut rng = ChaCha8Rng::seed_from_u64(16);
            let mut gen_rng = ChaCha8Rng::seed_from_u64(16);
            let mut panel = generate_panel(500, 12, 1, &mut gen_rng);
            mechanism.inject(&mut panel, 0.3, &mut rng);

            let realized = missing_rows(&panel) as f64 / panel.total_rows() as f64;
            assert!(
                (realized - 0.3).abs() < 0.05,
                "{} realized fraction {:.3}",
                mechanism.name(),
                realized
            );
        }
    }

    #[test]
    fn test_late_missing_rates_rise_with_period() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut gen_rng = ChaCha8Rng::seed_from_u64(17);
        let mut panel = generate_panel(2000, 6, 1, &mut gen_rng);
        MissingMechanism::LateMissing.inject(&mut panel, 0.3, &mut rng);

        let rate = |period: u32| {
            let rows = panel.rows.iter().filter(|r| r.period == period);
            let (missing, total) = rows.fold((0usize, 0usize), |(m, n), r| {
                (m + r.outcome.is_none() as usize, n + 1)
            });
            missing as f64 / total as f64
        };
        assert!(rate(6) > rate(1));
    }
}
