//! Panel model estimation and the Hausman comparison.
//!
//! The statistical capability consumed by the trial runner: a fixed-effects
//! (within) estimator, a random-effects (Swamy-Arora GLS) estimator, and the
//! Hausman specification test comparing the two. Linear algebra is done with
//! `nalgebra` Cholesky solves; the test p-value comes from the `statrs`
//! chi-squared CDF.
//!
//! All three operations are fallible on ill-conditioned input and report
//! typed errors instead of panicking:
//! - rank-deficient (singular) design matrices
//! - too few observations for the parameter count
//! - a non-invertible or negative-definite covariance difference in the test
//!
//! Estimation runs on complete-case observations grouped per unit; groups
//! may have unequal sizes once missingness has thinned the panel.

use nalgebra::{Cholesky, DMatrix, DVector};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("design matrix is singular or rank-deficient")]
    SingularDesign,
    #[error("too few observations: need more than {needed}, have {available}")]
    InsufficientObservations { needed: usize, available: usize },
    #[error("covariance difference is not invertible")]
    SingularCovariance,
    #[error("Hausman statistic is negative ({0:.4})")]
    NegativeStatistic(f64),
    #[error("estimation produced a non-finite value")]
    NonFinite,
}

/// Complete-case observations for one unit.
#[derive(Clone, Debug)]
pub struct UnitBlock {
    pub unit: u32,
    pub outcomes: Vec<f64>,
    /// One row of k covariate values per observation.
    pub covariates: Vec<Vec<f64>>,
}

impl UnitBlock {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn means(&self, k: usize) -> (f64, Vec<f64>) {
        let t = self.len() as f64;
        let y_mean = self.outcomes.iter().sum::<f64>() / t;
        let mut x_mean = vec![0.0; k];
        for row in &self.covariates {
            for (j, v) in row.iter().enumerate() {
                x_mean[j] += v;
            }
        }
        for m in &mut x_mean {
            *m /= t;
        }
        (y_mean, x_mean)
    }
}

/// A fitted panel model: k slope coefficients with their covariance matrix
/// and the idiosyncratic error variance estimate.
#[derive(Clone, Debug)]
pub struct FittedModel {
    pub coefficients: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub sigma2: f64,
}

/// Result of the Hausman specification test.
#[derive(Clone, Copy, Debug)]
pub struct HausmanResult {
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
}

fn total_observations(units: &[UnitBlock]) -> usize {
    units.iter().map(UnitBlock::len).sum()
}

/// Ordinary least squares via Cholesky on the normal equations.
/// Returns (coefficients, residual sum of squares, inverse of X'X).
fn solve_ols(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<(DVector<f64>, f64, DMatrix<f64>), EstimatorError> {
    let xtx = x.transpose() * x;
    let xty = x.transpose() * y;
    let chol = Cholesky::new(xtx).ok_or(EstimatorError::SingularDesign)?;
    let beta = chol.solve(&xty);
    let resid = y - x * &beta;
    let ssr = resid.dot(&resid);
    Ok((beta, ssr, chol.inverse()))
}

/// Fixed-effects (within) estimator: unit intercepts are removed by
/// demeaning outcome and covariates within each unit.
pub fn fit_fixed_effects(units: &[UnitBlock], k: usize) -> Result<FittedModel, EstimatorError> {
    let n_units = units.len();
    let n_obs = total_observations(units);
    // Within degrees of freedom: one mean per unit plus k slopes.
    if n_obs <= n_units + k {
        return Err(EstimatorError::InsufficientObservations {
            needed: n_units + k,
            available: n_obs,
        });
    }

    let mut x_data = Vec::with_capacity(n_obs * k);
    let mut y_data = Vec::with_capacity(n_obs);
    for block in units {
        let (y_mean, x_mean) = block.means(k);
        for (y, row) in block.outcomes.iter().zip(&block.covariates) {
            y_data.push(y - y_mean);
            for j in 0..k {
                x_data.push(row[j] - x_mean[j]);
            }
        }
    }

    let x = DMatrix::from_row_slice(n_obs, k, &x_data);
    let y = DVector::from_vec(y_data);
    let (beta, ssr, xtx_inv) = solve_ols(&x, &y)?;

    let sigma2 = ssr / (n_obs - n_units - k) as f64;
    let covariance = xtx_inv * sigma2;
    if !sigma2.is_finite() || beta.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFinite);
    }

    Ok(FittedModel {
        coefficients: beta,
        covariance,
        sigma2,
    })
}

/// Random-effects estimator, Swamy-Arora style: variance components from the
/// within and between regressions, then OLS on quasi-demeaned data. The
/// intercept is estimated internally; the returned model carries the k slope
/// coefficients and their covariance block, comparable with the within fit.
pub fn fit_random_effects(units: &[UnitBlock], k: usize) -> Result<FittedModel, EstimatorError> {
    let n_units = units.len();
    let n_obs = total_observations(units);
    let p = k + 1; // intercept + slopes

    let within = fit_fixed_effects(units, k)?;
    let sigma2_e = within.sigma2;

    // Between regression on unit means; needs more units than parameters.
    if n_units <= p {
        return Err(EstimatorError::InsufficientObservations {
            needed: p,
            available: n_units,
        });
    }
    let mut m_data = Vec::with_capacity(n_units * p);
    let mut ybar_data = Vec::with_capacity(n_units);
    for block in units {
        let (y_mean, x_mean) = block.means(k);
        m_data.push(1.0);
        m_data.extend_from_slice(&x_mean);
        ybar_data.push(y_mean);
    }
    let m = DMatrix::from_row_slice(n_units, p, &m_data);
    let ybar = DVector::from_vec(ybar_data);
    let (_, ssr_between, _) = solve_ols(&m, &ybar)?;
    let sigma2_between = ssr_between / (n_units - p) as f64;

    let t_bar = n_obs as f64 / n_units as f64;
    let sigma2_u = (sigma2_between - sigma2_e / t_bar).max(0.0);

    // GLS by per-unit quasi-demeaning with theta_i.
    let mut x_data = Vec::with_capacity(n_obs * p);
    let mut y_data = Vec::with_capacity(n_obs);
    for block in units {
        let t_i = block.len() as f64;
        let theta = 1.0 - (sigma2_e / (t_i * sigma2_u + sigma2_e)).sqrt();
        let (y_mean, x_mean) = block.means(k);
        for (y, row) in block.outcomes.iter().zip(&block.covariates) {
            y_data.push(y - theta * y_mean);
            x_data.push(1.0 - theta);
            for j in 0..k {
                x_data.push(row[j] - theta * x_mean[j]);
            }
        }
    }

    let x = DMatrix::from_row_slice(n_obs, p, &x_data);
    let y = DVector::from_vec(y_data);
    let (beta_full, ssr, xtx_inv) = solve_ols(&x, &y)?;

    let sigma2 = ssr / (n_obs - p) as f64;
    let cov_full = xtx_inv * sigma2;
    if !sigma2.is_finite() || beta_full.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFinite);
    }

    Ok(FittedModel {
        coefficients: beta_full.rows(1, k).into_owned(),
        covariance: cov_full.view((1, 1), (k, k)).into_owned(),
        sigma2,
    })
}

/// Hausman specification test: H = d' (V_fe - V_re)^-1 d over the k slopes,
/// chi-squared with k degrees of freedom under the null that random effects
/// are consistent. Fails when the covariance difference cannot be inverted
/// or the quadratic form is negative (non-PSD difference in finite samples).
pub fn hausman_test(fe: &FittedModel, re: &FittedModel) -> Result<HausmanResult, EstimatorError> {
    let df = fe.coefficients.len();
    let diff = &fe.coefficients - &re.coefficients;
    let v_diff = &fe.covariance - &re.covariance;

    let inv = v_diff
        .try_inverse()
        .ok_or(EstimatorError::SingularCovariance)?;
    let statistic = (diff.transpose() * inv * &diff)[(0, 0)];

    if !statistic.is_finite() {
        return Err(EstimatorError::NonFinite);
    }
    if statistic < 0.0 {
        return Err(EstimatorError::NegativeStatistic(statistic));
    }

    let chi = ChiSquared::new(df as f64).unwrap();
    let p_value = 1.0 - chi.cdf(statistic);

    Ok(HausmanResult {
        statistic,
        df,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{generate_panel, PanelData};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn blocks_from_panel(panel: &PanelData) -> Vec<UnitBlock> {
        (0..panel.n_units)
            .map(|u| {
                let rows = panel.unit_rows(u);
                UnitBlock {
                    unit: u as u32,
                    outcomes: rows.iter().map(|r| r.outcome.unwrap()).collect(),
                    covariates: rows
                        .iter()
                        .map(|r| r.covariates.iter().map(|c| c.unwrap()).collect())
                        .collect(),
                }
            })
            .collect()
    }

    #[test]
    fn test_within_estimator_recovers_unit_coefficients() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let panel = generate_panel(200, 8, 3, &mut rng);
        let blocks = blocks_from_panel(&panel);

        let fe = fit_fixed_effects(&blocks, 3).unwrap();
        for j in 0..3 {
            assert!(
                (fe.coefficients[j] - 1.0).abs() < 0.2,
                "beta[{}] = {:.3}",
                j,
                fe.coefficients[j]
            );
        }
        assert!(fe.sigma2 > 0.0);
    }

    #[test]
    fn test_random_effects_close_to_within_under_null() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let panel = generate_panel(200, 8, 2, &mut rng);
        let blocks = blocks_from_panel(&panel);

        let fe = fit_fixed_effects(&blocks, 2).unwrap();
        let re = fit_random_effects(&blocks, 2).unwrap();
        for j in 0..2 {
            assert!(
                (fe.coefficients[j] - re.coefficients[j]).abs() < 0.2,
                "fe {:.3} vs re {:.3}",
                fe.coefficients[j],
                re.coefficients[j]
            );
        }
    }

    #[test]
    fn test_hausman_p_value_in_unit_interval() {
        let mut accepted = 0;
        for seed in 30..40 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let panel = generate_panel(150, 6, 2, &mut rng);
            let blocks = blocks_from_panel(&panel);

            let fe = fit_fixed_effects(&blocks, 2).unwrap();
            let re = fit_random_effects(&blocks, 2).unwrap();
            if let Ok(result) = hausman_test(&fe, &re) {
                assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
                assert!(result.statistic >= 0.0);
                assert_eq!(result.df, 2);
                accepted += 1;
            }
        }
        // The difference matrix can fail to invert on unlucky draws, but not
        // on every seed.
        assert!(accepted > 0);
    }

    #[test]
    fn test_constant_covariate_has_no_within_variation() {
        // A covariate fixed within each unit is collinear with the unit
        // intercepts and must not produce a finite-looking fit.
        let blocks: Vec<UnitBlock> = (0..5)
            .map(|u| UnitBlock {
                unit: u,
                outcomes: (0..6).map(|i| (u as f64) + i as f64 * 0.5).collect(),
                covariates: (0..6).map(|i| vec![i as f64, 1.0]).collect(),
            })
            .collect();

        assert!(fit_fixed_effects(&blocks, 2).is_err());
    }

    #[test]
    fn test_insufficient_observations_rejected() {
        let blocks: Vec<UnitBlock> = (0..2)
            .map(|u| UnitBlock {
                unit: u,
                outcomes: vec![1.0, 2.0],
                covariates: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            })
            .collect();

        match fit_fixed_effects(&blocks, 2) {
            Err(EstimatorError::InsufficientObservations { .. }) => {}
            other => panic!("expected InsufficientObservations, got {:?}", other.map(|m| m.sigma2)),
        }
    }

    #[test]
    fn test_random_effects_needs_enough_units() {
        // 3 units cannot identify intercept + 3 slopes in the between step.
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let panel = generate_panel(3, 10, 3, &mut rng);
        let blocks = blocks_from_panel(&panel);

        assert!(fit_random_effects(&blocks, 3).is_err());
    }
}
