//! Flat results collection and per-mechanism summaries.
//!
//! The aggregator is deliberately passive: it concatenates trial records,
//! each already tagged with its scenario parameters, alongside the table of
//! scenarios excluded before any trial ran. Downstream statistical
//! reporting (failure-rate tables, ANOVA, plots, CSV export) consumes these
//! two tables; the only in-crate consumer is the text summary printed by
//! the sweep binary.

use serde::Serialize;

use crate::missing::MissingMechanism;
use crate::scenario::ExcludedScenario;
use crate::trial::TrialRecord;

/// Everything the sweep hands to reporting: one record per executed trial
/// plus the infeasible-scenario table.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResultsTable {
    pub records: Vec<TrialRecord>,
    pub excluded: Vec<ExcludedScenario>,
}

impl ResultsTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, records: Vec<TrialRecord>) {
        self.records.extend(records);
    }

    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Per-mechanism rollup across every scenario and replication.
    pub fn summarize_by_mechanism(&self) -> Vec<MechanismSummary> {
        MissingMechanism::all()
            .into_iter()
            .map(|mechanism| {
                let records: Vec<&TrialRecord> = self
                    .records
                    .iter()
                    .filter(|r| r.scenario.mechanism == mechanism)
                    .collect();
                MechanismSummary::from_records(mechanism, &records)
            })
            .collect()
    }
}

/// Aggregate view of one mechanism's trials.
#[derive(Clone, Debug, Serialize)]
pub struct MechanismSummary {
    pub mechanism: MissingMechanism,
    pub trials: usize,
    pub successes: usize,
    pub data_failures: usize,
    pub model_failures: usize,
    pub hausman_failures: usize,
    pub system_errors: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    /// Mean p-value over successful trials.
    pub mean_p_value: f64,
    /// Share of successful trials that retain the null at the threshold.
    pub specificity: f64,
}

impl MechanismSummary {
    fn from_records(mechanism: MissingMechanism, records: &[&TrialRecord]) -> Self {
        use crate::trial::TrialOutcome;

        let trials = records.len();
        let mut successes = 0;
        let mut data_failures = 0;
        let mut model_failures = 0;
        let mut hausman_failures = 0;
        let mut system_errors = 0;
        let mut p_sum = 0.0;
        let mut retained = 0usize;

        for record in records {
            match record.outcome {
                TrialOutcome::Success { p_value } => {
                    successes += 1;
                    p_sum += p_value;
                    if record.specificity() == Some(1) {
                        retained += 1;
                    }
                }
                TrialOutcome::DataFailure => data_failures += 1,
                TrialOutcome::ModelFailureFe | TrialOutcome::ModelFailureRe => model_failures += 1,
                TrialOutcome::HausmanFailure => hausman_failures += 1,
                TrialOutcome::SystemError => system_errors += 1,
            }
        }

        let (success_rate, failure_rate) = if trials > 0 {
            let success_rate = successes as f64 / trials as f64;
            (success_rate, 1.0 - success_rate)
        } else {
            (0.0, 0.0)
        };

        MechanismSummary {
            mechanism,
            trials,
            successes,
            data_failures,
            model_failures,
            hausman_failures,
            system_errors,
            success_rate,
            failure_rate,
            mean_p_value: if successes > 0 { p_sum / successes as f64 } else { 0.0 },
            specificity: if successes > 0 {
                retained as f64 / successes as f64
            } else {
                0.0
            },
        }
    }

    pub fn print(&self) {
        println!("  Trials:            {}", self.trials);
        println!("  Successes:         {}", self.successes);
        println!("  Data failures:     {}", self.data_failures);
        println!("  Model failures:    {}", self.model_failures);
        println!("  Hausman failures:  {}", self.hausman_failures);
        println!("  System errors:     {}", self.system_errors);
        println!("  Success rate:      {:.1}%", self.success_rate * 100.0);
        println!("  Failure rate:      {:.1}%", self.failure_rate * 100.0);
        println!("  Mean p-value:      {:.3}", self.mean_p_value);
        println!("  Specificity:       {:.1}%", self.specificity * 100.0);
    }
}
