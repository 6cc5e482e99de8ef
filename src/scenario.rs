//! Scenario space for the missingness sweep.
//!
//! A scenario is one cell of the experiment design: panel shape x model
//! complexity x missingness mechanism x dropout rate. The full grid is
//! 3 x 4 x 4 x 4 = 192 combinations; combinations whose panel is too short
//! to identify the within transformation (T < k + 1) are infeasible and are
//! recorded with a reason instead of being run.

use serde::Serialize;

use crate::missing::MissingMechanism;

/// Target dropout fractions swept per mechanism.
pub const DROPOUT_RATES: [f64; 4] = [0.10, 0.20, 0.30, 0.40];

/// Panel dimensions, constant total size N x T = 1600 observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PanelShape {
    Wide,
    Square,
    Long,
}

impl PanelShape {
    pub fn all() -> Vec<Self> {
        vec![Self::Wide, Self::Square, Self::Long]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wide => "Wide Panel",
            Self::Square => "Square Panel",
            Self::Long => "Long Panel",
        }
    }

    /// Number of cross-sectional units N.
    pub fn units(&self) -> usize {
        match self {
            Self::Wide => 400,
            Self::Square => 200,
            Self::Long => 100,
        }
    }

    /// Number of time periods T.
    pub fn periods(&self) -> usize {
        match self {
            Self::Wide => 4,
            Self::Square => 8,
            Self::Long => 16,
        }
    }
}

/// Model complexity: how many covariates enter the outcome equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    HighDimensional,
}

impl Complexity {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Simple,
            Self::Moderate,
            Self::Complex,
            Self::HighDimensional,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Moderate => "Moderate",
            Self::Complex => "Complex",
            Self::HighDimensional => "High-Dimensional",
        }
    }

    /// Covariate count k.
    pub fn covariates(&self) -> usize {
        match self {
            Self::Simple => 1,
            Self::Moderate => 3,
            Self::Complex => 5,
            Self::HighDimensional => 10,
        }
    }
}

/// One cell of the experiment design. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Scenario {
    pub shape: PanelShape,
    pub complexity: Complexity,
    pub mechanism: MissingMechanism,
    pub dropout: f64,
}

impl Scenario {
    /// The within transformation needs at least k + 1 periods per unit.
    pub fn is_feasible(&self) -> bool {
        self.shape.periods() >= self.complexity.covariates() + 1
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {} / {} @ {:.0}%",
            self.shape.name(),
            self.complexity.name(),
            self.mechanism.name(),
            self.dropout * 100.0
        )
    }
}

/// A scenario excluded from the sweep before any trial runs.
#[derive(Clone, Debug, Serialize)]
pub struct ExcludedScenario {
    pub scenario: Scenario,
    pub reason: String,
}

/// Enumerate the full cross-product in a fixed order.
pub fn full_grid() -> Vec<Scenario> {
    let mut grid = Vec::new();
    for shape in PanelShape::all() {
        for complexity in Complexity::all() {
            for mechanism in MissingMechanism::all() {
                for &dropout in DROPOUT_RATES.iter() {
                    grid.push(Scenario {
                        shape,
                        complexity,
                        mechanism,
                        dropout,
                    });
                }
            }
        }
    }
    grid
}

/// Partition a grid into feasible scenarios and excluded ones with reasons.
pub fn partition_feasible(grid: Vec<Scenario>) -> (Vec<Scenario>, Vec<ExcludedScenario>) {
    let mut feasible = Vec::new();
    let mut excluded = Vec::new();
    for scenario in grid {
        if scenario.is_feasible() {
            feasible.push(scenario);
        } else {
            let reason = format!(
                "T = {} < k + 1 = {}: too few periods to identify {} covariates within units",
                scenario.shape.periods(),
                scenario.complexity.covariates() + 1,
                scenario.complexity.covariates()
            );
            excluded.push(ExcludedScenario { scenario, reason });
        }
    }
    (feasible, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_grid_size() {
        assert_eq!(full_grid().len(), 192);
    }

    #[test]
    fn test_partition_counts() {
        let (feasible, excluded) = partition_feasible(full_grid());
        assert_eq!(feasible.len(), 144);
        assert_eq!(excluded.len(), 48);
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let (feasible, excluded) = partition_feasible(full_grid());
        assert_eq!(feasible.len() + excluded.len(), 192);
        for s in &feasible {
            assert!(s.shape.periods() >= s.complexity.covariates() + 1);
        }
        for e in &excluded {
            assert!(e.scenario.shape.periods() < e.scenario.complexity.covariates() + 1);
            assert!(!e.reason.is_empty());
        }
    }

    #[test]
    fn test_reference_feasibility_cases() {
        let long_high = Scenario {
            shape: PanelShape::Long,
            complexity: Complexity::HighDimensional,
            mechanism: MissingMechanism::Random,
            dropout: 0.10,
        };
        assert!(long_high.is_feasible()); // 16 >= 11

        let wide_high = Scenario {
            shape: PanelShape::Wide,
            complexity: Complexity::HighDimensional,
            mechanism: MissingMechanism::Random,
            dropout: 0.10,
        };
        assert!(!wide_high.is_feasible()); // 4 < 11

        let (feasible, excluded) = partition_feasible(full_grid());
        assert!(!feasible.iter().any(|s| {
            s.shape == PanelShape::Wide && s.complexity == Complexity::HighDimensional
        }));
        assert_eq!(
            excluded
                .iter()
                .filter(|e| e.scenario.shape == PanelShape::Wide
                    && e.scenario.complexity == Complexity::HighDimensional)
                .count(),
            16
        );
    }

    #[test]
    fn test_shape_dimensions() {
        assert_eq!(PanelShape::Wide.units(), 400);
        assert_eq!(PanelShape::Wide.periods(), 4);
        assert_eq!(PanelShape::Long.units(), 100);
        assert_eq!(PanelShape::Long.periods(), 16);
        for shape in PanelShape::all() {
            assert_eq!(shape.units() * shape.periods(), 1600);
        }
    }
}
