//! Search policies and algorithm selectors shared across crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the path finder chooses an interface on each hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfacePolicy {
    /// First interface, in enumeration order, with enough residual rate.
    #[default]
    FirstFit,
    /// Interface with the largest residual rate (load balancing).
    MaxResidual,
}

/// Whether the solution builder re-checks an assignment before finalizing it.
///
/// Heuristics whose construction already enforces every capacity may skip the
/// check; solver results are always verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    #[default]
    Check,
    Trust,
}

/// Two-way cut procedure used to build partition trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutterKind {
    /// Randomized weighted edge contraction (Karger).
    MinCut,
    /// Balanced Kernighan–Lin bisection.
    #[default]
    Bisection,
}

/// How partition-based strategies pick the `n` target machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineSelection {
    /// The `n` largest compute nodes by `cores * 1000 + memory`.
    #[default]
    Largest,
    /// `n` compute nodes sampled uniformly with the strategy seed.
    Sampled,
}

/// Objective handed to the solver collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IlpObjective {
    None,
    #[default]
    MinMachines,
    MinBandwidth,
}

/// Virtual network embedding strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedAlgorithm {
    #[default]
    Greedy,
    KBalanced,
    Partition,
    Random,
    TwoPhase,
    Ilp,
}

/// Cloud instance packing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackAlgorithm {
    #[default]
    BestFitDotProduct,
    FirstFitDecreasingPriority,
    FirstFitOrderedDeviation,
    Greedy,
    Ilp,
}

macro_rules! named_enum {
    ($ty:ty, $($variant:path => $name:literal),+ $(,)?) => {
        impl $ty {
            /// Configuration name of the variant.
            pub fn name(self) -> &'static str {
                match self {
                    $($variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().replace('-', "_").as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown {} '{other}' (expected one of: {})",
                        stringify!($ty),
                        [$($name),+].join(", "),
                    )),
                }
            }
        }
    };
}

named_enum!(InterfacePolicy,
    InterfacePolicy::FirstFit => "first_fit",
    InterfacePolicy::MaxResidual => "max_residual",
);

named_enum!(CutterKind,
    CutterKind::MinCut => "min_cut",
    CutterKind::Bisection => "bisection",
);

named_enum!(MachineSelection,
    MachineSelection::Largest => "largest",
    MachineSelection::Sampled => "sampled",
);

named_enum!(IlpObjective,
    IlpObjective::None => "none",
    IlpObjective::MinMachines => "min_machines",
    IlpObjective::MinBandwidth => "min_bandwidth",
);

named_enum!(EmbedAlgorithm,
    EmbedAlgorithm::Greedy => "greedy",
    EmbedAlgorithm::KBalanced => "k_balanced",
    EmbedAlgorithm::Partition => "partition",
    EmbedAlgorithm::Random => "random",
    EmbedAlgorithm::TwoPhase => "two_phase",
    EmbedAlgorithm::Ilp => "ilp",
);

named_enum!(PackAlgorithm,
    PackAlgorithm::BestFitDotProduct => "best_fit_dot_product",
    PackAlgorithm::FirstFitDecreasingPriority => "first_fit_decreasing_priority",
    PackAlgorithm::FirstFitOrderedDeviation => "first_fit_ordered_deviation",
    PackAlgorithm::Greedy => "greedy",
    PackAlgorithm::Ilp => "ilp",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dashed_and_mixed_case_names() {
        assert_eq!("K-Balanced".parse::<EmbedAlgorithm>(), Ok(EmbedAlgorithm::KBalanced));
        assert_eq!("max-residual".parse::<InterfacePolicy>(), Ok(InterfacePolicy::MaxResidual));
    }

    #[test]
    fn unknown_name_lists_choices() {
        let err = "quantum".parse::<PackAlgorithm>().unwrap_err();
        assert!(err.contains("quantum"));
        assert!(err.contains("best_fit_dot_product"));
    }

    #[test]
    fn display_uses_config_names() {
        assert_eq!(EmbedAlgorithm::TwoPhase.to_string(), "two_phase");
        assert_eq!(CutterKind::MinCut.to_string(), "min_cut");
    }

    #[test]
    fn defaults_follow_documented_choices() {
        assert_eq!(InterfacePolicy::default(), InterfacePolicy::FirstFit);
        assert_eq!(Verification::default(), Verification::Check);
        assert_eq!(CutterKind::default(), CutterKind::Bisection);
    }
}
