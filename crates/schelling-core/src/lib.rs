//! Core types and dynamics for Schelling's segregation model.
//!
//! A [`GridState`] is populated from a [`SchellingConfig`], driven toward a
//! fixed point by a [`Simulation`], and summarised with [`mean_similarity`].

use rand::{SeedableRng, rngs::SmallRng};
use schelling_index::IndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod grid;
pub mod metric;
pub mod satisfaction;
pub mod simulation;
pub mod sweep;

pub use grid::GridState;
pub use metric::{GroupSimilarity, SimilarityReport, mean_similarity, similarity_report};
pub use satisfaction::{NeighborCounts, is_unsatisfied, neighbor_counts};
pub use schelling_index::{Cell, CellSet, GridBounds, MooreNeighborhood, NeighborhoodIndex};
pub use simulation::{IterationObserver, IterationSummary, NullObserver, RunSummary, Simulation};
pub use sweep::{DEFAULT_SWEEP_THRESHOLDS, SweepPoint, SweepResult, threshold_sweep};

/// Convenience alias for results produced by this crate.
pub type Result<T, E = SchellingError> = std::result::Result<T, E>;

/// Errors raised while building or advancing a simulation.
#[derive(Debug, Error, PartialEq)]
pub enum SchellingError {
    /// Indicates an invalid configuration value or degenerate input.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Grid bookkeeping no longer accounts for every cell exactly once.
    #[error("internal invariant violated: {0}")]
    InvariantViolated(String),
}

impl From<IndexError> for SchellingError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidConfig(reason) => Self::InvalidConfig(reason),
            other @ IndexError::OutOfBounds { .. } => Self::InvariantViolated(other.to_string()),
        }
    }
}

/// Category label carried by every agent, in `1..=races`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct GroupId(pub u16);

impl GroupId {
    /// Zero-based position of the group, for indexing per-group tables.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order in which a relocation pass walks its snapshot of agents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SweepOrder {
    /// x-major cell order.
    #[default]
    RowMajor,
    /// Reshuffled with the simulation RNG at the start of every pass.
    Shuffled,
}

/// Static configuration for a Schelling run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchellingConfig {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Fraction of cells left empty, in `[0, 1)`.
    pub empty_ratio: f64,
    /// Minimum fraction of same-group occupied neighbors an agent tolerates.
    pub similarity_threshold: f64,
    /// Upper bound on relocation passes.
    pub n_iterations: u32,
    /// Number of distinct groups.
    pub races: u16,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Traversal order of each pass's agent snapshot.
    pub sweep_order: SweepOrder,
    /// Maximum number of iteration summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for SchellingConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            empty_ratio: 0.3,
            similarity_threshold: 0.3,
            n_iterations: 500,
            races: 2,
            rng_seed: None,
            sweep_order: SweepOrder::RowMajor,
            history_capacity: 512,
        }
    }
}

impl SchellingConfig {
    /// Validates every field, returning the number of empty houses to place.
    pub fn validate(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(SchellingError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if !(0.0..1.0).contains(&self.empty_ratio) {
            return Err(SchellingError::InvalidConfig(
                "empty_ratio must lie in [0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(SchellingError::InvalidConfig(
                "similarity_threshold must lie in [0, 1]",
            ));
        }
        if self.n_iterations == 0 {
            return Err(SchellingError::InvalidConfig(
                "n_iterations must be at least 1",
            ));
        }
        if self.races == 0 {
            return Err(SchellingError::InvalidConfig("races must be at least 1"));
        }
        if self.history_capacity == 0 {
            return Err(SchellingError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        let n_empty = self.empty_count();
        if n_empty >= self.area() {
            return Err(SchellingError::InvalidConfig(
                "configuration leaves no occupied cells",
            ));
        }
        Ok(n_empty)
    }

    /// Total number of cells.
    #[must_use]
    pub fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// `floor(empty_ratio * width * height)`.
    #[must_use]
    pub fn empty_count(&self) -> usize {
        (self.empty_ratio * self.area() as f64).floor() as usize
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_demo() {
        let config = SchellingConfig::default();
        assert_eq!((config.width, config.height), (50, 50));
        assert_eq!(config.races, 2);
        assert_eq!(config.n_iterations, 500);
        assert_eq!(config.validate(), Ok(750));
    }

    #[test]
    fn empty_count_truncates() {
        let config = SchellingConfig {
            width: 3,
            height: 3,
            empty_ratio: 0.33,
            ..SchellingConfig::default()
        };
        assert_eq!(config.empty_count(), 2);
        assert_eq!(config.validate(), Ok(2));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = SchellingConfig::default();
        let cases = [
            SchellingConfig {
                width: 0,
                ..base.clone()
            },
            SchellingConfig {
                height: 0,
                ..base.clone()
            },
            SchellingConfig {
                empty_ratio: 1.0,
                ..base.clone()
            },
            SchellingConfig {
                empty_ratio: -0.1,
                ..base.clone()
            },
            SchellingConfig {
                empty_ratio: f64::NAN,
                ..base.clone()
            },
            SchellingConfig {
                similarity_threshold: 1.5,
                ..base.clone()
            },
            SchellingConfig {
                n_iterations: 0,
                ..base.clone()
            },
            SchellingConfig {
                races: 0,
                ..base.clone()
            },
            SchellingConfig {
                history_capacity: 0,
                ..base.clone()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(SchellingError::InvalidConfig(_))),
                "expected rejection for {config:?}"
            );
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SchellingConfig =
            serde_json::from_str(r#"{"width": 12, "sweep_order": "shuffled", "rng_seed": 7}"#)
                .expect("config json");
        assert_eq!(config.width, 12);
        assert_eq!(config.height, 50);
        assert_eq!(config.sweep_order, SweepOrder::Shuffled);
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn index_errors_map_onto_taxonomy() {
        let config_err: SchellingError = IndexError::InvalidConfig("zero").into();
        assert_eq!(config_err, SchellingError::InvalidConfig("zero"));
        let bounds_err: SchellingError = IndexError::OutOfBounds {
            cell: Cell::new(9, 9),
            width: 2,
            height: 2,
        }
        .into();
        assert!(matches!(bounds_err, SchellingError::InvariantViolated(_)));
    }

    #[test]
    fn group_index_is_zero_based() {
        assert_eq!(GroupId(1).index(), 0);
        assert_eq!(GroupId(3).index(), 2);
        assert_eq!(GroupId(2).to_string(), "2");
    }
}
