//! Cell-local satisfaction rule over the Moore neighborhood.

use crate::{GridState, GroupId, Result, SchellingError};
use schelling_index::{Cell, NeighborhoodIndex};
use serde::{Deserialize, Serialize};

/// Occupied neighbors of a cell split by whether they share its group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NeighborCounts {
    pub similar: u32,
    pub different: u32,
}

impl NeighborCounts {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.similar + self.different
    }

    /// `similar / total`, or `None` when no neighbor is occupied.
    #[must_use]
    pub fn similar_fraction(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(f64::from(self.similar) / f64::from(total)),
        }
    }

    /// Per-agent similarity; an agent with no occupied neighbors scores 1.0.
    #[must_use]
    pub fn similarity(&self) -> f64 {
        self.similar_fraction().unwrap_or(1.0)
    }

    /// An agent with no occupied neighbors is always satisfied.
    #[must_use]
    pub fn is_unsatisfied(&self, threshold: f64) -> bool {
        self.similar_fraction()
            .is_some_and(|fraction| fraction < threshold)
    }
}

/// Count occupied neighbors of `cell` relative to `group`.
///
/// Empty neighbors are skipped; the grid edge clips the neighborhood.
#[must_use]
pub fn neighbor_counts(grid: &GridState, cell: Cell, group: GroupId) -> NeighborCounts {
    let mut counts = NeighborCounts::default();
    grid.neighborhood().visit_neighbors(cell, &mut |neighbor| {
        match grid.group_at(neighbor) {
            Some(other) if other == group => counts.similar += 1,
            Some(_) => counts.different += 1,
            None => {}
        }
    });
    counts
}

/// Whether the agent living at `cell` wants to move under `threshold`.
pub fn is_unsatisfied(grid: &GridState, cell: Cell, threshold: f64) -> Result<bool> {
    let group = grid.group_at(cell).ok_or_else(|| {
        SchellingError::InvariantViolated(format!("satisfaction queried for vacant cell {cell}"))
    })?;
    Ok(neighbor_counts(grid, cell, group).is_unsatisfied(threshold))
}
