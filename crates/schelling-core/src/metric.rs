//! Aggregate similarity statistics over a grid.

use crate::{GridState, GroupId, Result, SchellingError, satisfaction::neighbor_counts};
use serde::{Deserialize, Serialize};

/// Mean per-agent similarity; agents without occupied neighbors count as 1.0.
pub fn mean_similarity(grid: &GridState) -> Result<f64> {
    let mut sum = 0.0;
    let mut agents = 0usize;
    for (cell, group) in grid.agents() {
        sum += neighbor_counts(grid, cell, group).similarity();
        agents += 1;
    }
    if agents == 0 {
        return Err(SchellingError::InvalidConfig(
            "similarity is undefined for a grid without agents",
        ));
    }
    Ok(sum / agents as f64)
}

/// Similarity breakdown for one group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GroupSimilarity {
    pub group: GroupId,
    pub agents: usize,
    /// `None` when the group has no agents.
    pub mean_similarity: Option<f64>,
}

/// Grid-wide similarity together with per-group means and the number of
/// agents that would move under `threshold`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityReport {
    pub mean_similarity: f64,
    pub agent_count: usize,
    pub threshold: f64,
    pub unsatisfied: usize,
    pub groups: Vec<GroupSimilarity>,
}

pub fn similarity_report(grid: &GridState, threshold: f64) -> Result<SimilarityReport> {
    let races = grid.races() as usize;
    let mut sums = vec![0.0f64; races];
    let mut counts = vec![0usize; races];
    let mut unsatisfied = 0usize;
    for (cell, group) in grid.agents() {
        let neighbors = neighbor_counts(grid, cell, group);
        let slot = group.index();
        if slot >= races {
            return Err(SchellingError::InvariantViolated(format!(
                "agent at {cell} carries out-of-range group {group}"
            )));
        }
        sums[slot] += neighbors.similarity();
        counts[slot] += 1;
        if neighbors.is_unsatisfied(threshold) {
            unsatisfied += 1;
        }
    }
    let agent_count: usize = counts.iter().sum();
    if agent_count == 0 {
        return Err(SchellingError::InvalidConfig(
            "similarity is undefined for a grid without agents",
        ));
    }
    let groups = sums
        .iter()
        .zip(&counts)
        .enumerate()
        .map(|(idx, (&sum, &agents))| GroupSimilarity {
            group: GroupId(idx as u16 + 1),
            agents,
            mean_similarity: (agents > 0).then(|| sum / agents as f64),
        })
        .collect();
    Ok(SimilarityReport {
        mean_similarity: sums.iter().sum::<f64>() / agent_count as f64,
        agent_count,
        threshold,
        unsatisfied,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cell;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn isolated_agents_score_one() {
        let grid = GridState::from_agents(
            3,
            3,
            2,
            [(Cell::new(0, 0), GroupId(1)), (Cell::new(2, 2), GroupId(2))],
        )
        .expect("grid");
        assert!(approx(mean_similarity(&grid).expect("similarity"), 1.0));
    }

    #[test]
    fn checkerboard_pair_scores_zero() {
        let grid = GridState::from_agents(
            2,
            1,
            2,
            [(Cell::new(0, 0), GroupId(1)), (Cell::new(1, 0), GroupId(2))],
        )
        .expect("grid");
        assert!(approx(mean_similarity(&grid).expect("similarity"), 0.0));
    }

    #[test]
    fn mixed_row_averages_per_agent_fractions() {
        // 1 1 2 on a single row: 1.0, 0.5, 0.0.
        let grid = GridState::from_agents(
            3,
            1,
            2,
            [
                (Cell::new(0, 0), GroupId(1)),
                (Cell::new(1, 0), GroupId(1)),
                (Cell::new(2, 0), GroupId(2)),
            ],
        )
        .expect("grid");
        assert!(approx(mean_similarity(&grid).expect("similarity"), 0.5));

        let report = similarity_report(&grid, 0.6).expect("report");
        assert_eq!(report.agent_count, 3);
        assert_eq!(report.unsatisfied, 2);
        assert!(approx(report.mean_similarity, 0.5));
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].agents, 2);
        assert!(approx(report.groups[0].mean_similarity.expect("group 1"), 0.75));
        assert!(approx(report.groups[1].mean_similarity.expect("group 2"), 0.0));
    }

    #[test]
    fn absent_group_has_no_mean() {
        let grid = GridState::from_agents(2, 2, 3, [(Cell::new(0, 0), GroupId(2))]).expect("grid");
        let report = similarity_report(&grid, 0.5).expect("report");
        assert_eq!(report.groups[0].mean_similarity, None);
        assert_eq!(report.groups[1].mean_similarity, Some(1.0));
        assert_eq!(report.groups[2].agents, 0);
    }

    #[test]
    fn empty_grid_is_rejected() {
        let grid = GridState::from_agents(2, 2, 2, std::iter::empty()).expect("grid");
        assert!(matches!(
            mean_similarity(&grid),
            Err(SchellingError::InvalidConfig(_))
        ));
        assert!(similarity_report(&grid, 0.5).is_err());
    }
}
