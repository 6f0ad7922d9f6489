//! Relocation dynamics: repeated passes over a snapshot of agents that act on
//! the live grid.

use crate::{
    GridState, Result, SchellingConfig, SchellingError, SweepOrder, mean_similarity,
    satisfaction::neighbor_counts,
};
use rand::{Rng, rngs::SmallRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Outcome of a single relocation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IterationSummary {
    /// One-based pass number.
    pub iteration: u32,
    pub relocations: usize,
    pub agent_count: usize,
    pub empty_count: usize,
    /// Unsatisfied agents that stayed put because no house was empty.
    pub stranded: usize,
}

impl IterationSummary {
    /// A pass that moved nobody leaves the grid at a fixed point.
    #[must_use]
    pub const fn is_fixed_point(&self) -> bool {
        self.relocations == 0
    }
}

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Passes executed over the simulation's lifetime.
    pub iterations: u32,
    pub total_relocations: u64,
    /// Whether the last pass moved nobody.
    pub converged: bool,
    /// Unsatisfied agents left without an empty house in the last pass. A
    /// converged run with stranded agents is blocked, not settled.
    pub stranded: usize,
    pub mean_similarity: f64,
}

/// Hook invoked after every relocation pass.
pub trait IterationObserver: Send {
    fn on_iteration(&mut self, summary: &IterationSummary);
}

/// No-op observer.
#[derive(Debug, Default)]
pub struct NullObserver;

impl IterationObserver for NullObserver {
    fn on_iteration(&mut self, _summary: &IterationSummary) {}
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationSummary) + Send,
{
    fn on_iteration(&mut self, summary: &IterationSummary) {
        self(summary);
    }
}

/// Owns a grid, its RNG, and the pass counter.
pub struct Simulation {
    config: SchellingConfig,
    rng: SmallRng,
    grid: GridState,
    initial_empty: usize,
    iteration: u32,
    total_relocations: u64,
    converged: bool,
    stranded: usize,
    history: VecDeque<IterationSummary>,
    observer: Box<dyn IterationObserver>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("iteration", &self.iteration)
            .field("converged", &self.converged)
            .field("agent_count", &self.grid.agent_count())
            .field("empty_count", &self.grid.empty_count())
            .finish()
    }
}

impl Simulation {
    /// Populate a fresh grid from `config`.
    pub fn new(config: SchellingConfig) -> Result<Self> {
        Self::with_observer(config, Box::new(NullObserver))
    }

    /// Populate a fresh grid from `config` and report passes to `observer`.
    pub fn with_observer(
        config: SchellingConfig,
        observer: Box<dyn IterationObserver>,
    ) -> Result<Self> {
        let mut rng = config.seeded_rng();
        let grid = GridState::populate(&config, &mut rng)?;
        Ok(Self::assemble(config, rng, grid, observer))
    }

    /// Drive an existing grid; only the dynamics fields of `config` are used.
    pub fn from_grid(config: SchellingConfig, grid: GridState) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.similarity_threshold) {
            return Err(SchellingError::InvalidConfig(
                "similarity_threshold must lie in [0, 1]",
            ));
        }
        if config.n_iterations == 0 || config.history_capacity == 0 {
            return Err(SchellingError::InvalidConfig(
                "n_iterations and history_capacity must be non-zero",
            ));
        }
        if grid.agent_count() == 0 {
            return Err(SchellingError::InvalidConfig(
                "grid must hold at least one agent",
            ));
        }
        grid.check_invariants(None)?;
        let rng = config.seeded_rng();
        Ok(Self::assemble(config, rng, grid, Box::new(NullObserver)))
    }

    fn assemble(
        config: SchellingConfig,
        rng: SmallRng,
        grid: GridState,
        observer: Box<dyn IterationObserver>,
    ) -> Self {
        let history = VecDeque::with_capacity(config.history_capacity.min(1024));
        Self {
            initial_empty: grid.empty_count(),
            config,
            rng,
            grid,
            iteration: 0,
            total_relocations: 0,
            converged: false,
            stranded: 0,
            history,
            observer,
        }
    }

    /// Execute one relocation pass.
    ///
    /// Agents are visited from a snapshot taken at pass start, but satisfaction
    /// and destination choice see the live grid, so a house vacated earlier in
    /// the pass can be refilled later in the same pass.
    pub fn step(&mut self) -> Result<IterationSummary> {
        let threshold = self.config.similarity_threshold;
        let mut snapshot = self.grid.snapshot_agents();
        if self.config.sweep_order == SweepOrder::Shuffled {
            snapshot.shuffle(&mut self.rng);
        }

        let mut relocations = 0usize;
        let mut stranded = 0usize;
        for (cell, group) in snapshot {
            if self.grid.group_at(cell) != Some(group) {
                return Err(SchellingError::InvariantViolated(format!(
                    "snapshot agent {group} at {cell} is missing from the live grid"
                )));
            }
            if !neighbor_counts(&self.grid, cell, group).is_unsatisfied(threshold) {
                continue;
            }
            let empties = self.grid.empty_houses();
            if empties.is_empty() {
                stranded += 1;
                continue;
            }
            let pick = self.rng.gen_range(0..empties.len());
            let Some(destination) = empties.get(pick) else {
                return Err(SchellingError::InvariantViolated(format!(
                    "empty-house index {pick} out of range"
                )));
            };
            self.grid.relocate(cell, destination)?;
            trace!(%group, from = %cell, to = %destination, "agent relocated");
            relocations += 1;
        }

        self.iteration += 1;
        self.total_relocations += relocations as u64;
        self.converged = relocations == 0;
        self.stranded = stranded;
        if stranded > 0 {
            warn!(
                iteration = self.iteration,
                stranded, "unsatisfied agents have no empty house to move to"
            );
        }

        if cfg!(debug_assertions) {
            self.grid.check_invariants(Some(self.initial_empty))?;
        }

        let summary = IterationSummary {
            iteration: self.iteration,
            relocations,
            agent_count: self.grid.agent_count(),
            empty_count: self.grid.empty_count(),
            stranded,
        };
        debug!(
            iteration = summary.iteration,
            relocations = summary.relocations,
            "relocation pass complete"
        );
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
        self.observer.on_iteration(&summary);
        Ok(summary)
    }

    /// Step until a pass moves nobody or `n_iterations` passes have run.
    pub fn run(&mut self) -> Result<RunSummary> {
        while !self.converged && self.iteration < self.config.n_iterations {
            self.step()?;
        }
        let summary = RunSummary {
            iterations: self.iteration,
            total_relocations: self.total_relocations,
            converged: self.converged,
            stranded: self.stranded,
            mean_similarity: mean_similarity(&self.grid)?,
        };
        info!(
            iterations = summary.iterations,
            relocations = summary.total_relocations,
            converged = summary.converged,
            stranded = summary.stranded,
            similarity = summary.mean_similarity,
            threshold = self.config.similarity_threshold,
            "simulation finished"
        );
        Ok(summary)
    }

    #[must_use]
    pub fn config(&self) -> &SchellingConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    /// Consume the simulation, keeping the grid for rendering.
    #[must_use]
    pub fn into_grid(self) -> GridState {
        self.grid
    }

    /// Passes executed so far.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    #[must_use]
    pub const fn is_converged(&self) -> bool {
        self.converged
    }

    /// Unsatisfied agents that found no empty house in the latest pass.
    #[must_use]
    pub const fn stranded(&self) -> usize {
        self.stranded
    }

    #[must_use]
    pub const fn total_relocations(&self) -> u64 {
        self.total_relocations
    }

    /// Iterate over retained pass summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &IterationSummary> {
        self.history.iter()
    }

    /// Replace the observer.
    pub fn set_observer(&mut self, observer: Box<dyn IterationObserver>) {
        self.observer = observer;
    }
}
