//! Mutable world state: which cells are empty and which group occupies the rest.

use crate::{GroupId, Result, SchellingConfig, SchellingError};
use rand::{Rng, seq::SliceRandom};
use schelling_index::{Cell, CellSet, GridBounds, MooreNeighborhood};

/// Grid dimensions, the empty-house set, and the occupied-cell map.
///
/// Every cell is either a member of [`GridState::empty_houses`] or holds
/// exactly one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    bounds: GridBounds,
    neighborhood: MooreNeighborhood,
    races: u16,
    agents: Vec<Option<GroupId>>,
    empty: CellSet,
    agent_count: usize,
}

impl GridState {
    /// Shuffle every cell, leave the first `floor(empty_ratio * area)` empty,
    /// and hand the remainder out to groups round-robin.
    pub fn populate<R: Rng + ?Sized>(config: &SchellingConfig, rng: &mut R) -> Result<Self> {
        let n_empty = config.validate()?;
        let mut grid = Self::vacant(config.width, config.height, config.races)?;

        let mut houses: Vec<Cell> = grid.bounds.cells().collect();
        houses.shuffle(rng);

        let (empties, occupied) = houses.split_at(n_empty);
        for &cell in empties {
            grid.empty.insert(cell)?;
        }
        for (i, &cell) in occupied.iter().enumerate() {
            let group = GroupId((i % config.races as usize) as u16 + 1);
            grid.place(cell, group)?;
        }
        Ok(grid)
    }

    /// Build a grid with the listed agents; every other cell is empty.
    pub fn from_agents<I>(width: u32, height: u32, races: u16, agents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Cell, GroupId)>,
    {
        if races == 0 {
            return Err(SchellingError::InvalidConfig("races must be at least 1"));
        }
        let mut grid = Self::vacant(width, height, races)?;
        for (cell, group) in agents {
            if group.0 == 0 || group.0 > races {
                return Err(SchellingError::InvalidConfig(
                    "group ids must lie in [1, races]",
                ));
            }
            if grid.group_at(cell).is_some() {
                return Err(SchellingError::InvalidConfig("cell listed more than once"));
            }
            grid.place(cell, group)?;
        }
        let unoccupied: Vec<Cell> = grid
            .bounds
            .cells()
            .filter(|&cell| grid.group_at(cell).is_none())
            .collect();
        for cell in unoccupied {
            grid.empty.insert(cell)?;
        }
        Ok(grid)
    }

    fn vacant(width: u32, height: u32, races: u16) -> Result<Self> {
        let bounds = GridBounds::new(width, height)?;
        Ok(Self {
            bounds,
            neighborhood: MooreNeighborhood::new(bounds),
            races,
            agents: vec![None; bounds.area()],
            empty: CellSet::new(bounds),
            agent_count: 0,
        })
    }

    fn place(&mut self, cell: Cell, group: GroupId) -> Result<()> {
        let offset = self.bounds.checked_offset(cell)?;
        self.agents[offset] = Some(group);
        self.agent_count += 1;
        Ok(())
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.bounds.width()
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bounds.height()
    }

    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }

    #[must_use]
    pub const fn neighborhood(&self) -> &MooreNeighborhood {
        &self.neighborhood
    }

    #[must_use]
    pub const fn races(&self) -> u16 {
        self.races
    }

    /// Group occupying `cell`, or `None` for empty or out-of-bounds cells.
    #[must_use]
    pub fn group_at(&self, cell: Cell) -> Option<GroupId> {
        self.bounds
            .offset(cell)
            .and_then(|offset| self.agents[offset])
    }

    #[must_use]
    pub fn is_empty_house(&self, cell: Cell) -> bool {
        self.empty.contains(cell)
    }

    #[must_use]
    pub fn empty_houses(&self) -> &CellSet {
        &self.empty
    }

    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    #[must_use]
    pub const fn agent_count(&self) -> usize {
        self.agent_count
    }

    /// Occupied cells and their groups, x-major.
    pub fn agents(&self) -> impl Iterator<Item = (Cell, GroupId)> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter_map(|(offset, group)| {
                let group = (*group)?;
                self.bounds.cell_at(offset).map(|cell| (cell, group))
            })
    }

    /// Point-in-time copy of the occupied-cell map.
    #[must_use]
    pub fn snapshot_agents(&self) -> Vec<(Cell, GroupId)> {
        self.agents().collect()
    }

    /// Number of agents per group; entry `i` counts group `i + 1`.
    #[must_use]
    pub fn group_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.races as usize];
        for (_, group) in self.agents() {
            if let Some(slot) = sizes.get_mut(group.index()) {
                *slot += 1;
            }
        }
        sizes
    }

    /// Move the agent at `from` into the empty house `to`.
    pub(crate) fn relocate(&mut self, from: Cell, to: Cell) -> Result<GroupId> {
        let from_offset = self.bounds.checked_offset(from)?;
        let to_offset = self.bounds.checked_offset(to)?;
        let Some(group) = self.agents[from_offset] else {
            return Err(SchellingError::InvariantViolated(format!(
                "relocation source {from} is not occupied"
            )));
        };
        if self.agents[to_offset].is_some() || !self.empty.remove(to)? {
            return Err(SchellingError::InvariantViolated(format!(
                "relocation target {to} is not an empty house"
            )));
        }
        self.agents[from_offset] = None;
        self.agents[to_offset] = Some(group);
        self.empty.insert(from)?;
        Ok(group)
    }

    /// Verify that every cell is accounted for exactly once, that group ids
    /// are in range, and optionally that the empty-house count is unchanged.
    pub fn check_invariants(&self, expected_empty: Option<usize>) -> Result<()> {
        let mut occupied = 0usize;
        for (offset, slot) in self.agents.iter().enumerate() {
            let cell = self.bounds.cell_at(offset).ok_or_else(|| {
                SchellingError::InvariantViolated(format!("offset {offset} outside grid"))
            })?;
            match (slot, self.empty.contains(cell)) {
                (Some(_), true) => {
                    return Err(SchellingError::InvariantViolated(format!(
                        "cell {cell} is both occupied and empty"
                    )));
                }
                (None, false) => {
                    return Err(SchellingError::InvariantViolated(format!(
                        "cell {cell} is neither occupied nor empty"
                    )));
                }
                (Some(group), false) => {
                    if group.0 == 0 || group.0 > self.races {
                        return Err(SchellingError::InvariantViolated(format!(
                            "cell {cell} holds out-of-range group {group}"
                        )));
                    }
                    occupied += 1;
                }
                (None, true) => {}
            }
        }
        if occupied != self.agent_count || occupied + self.empty.len() != self.bounds.area() {
            return Err(SchellingError::InvariantViolated(format!(
                "{occupied} agents and {} empties do not cover {} cells",
                self.empty.len(),
                self.bounds.area()
            )));
        }
        if let Some(expected) = expected_empty {
            if expected != self.empty.len() {
                return Err(SchellingError::InvariantViolated(format!(
                    "empty-house count changed from {expected} to {}",
                    self.empty.len()
                )));
            }
        }
        Ok(())
    }
}
