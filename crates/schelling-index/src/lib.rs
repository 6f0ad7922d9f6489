//! Spatial indexing abstractions for grid neighborhood queries.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Maximum number of neighbors a cell can have in a Moore neighborhood.
pub const MOORE_NEIGHBORS: usize = 8;

/// Inline storage for the neighbors of a single cell.
pub type Neighbors = SmallVec<[Cell; MOORE_NEIGHBORS]>;

/// Errors emitted by grid index implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., zero width).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A cell lies outside the grid it was checked against.
    #[error("cell {cell} lies outside a {width}x{height} grid")]
    OutOfBounds { cell: Cell, width: u32, height: u32 },
}

/// Integer grid coordinate.
///
/// Ordering is x-major, matching [`GridBounds::cells`].
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for Cell {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// Fixed rectangular extent of a grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridBounds {
    width: u32,
    height: u32,
}

impl GridBounds {
    /// Construct bounds for a `width * height` grid.
    pub fn new(width: u32, height: u32) -> Result<Self, IndexError> {
        if width == 0 || height == 0 {
            return Err(IndexError::InvalidConfig("grid dimensions must be non-zero"));
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub const fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[must_use]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Flat x-major offset of `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn offset(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| (cell.x as usize) * (self.height as usize) + cell.y as usize)
    }

    /// Like [`GridBounds::offset`] but reports the failing cell.
    pub fn checked_offset(&self, cell: Cell) -> Result<usize, IndexError> {
        self.offset(cell).ok_or(IndexError::OutOfBounds {
            cell,
            width: self.width,
            height: self.height,
        })
    }

    /// Inverse of [`GridBounds::offset`].
    #[must_use]
    pub fn cell_at(&self, offset: usize) -> Option<Cell> {
        if offset >= self.area() {
            return None;
        }
        let height = self.height as usize;
        Some(Cell::new((offset / height) as u32, (offset % height) as u32))
    }

    /// Iterate every cell, x-major (all of column 0 first).
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width).flat_map(move |x| (0..self.height).map(move |y| Cell::new(x, y)))
    }
}

/// Common behaviour exposed by neighborhood indices.
pub trait NeighborhoodIndex {
    /// Visit every in-bounds neighbor of `cell`, excluding `cell` itself.
    fn visit_neighbors(&self, cell: Cell, visitor: &mut dyn FnMut(Cell));

    /// Collect the neighbors of `cell` into inline storage.
    fn neighbors(&self, cell: Cell) -> Neighbors {
        let mut out = Neighbors::new();
        self.visit_neighbors(cell, &mut |neighbor| out.push(neighbor));
        out
    }
}

/// The eight surrounding cells, clipped at the grid edges (no wraparound).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MooreNeighborhood {
    bounds: GridBounds,
}

impl MooreNeighborhood {
    #[must_use]
    pub const fn new(bounds: GridBounds) -> Self {
        Self { bounds }
    }

    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }
}

impl NeighborhoodIndex for MooreNeighborhood {
    fn visit_neighbors(&self, cell: Cell, visitor: &mut dyn FnMut(Cell)) {
        if !self.bounds.contains(cell) {
            return;
        }
        let x_lo = cell.x.saturating_sub(1);
        let y_lo = cell.y.saturating_sub(1);
        let x_hi = (cell.x + 1).min(self.bounds.width - 1);
        let y_hi = (cell.y + 1).min(self.bounds.height - 1);
        for x in x_lo..=x_hi {
            for y in y_lo..=y_hi {
                if x == cell.x && y == cell.y {
                    continue;
                }
                visitor(Cell::new(x, y));
            }
        }
    }
}

/// Set of grid cells with O(1) insert, membership, and removal-by-value.
///
/// Members live in a dense vector so a uniformly random member can be picked
/// by index; removal swaps the last member into the vacated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSet {
    bounds: GridBounds,
    members: Vec<Cell>,
    slots: Vec<Option<usize>>,
}

impl CellSet {
    /// Create an empty set over `bounds`.
    #[must_use]
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            members: Vec::new(),
            slots: vec![None; bounds.area()],
        }
    }

    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Membership test; out-of-bounds cells are never members.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.bounds
            .offset(cell)
            .is_some_and(|offset| self.slots[offset].is_some())
    }

    /// Insert `cell`, returning `false` if it was already present.
    pub fn insert(&mut self, cell: Cell) -> Result<bool, IndexError> {
        let offset = self.bounds.checked_offset(cell)?;
        if self.slots[offset].is_some() {
            return Ok(false);
        }
        self.slots[offset] = Some(self.members.len());
        self.members.push(cell);
        Ok(true)
    }

    /// Remove `cell`, returning `false` if it was not present.
    pub fn remove(&mut self, cell: Cell) -> Result<bool, IndexError> {
        let offset = self.bounds.checked_offset(cell)?;
        let Some(index) = self.slots[offset].take() else {
            return Ok(false);
        };
        self.members.swap_remove(index);
        if let Some(&moved) = self.members.get(index) {
            // Offsets of stored members are always in bounds.
            if let Some(moved_offset) = self.bounds.offset(moved) {
                self.slots[moved_offset] = Some(index);
            }
        }
        Ok(true)
    }

    /// Member stored at dense position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.members.get(index).copied()
    }

    /// Members in storage order (not sorted).
    #[must_use]
    pub fn as_slice(&self) -> &[Cell] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.members.iter().copied()
    }
}
