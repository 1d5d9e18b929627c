//! 2D toroidal occupancy grid.

use serde::{Deserialize, Serialize};
use warren_core::{Error, Position, Result};

/// A 2D toroidal grid holding at most one occupant per cell.
///
/// Every lookup wraps its coordinates, so `(-1, 0)` addresses the rightmost
/// cell of the top row. Writes overwrite unconditionally; collision checks
/// belong to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToroidalGrid<T> {
    width: i32,
    height: i32,
    cells: Vec<Option<T>>,
}

impl<T> ToroidalGrid<T> {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidGrid { width, height });
        }

        let size = width as usize * height as usize;
        let mut cells = Vec::with_capacity(size);
        cells.resize_with(size, || None);

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Wrap raw coordinates onto the torus
    pub fn normalize(&self, x: i32, y: i32) -> Position {
        Position::new(x, y).wrap(self.width, self.height)
    }

    /// Get occupant at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> Option<&T> {
        let index = self.pos_to_index(pos);
        self.cells[index].as_ref()
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Set or clear the cell at position, returning whatever was there
    pub fn set(&mut self, pos: Position, occupant: Option<T>) -> Option<T> {
        let index = self.pos_to_index(pos);
        std::mem::replace(&mut self.cells[index], occupant)
    }

    /// Clear the cell at position, returning whatever was there
    pub fn take(&mut self, pos: Position) -> Option<T> {
        let index = self.pos_to_index(pos);
        self.cells[index].take()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped.y * self.width + wrapped.x) as usize
    }

    /// Get position from row-major index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over occupied cells with their positions
    pub fn occupied(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, cell)| cell.as_ref().map(|occupant| (self.index_to_pos(i), occupant)))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}
