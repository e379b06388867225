use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A square binary grid shown for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub side: usize,
    pub cells: Vec<u8>,
    pub zero_count: u32,
}

impl Grid {
    pub fn from_cells(side: usize, cells: Vec<u8>) -> Self {
        let zero_count = cells.iter().filter(|&&c| c == 0).count() as u32;
        Self {
            side,
            cells,
            zero_count,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.side.max(1))
    }
}

/// Produces the next grid to present.
pub trait GridSource: Send {
    fn generate(&mut self, side: usize) -> Grid;
}

/// Each cell is 0 or 1 with equal probability.
#[derive(Debug, Default)]
pub struct RandomGrid;

impl GridSource for RandomGrid {
    fn generate(&mut self, side: usize) -> Grid {
        let mut rng = rand::thread_rng();
        let cells = (0..side * side)
            .map(|_| if rng.gen_bool(0.5) { 1 } else { 0 })
            .collect();
        Grid::from_cells(side, cells)
    }
}

/// Replays a scripted list of zero counts, then repeats the last one.
/// Cells are laid out zeros-first so the count is visible when printed.
#[derive(Debug, Clone)]
pub struct ScriptedGrid {
    zero_counts: VecDeque<u32>,
    last: u32,
}

impl ScriptedGrid {
    pub fn new(zero_counts: impl IntoIterator<Item = u32>) -> Self {
        Self {
            zero_counts: zero_counts.into_iter().collect(),
            last: 0,
        }
    }
}

impl GridSource for ScriptedGrid {
    fn generate(&mut self, side: usize) -> Grid {
        let total = side * side;
        let zeros = self
            .zero_counts
            .pop_front()
            .unwrap_or(self.last)
            .min(total as u32);
        self.last = zeros;
        let cells = (0..total)
            .map(|i| if i < zeros as usize { 0 } else { 1 })
            .collect();
        Grid::from_cells(side, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_grid_counts_its_zeros() {
        let grid = RandomGrid.generate(8);
        assert_eq!(grid.cells.len(), 64);
        assert!(grid.cells.iter().all(|&c| c <= 1));
        let zeros = grid.cells.iter().filter(|&&c| c == 0).count() as u32;
        assert_eq!(grid.zero_count, zeros);
        assert_eq!(grid.rows().count(), 8);
    }

    #[test]
    fn scripted_grid_repeats_last_count() {
        let mut source = ScriptedGrid::new([5, 3]);
        assert_eq!(source.generate(8).zero_count, 5);
        assert_eq!(source.generate(8).zero_count, 3);
        assert_eq!(source.generate(8).zero_count, 3);
    }

    #[test]
    fn scripted_grid_clamps_to_cell_count() {
        let mut source = ScriptedGrid::new([100]);
        assert_eq!(source.generate(2).zero_count, 4);
    }
}
