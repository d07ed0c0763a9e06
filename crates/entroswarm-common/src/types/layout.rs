//! Grid layout of the population on screen

use serde::{Deserialize, Serialize};

/// Window position handed to an environment at configuration time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
}

impl Placement {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A `columns × rows` grid of agents spaced evenly on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub spacing_x: u32,
    pub spacing_y: u32,
}

impl GridLayout {
    pub fn new(columns: usize, rows: usize, spacing_x: u32, spacing_y: u32) -> Self {
        Self {
            columns,
            rows,
            spacing_x,
            spacing_y,
        }
    }

    /// As many cells as fit on a screen of the given size (at least one per axis)
    pub fn fit_screen(screen_width: u32, screen_height: u32, spacing_x: u32, spacing_y: u32) -> Self {
        let fit = |screen: u32, spacing: u32| {
            if spacing == 0 {
                1
            } else {
                ((screen / spacing) as usize).max(1)
            }
        };
        Self::new(
            fit(screen_width, spacing_x),
            fit(screen_height, spacing_y),
            spacing_x,
            spacing_y,
        )
    }

    /// Total number of cells
    pub fn size(&self) -> usize {
        self.columns * self.rows
    }

    /// Placement of the cell at column `i`, row `j`
    pub fn placement(&self, column: usize, row: usize) -> Placement {
        Placement::new(column as u32 * self.spacing_x, row as u32 * self.spacing_y)
    }

    /// Cells in population order: column-major, matching agent indices
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.columns).flat_map(move |i| (0..self.rows).map(move |j| (i, j)))
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::fit_screen(500, 500, 245, 215)
    }
}
