//! Board and tile storage.
//!
//! [`Grid`] is the live computation state: a row-major matrix with a
//! permanent 1-cell halo of zeros on all sides. [`Block`] is an ephemeral
//! rectangular tile cut from the padded grid for one round of computation;
//! blocks produced by decomposition carry their own halo drawn from
//! neighboring cells.

use crate::{Cell, Error, HALO, Result};
use core::ops::Range;

/// A 2-D board stored with a permanent 1-cell zero halo on all sides.
///
/// `rows` and `cols` are the *interior* (logical) dimensions; the backing
/// storage is `(rows + 2) x (cols + 2)`. All index-based accessors take
/// padded coordinates, so interior cell `(0, 0)` lives at `(1, 1)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an all-dead grid with the given interior dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; (rows + 2 * HALO) * (cols + 2 * HALO)],
        }
    }

    /// Builds a grid from row-major interior cell data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `cells.len() != rows * cols`.
    pub fn from_interior(rows: usize, cols: usize, cells: &[Cell]) -> Result<Self> {
        if cells.len() != rows * cols {
            return Err(Error::Config {
                reason: format!(
                    "interior data has {} cells, expected {}x{} = {}",
                    cells.len(),
                    rows,
                    cols,
                    rows * cols
                ),
            });
        }
        let mut grid = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                grid.set(r + HALO, c + HALO, cells[r * cols + c]);
            }
        }
        Ok(grid)
    }

    /// Interior row count.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Interior column count.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Row count of the padded storage.
    pub const fn padded_rows(&self) -> usize {
        self.rows + 2 * HALO
    }

    /// Column count of the padded storage.
    pub const fn padded_cols(&self) -> usize {
        self.cols + 2 * HALO
    }

    const fn idx(&self, row: usize, col: usize) -> usize {
        row * self.padded_cols() + col
    }

    /// Reads a cell at padded coordinates.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[self.idx(row, col)]
    }

    /// Writes a cell at padded coordinates.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        let idx = self.idx(row, col);
        self.cells[idx] = value;
    }

    /// Copies the interior (halo stripped) out as row-major cell data.
    pub fn interior(&self) -> Vec<Cell> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.push(self.get(r + HALO, c + HALO));
            }
        }
        out
    }

    /// Cuts a rectangular view (padded coordinates) out into an owned
    /// [`Block`]. Empty or inverted ranges produce an empty block.
    pub fn extract(&self, row_span: Range<usize>, col_span: Range<usize>) -> Block {
        let rows = row_span.end.saturating_sub(row_span.start);
        let cols = col_span.end.saturating_sub(col_span.start);
        let mut cells = Vec::with_capacity(rows * cols);
        for r in row_span.start..row_span.end {
            for c in col_span.start..col_span.end {
                cells.push(self.get(r, c));
            }
        }
        Block { rows, cols, cells }
    }
}

/// A rectangular tile of the grid, including its own 1-cell halo when
/// produced by decomposition. Created fresh each round and discarded after
/// reassembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Block {
    /// Creates an all-dead block.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    /// Builds a block from row-major cell data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if `cells.len() != rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != rows * cols {
            return Err(Error::Codec {
                context: format!(
                    "block data has {} cells, expected {}x{} = {}",
                    cells.len(),
                    rows,
                    cols,
                    rows * cols
                ),
            });
        }
        Ok(Self { rows, cols, cells })
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major cell data, including the halo ring.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        self.cells[row * self.cols + col] = value;
    }
}
