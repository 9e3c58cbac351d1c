//! Halo-correct domain decomposition.
//!
//! Splits a padded [`Grid`] into a row-major arrangement of overlapping
//! [`Block`]s sized to the fleet's total thread capacity, and writes kernel
//! outputs back, discarding each block's own halo.
//!
//! Tiles overlap by construction: each block's span includes a 1-cell halo
//! on every side, clipped to the padded grid's bounds. The interior spans
//! written back during reassembly partition the grid interior exactly, so a
//! decompose/reassemble round trip with an identity kernel reproduces the
//! grid cell for cell.

use crate::{Error, HALO, Result};
use crate::grid::{Block, Grid};
use core::ops::Range;

/// A 2-D tiling factorization of the fleet's slot count.
///
/// `row_splits * col_splits` always equals the slot count it was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tiling {
    pub row_splits: usize,
    pub col_splits: usize,
}

impl Tiling {
    /// Computes the balanced factor pair for `slots` worker slots.
    ///
    /// The two factors are the middle divisors of `slots`, as close to equal
    /// as possible. On ties the larger factor goes to the rows: row-major
    /// storage makes row-direction splits cheaper on the cache. `slots == 0`
    /// is treated as a single slot.
    pub fn for_slots(slots: usize) -> Self {
        let slots = slots.max(1);
        let mut factors = Vec::new();
        for i in 1..=slots {
            if slots % i == 0 {
                factors.push(i);
            }
        }
        let (row_splits, col_splits) = if factors.len() % 2 == 0 {
            (factors[factors.len() / 2], factors[factors.len() / 2 - 1])
        } else {
            let midpoint = (factors.len() - 1) / 2;
            (factors[midpoint], factors[midpoint])
        };
        Self {
            row_splits,
            col_splits,
        }
    }

    /// Total number of tiles this factorization produces per round.
    pub const fn tiles(&self) -> usize {
        self.row_splits * self.col_splits
    }
}

/// The padded span of tile `offset` along one dimension: the tile itself
/// plus a 1-cell halo on both sides, clipped to the padded grid's bounds.
///
/// This is the view extracted from the padded grid and sent to a worker.
pub fn padded_span(dim: usize, block: usize, offset: usize) -> Range<usize> {
    offset * block..(dim + 2 * HALO).min((offset + 1) * block + 2 * HALO)
}

/// The interior span of tile `offset` along one dimension: the range written
/// back into the grid after the block's own halo is discarded.
pub fn interior_span(dim: usize, block: usize, offset: usize) -> Range<usize> {
    offset * block + HALO..(dim + HALO).min((offset + 1) * block + HALO)
}

/// Per-dimension tile size: `ceil(dim / splits)`. The final tile in each
/// dimension may be smaller; spans are clipped, never padded with synthetic
/// cells.
const fn tile_size(dim: usize, splits: usize) -> usize {
    dim.div_ceil(splits)
}

fn clamp(span: Range<usize>) -> Range<usize> {
    span.start.min(span.end)..span.end
}

/// Splits the padded grid into `tiling.tiles()` overlapping blocks in
/// row-major order (outer loop over row tiles, inner loop over column
/// tiles).
pub fn decompose(grid: &Grid, tiling: Tiling) -> Vec<Block> {
    let block_r = tile_size(grid.rows(), tiling.row_splits);
    let block_c = tile_size(grid.cols(), tiling.col_splits);

    let mut blocks = Vec::with_capacity(tiling.tiles());
    for i in 0..tiling.row_splits {
        for j in 0..tiling.col_splits {
            let rows = clamp(padded_span(grid.rows(), block_r, i));
            let cols = clamp(padded_span(grid.cols(), block_c, j));
            blocks.push(grid.extract(rows, cols));
        }
    }
    blocks
}

/// Writes each result block's interior back into the grid at its tile
/// position, in the same row-major order used by [`decompose`].
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the result count does not match the tiling
/// or a block's shape does not match its destination span. Either means the
/// reply stream no longer mirrors the request stream, which is a bug, not a
/// recoverable condition.
pub fn reassemble(grid: &mut Grid, results: &[Block], tiling: Tiling) -> Result<()> {
    if results.len() != tiling.tiles() {
        return Err(Error::Protocol {
            context: format!(
                "reassembling {} result blocks into a {}x{} tiling ({} tiles)",
                results.len(),
                tiling.row_splits,
                tiling.col_splits,
                tiling.tiles()
            ),
        });
    }

    let block_r = tile_size(grid.rows(), tiling.row_splits);
    let block_c = tile_size(grid.cols(), tiling.col_splits);

    let mut counter = 0;
    for i in 0..tiling.row_splits {
        for j in 0..tiling.col_splits {
            let dst_r = clamp(interior_span(grid.rows(), block_r, i));
            let dst_c = clamp(interior_span(grid.cols(), block_c, j));
            let block = &results[counter];
            counter += 1;

            let dr = dst_r.end - dst_r.start;
            let dc = dst_c.end - dst_c.start;
            if dr == 0 || dc == 0 {
                continue;
            }
            // A result block is its input's shape: interior plus halo.
            if block.rows() != dr + 2 * HALO || block.cols() != dc + 2 * HALO {
                return Err(Error::Protocol {
                    context: format!(
                        "tile ({i},{j}) reply is {}x{}, expected {}x{}",
                        block.rows(),
                        block.cols(),
                        dr + 2 * HALO,
                        dc + 2 * HALO
                    ),
                });
            }

            for ri in 0..dr {
                for ci in 0..dc {
                    grid.set(
                        dst_r.start + ri,
                        dst_c.start + ci,
                        block.get(ri + HALO, ci + HALO),
                    );
                }
            }
        }
    }
    Ok(())
}
