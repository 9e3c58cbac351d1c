//! The pluggable stencil update rule.
//!
//! A [`Kernel`] maps one padded block to one result block of the same shape.
//! It is pure and stateless: workers apply it to every block of a request in
//! parallel, and only the interior of the output is ever written back into
//! the grid. The crate ships [`LifeRule`], the Game-of-Life update, as the
//! default kernel.

use crate::HALO;
use crate::grid::Block;

/// A stencil update applied to one padded block.
///
/// Implementations must be pure: no state may leak between blocks or rounds,
/// because blocks are computed in parallel and in no particular order. The
/// output must have the same shape as the input; cells outside the interior
/// are ignored by reassembly.
pub trait Kernel: Send + Sync {
    fn apply(&self, block: &Block) -> Block;
}

/// Conway's Game of Life over an 8-cell neighborhood.
///
/// A live cell survives with 2 or 3 live neighbors; a dead cell becomes
/// alive with exactly 3. Cells are `0` (dead) or `1` (alive); any non-zero
/// input is treated as alive by the neighbor sum.
#[derive(Clone, Copy, Debug, Default)]
pub struct LifeRule;

impl Kernel for LifeRule {
    fn apply(&self, block: &Block) -> Block {
        let rows = block.rows();
        let cols = block.cols();
        let mut out = Block::new(rows, cols);
        if rows < 2 * HALO + 1 || cols < 2 * HALO + 1 {
            // No interior to update.
            return out;
        }

        for row in HALO..rows - HALO {
            for col in HALO..cols - HALO {
                let neighbors = u16::from(block.get(row - 1, col - 1))
                    + u16::from(block.get(row - 1, col))
                    + u16::from(block.get(row - 1, col + 1))
                    + u16::from(block.get(row, col - 1))
                    + u16::from(block.get(row, col + 1))
                    + u16::from(block.get(row + 1, col - 1))
                    + u16::from(block.get(row + 1, col))
                    + u16::from(block.get(row + 1, col + 1));

                let alive = block.get(row, col) == 1;
                let next = (alive && neighbors > 1 && neighbors < 4) || (!alive && neighbors == 3);
                out.set(row, col, u8::from(next));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests;
