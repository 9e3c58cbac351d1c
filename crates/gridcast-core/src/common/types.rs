//! # Common Cell Types and Constants
//!
//! This module defines the shared cell representation used for storing,
//! encoding, and decoding grid state across the system. It ensures that the
//! broker and worker components adhere to a consistent, compile-time
//! contract for binary serialization.
//!
//! The board is binary-valued in practice (dead/alive), but the wire format
//! and the kernel trait are defined over the full `Cell` range so that other
//! small-integer automata fit without a format change.

/// The cell representation used across the system.
///
/// One byte per cell, matching the wire format. Kernels may use any value in
/// range; the shipped Game-of-Life rule only produces `0` and `1`.
pub type Cell = u8;

/// The number of bytes a single serialized [`Cell`] occupies on the wire.
pub const CELL_SIZE: usize = core::mem::size_of::<Cell>();

/// Width of the halo border, in cells, on every side of a grid or block.
///
/// The stencil reads a 1-cell neighborhood, so both the grid and every
/// decomposed block carry exactly one ring of neighboring data.
pub const HALO: usize = 1;
