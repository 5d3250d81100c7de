//! Hex grid geometry for a rectangular, row-major board.
//!
//! The board is a "staggered brick" layout: every odd row is shifted half a hex
//! to the right of the even rows around it. Cells are addressed either by
//! `(row, column)` or by their row-major linear index, and adjacency is decided
//! directly on linear indices:
//!
//! ```text
//!  row 0:  0   1   2   3
//!  row 1:    4   5   6   7
//!  row 2:  8   9  10  11
//! ```
//!
//! Cell 5 (odd row) touches 1 and 2 above, 4 and 6 beside it, 9 and 10 below.
//! Cell 9 (even row) touches 4 and 5 above, 8 and 10 beside it.

use serde::{Deserialize, Serialize};

/// Width of a hex from flat side to flat side, before the gap is applied
const HEX_WIDTH: f32 = 1.732;

/// Height of a hex from point to point, before the gap is applied
const HEX_HEIGHT: f32 = 2.0;

/// Default spacing between neighbouring hexes, as a fraction of the hex size
const DEFAULT_GAP: f32 = 0.3;

/// Dimensions of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub rows: usize,
    pub columns: usize,
}

impl GridDims {
    pub const fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// Total number of cells, empty ones included
    pub const fn cell_count(&self) -> usize {
        self.rows * self.columns
    }

    /// Whether a linear index addresses a cell of this grid
    pub const fn contains(&self, index: usize) -> bool {
        index < self.cell_count()
    }

    /// Row of a linear index
    pub const fn row_of(&self, index: usize) -> usize {
        index / self.columns
    }

    /// Position of a linear index
    pub const fn coord_of(&self, index: usize) -> HexCoord {
        HexCoord::new(index / self.columns, index % self.columns)
    }

    /// Linear index of a position, if it lies on the grid
    pub fn index_of(&self, coord: HexCoord) -> Option<usize> {
        (coord.row < self.rows && coord.column < self.columns)
            .then(|| coord.row * self.columns + coord.column)
    }
}

/// Position of a cell on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexCoord {
    pub row: usize,
    pub column: usize,
}

impl HexCoord {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Odd rows sit half a hex to the right
    pub const fn is_shifted(&self) -> bool {
        self.row % 2 != 0
    }
}

/// Decide whether two linear indices are hex neighbours.
///
/// Indices outside the grid are never neighbours of anything, and no cell is
/// its own neighbour. The relation is symmetric.
pub fn are_neighbors(first: usize, second: usize, dims: GridDims) -> bool {
    if !dims.contains(first) || !dims.contains(second) {
        return false;
    }

    let a = first as i64;
    let b = second as i64;
    let columns = dims.columns as i64;
    let first_row = a / columns;
    let second_row = b / columns;

    if (first_row - second_row).abs() > 1 {
        return false;
    }

    if first_row == second_row {
        return (a - b).abs() == 1;
    }

    let candidates = if first_row % 2 != 0 {
        [a - (columns - 1), a - columns, a + columns, a + columns + 1]
    } else {
        [a + (columns - 1), a - columns, a + columns, a - (columns + 1)]
    };
    candidates.contains(&b)
}

/// Projection of board positions onto the presentation plane.
///
/// Only the renderer cares about these numbers; they are deterministic and
/// carry no game meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    pub hex_width: f32,
    pub hex_height: f32,
}

impl Default for HexLayout {
    fn default() -> Self {
        Self::with_gap(DEFAULT_GAP)
    }
}

impl HexLayout {
    /// Layout with `gap` extra spacing (0.3 = 30% of a hex)
    pub fn with_gap(gap: f32) -> Self {
        Self {
            hex_width: HEX_WIDTH * (1.0 + gap),
            hex_height: HEX_HEIGHT * (1.0 + gap),
        }
    }

    /// Top-left anchor that centres the board around the origin
    fn start(&self, dims: GridDims) -> (f32, f32) {
        let half_rows = dims.rows / 2;
        let offset = if half_rows % 2 != 0 {
            self.hex_width / 2.0
        } else {
            0.0
        };
        let x = -self.hex_width * (dims.columns / 2) as f32 - offset;
        let z = self.hex_height * 0.75 * half_rows as f32;
        (x, z)
    }

    /// World-space `(x, z)` centre of the hex at `coord`
    pub fn world_offset(&self, coord: HexCoord, dims: GridDims) -> (f32, f32) {
        let (start_x, start_z) = self.start(dims);
        let offset = if coord.is_shifted() {
            self.hex_width / 2.0
        } else {
            0.0
        };
        let x = start_x + coord.column as f32 * self.hex_width + offset;
        let z = start_z - coord.row as f32 * self.hex_height * 0.75;
        (x, z)
    }
}

/// [`HexLayout::world_offset`] with the default 30% gap
pub fn to_world_offset(row: usize, column: usize, dims: GridDims) -> (f32, f32) {
    HexLayout::default().world_offset(HexCoord::new(row, column), dims)
}
