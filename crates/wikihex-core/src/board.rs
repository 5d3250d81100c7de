//! The game board: a rectangular grid of tiles with holes.
//!
//! A [`Board`] is never patched. Every time a new snapshot arrives the whole
//! board is rebuilt from the raw tile matrix, which keeps it from drifting
//! away from what the authority believes.

use crate::hex::{are_neighbors, GridDims};
use crate::ids::{PlayerId, TileId};
use crate::tile::{Tile, TileState, OFFERED_CATEGORIES};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Raw tile matrix as sent by the authority: outer index is the row
pub type RawTiles = Vec<Vec<Option<TileState>>>;

/// Errors from building or querying a board
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("board has no cells")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("tile {tile} offers {found} categories, expected 3")]
    CategoryCount { tile: TileId, found: usize },

    #[error("tile {tile} has a chosen category it does not offer")]
    UnknownChosenCategory { tile: TileId },

    #[error("tile {0} appears more than once")]
    DuplicateTile(TileId),

    #[error("no tile at index {0}")]
    NoTile(usize),

    #[error("tile {0} is not on the board")]
    UnknownTile(TileId),
}

/// A rebuilt board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    dims: GridDims,
    /// Row-major cells, `None` for holes
    cells: Vec<Option<Tile>>,
    index_by_id: HashMap<TileId, usize>,
}

impl Board {
    /// Build a board from the authority's tile matrix.
    ///
    /// Every cell, empty or not, consumes one linear index so that adjacency
    /// arithmetic lines up with the grid. The matrix is validated here once;
    /// after that every query on the board is infallible for well-formed input.
    pub fn rebuild(raw: &[Vec<Option<TileState>>]) -> Result<Self, BoardError> {
        let rows = raw.len();
        let columns = raw.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || columns == 0 {
            return Err(BoardError::Empty);
        }

        let dims = GridDims::new(rows, columns);
        let mut cells = Vec::with_capacity(dims.cell_count());
        let mut index_by_id = HashMap::new();

        for (row, raw_row) in raw.iter().enumerate() {
            if raw_row.len() != columns {
                return Err(BoardError::Ragged {
                    row,
                    expected: columns,
                    found: raw_row.len(),
                });
            }

            for state in raw_row {
                let linear_index = cells.len();
                let tile = match state {
                    Some(state) => {
                        let tile = place_tile(state, dims, linear_index)?;
                        if index_by_id.insert(tile.id, linear_index).is_some() {
                            return Err(BoardError::DuplicateTile(tile.id));
                        }
                        Some(tile)
                    }
                    None => None,
                };
                cells.push(tile);
            }
        }

        Ok(Self {
            dims,
            cells,
            index_by_id,
        })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Tile at a linear index, `None` for holes and out-of-range indices
    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    /// Look a tile up by id
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.index_by_id.get(&id).and_then(|&index| self.get(index))
    }

    /// All occupied cells in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    /// Number of occupied cells
    pub fn tile_count(&self) -> usize {
        self.index_by_id.len()
    }

    /// Tiles owned by `owner`
    pub fn owned_by(&self, owner: PlayerId) -> impl Iterator<Item = &Tile> {
        self.tiles().filter(move |tile| tile.is_owned_by(owner))
    }

    /// All occupied cells adjacent to the tile at `index`.
    ///
    /// Asking for the neighbours of a hole is a caller bug and fails.
    pub fn neighbors_of(&self, index: usize) -> Result<Vec<&Tile>, BoardError> {
        let tile = self.get(index).ok_or(BoardError::NoTile(index))?;
        Ok(self
            .tiles()
            .filter(|other| are_neighbors(tile.linear_index, other.linear_index, self.dims))
            .collect())
    }

    /// Tiles `owner` may act on: everything they own plus everything next to it
    pub fn legal_moves(&self, owner: PlayerId) -> LegalMoves {
        let mut moves = BTreeSet::new();
        for tile in self.owned_by(owner) {
            moves.insert(tile.id);
            for neighbor in self
                .tiles()
                .filter(|other| are_neighbors(tile.linear_index, other.linear_index, self.dims))
            {
                moves.insert(neighbor.id);
            }
        }
        LegalMoves { tiles: moves }
    }
}

fn place_tile(state: &TileState, dims: GridDims, linear_index: usize) -> Result<Tile, BoardError> {
    let available_categories: [_; OFFERED_CATEGORIES] = state
        .available_categories
        .clone()
        .try_into()
        .map_err(|categories: Vec<_>| BoardError::CategoryCount {
            tile: state.id,
            found: categories.len(),
        })?;

    if let Some(chosen) = state.chosen_category_id {
        if !available_categories.iter().any(|c| c.id == chosen) {
            return Err(BoardError::UnknownChosenCategory { tile: state.id });
        }
    }

    Ok(Tile {
        id: state.id,
        difficulty: state.difficulty,
        owner_id: state.owner_id,
        chosen_category_id: state.chosen_category_id,
        available_categories,
        position: dims.coord_of(linear_index),
        linear_index,
    })
}

/// The set of tiles a player may currently select
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMoves {
    tiles: BTreeSet<TileId>,
}

impl LegalMoves {
    pub fn contains(&self, tile: TileId) -> bool {
        self.tiles.contains(&tile)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.iter().copied()
    }
}

/// Whether `tile` is one of the player's legal moves
pub fn is_legal_move(tile: &Tile, legal_moves: &LegalMoves) -> bool {
    legal_moves.contains(tile.id)
}
