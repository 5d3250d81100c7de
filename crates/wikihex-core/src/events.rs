//! Messages between a game session and its presentation layer.
//!
//! The presentation sends [`Intent`]s and renders [`SessionEvent`]s. Neither
//! side reaches into the other's state.

use crate::board::{Board, LegalMoves};
use crate::contest::{ContestIntent, SubGameKind};
use crate::hex::{HexCoord, HexLayout};
use crate::ids::{CategoryId, PlayerId, TileId};
use crate::score::{Outcome, Scores};
use crate::tile::{Category, Difficulty, Ownership, OFFERED_CATEGORIES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the local player stands in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// No game, or matchmaking was cancelled
    PreGame,
    /// Game created, no opponent yet
    AwaitingMatch,
    MyTurn,
    WaitingForOpponent,
    GameOver(Outcome),
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::GameOver(_))
    }
}

/// What the player asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Tap on a tile
    SelectTile(TileId),
    /// Pick a category for the selected tile
    ConfirmCategory(CategoryId),
    /// Close the category picker
    CancelSelection,
    /// Pull to refresh
    Refresh,
    /// Stop searching for an opponent
    CancelMatchmaking,
    /// Leave the game; conceding it if it is still running
    Leave,
}

/// One tile as the presentation draws it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub id: TileId,
    pub position: HexCoord,
    pub linear_index: usize,
    pub difficulty: Difficulty,
    pub ownership: Ownership,
    /// Highlight as selectable
    pub is_legal: bool,
    /// World-space `(x, z)` centre
    pub world_offset: (f32, f32),
}

impl TileView {
    /// Render every tile of `board` from `viewer`'s point of view
    pub fn from_board(board: &Board, viewer: PlayerId, legal_moves: &LegalMoves) -> Vec<Self> {
        let layout = HexLayout::default();
        board
            .tiles()
            .map(|tile| TileView {
                id: tile.id,
                position: tile.position,
                linear_index: tile.linear_index,
                difficulty: tile.difficulty,
                ownership: tile.ownership(viewer),
                is_legal: legal_moves.contains(tile.id),
                world_offset: layout.world_offset(tile.position, board.dims()),
            })
            .collect()
    }
}

/// Everything the presentation is told
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A fresh snapshot produced a new board
    BoardRebuilt { tiles: Vec<TileView> },
    ScoresUpdated {
        scores: Scores,
        max_score: u64,
        turns_played: u32,
    },
    TurnStateChanged(TurnState),
    BudgetChanged { remaining: u8, slots: u8 },
    /// The selected tile has no category yet
    CategoryChoiceRequired {
        tile: TileId,
        categories: [Category; OFFERED_CATEGORIES],
    },
    ContestStarted {
        tile: TileId,
        intent: ContestIntent,
        kind: SubGameKind,
        time_budget: Duration,
    },
    /// Pass/fail only; the board catches up on the next refresh
    ContestFinished { tile: TileId, passed: bool },
    /// The authority could not be reached; the last board stays up
    ServerUnreachable { message: String },
    GameOver(Outcome),
    /// The game was left and its local state cleared
    Left,
}
