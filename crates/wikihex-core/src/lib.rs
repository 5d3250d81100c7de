//! wikihex - the rules engine of a two-player hex territory quiz game
//!
//! This crate provides the pure, synchronous part of the game client:
//! - Hex geometry and adjacency on a row-major staggered board
//! - Board rebuilds from authoritative snapshots and legal-move sets
//! - The per-turn action budget and its persistence
//! - Score and outcome derivation
//! - Contest (quiz round) selection and data
//!
//! # Architecture
//!
//! The authority owns the game. This crate never changes ownership or
//! difficulty of a tile by itself; it only interprets the snapshots it is
//! given. The async session that fetches those snapshots lives in
//! `wikihex-client`.
//!
//! # Modules
//!
//! - [`hex`]: Grid dimensions, adjacency and world projection
//! - [`board`]: Board rebuilds, neighbours and legal moves
//! - [`budget`]: Action points of a turn
//! - [`snapshot`]: Authoritative game state
//! - [`score`]: Scores and outcomes
//! - [`contest`]: Contest intents, category choice and sub-game data
//! - [`events`]: Presentation intents and events
//! - [`bot`]: AI players

pub mod board;
pub mod bot;
pub mod budget;
pub mod contest;
pub mod events;
pub mod hex;
pub mod ids;
pub mod score;
pub mod snapshot;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use board::{is_legal_move, Board, BoardError, LegalMoves, RawTiles};
pub use bot::{Bot, BotDifficulty};
pub use budget::{ActionBudget, BudgetError, RestoreSource, TOTAL_ACTION_POINTS};
pub use contest::{
    CategoryChoice, ContestError, ContestIntent, ContestResult, ContestTask, PendingContest,
    SubGameKind, SubGameOutcome, SubGameParams,
};
pub use events::{Intent, SessionEvent, TileView, TurnState};
pub use hex::{are_neighbors, to_world_offset, GridDims, HexCoord, HexLayout};
pub use ids::{CategoryId, ContestId, GameId, PlayerId, TileId};
pub use score::{compute_scores, max_score, Outcome, Scores};
pub use snapshot::{GameSnapshot, Player, SnapshotError};
pub use store::{game_key, KeyValueStore, MemoryStore};
pub use tile::{Category, Difficulty, Ownership, Tile, TileState};
