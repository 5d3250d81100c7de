//! Authoritative game state as fetched from the game authority.
//!
//! A [`GameSnapshot`] is an immutable value. The client never edits one; it
//! fetches a new snapshot and throws the old one away.

use crate::board::{Board, BoardError, RawTiles};
use crate::ids::{GameId, PlayerId};
use crate::score::Outcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authority reported something that cannot happen.
///
/// These are data-integrity faults: they are surfaced, never guessed around.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SnapshotError {
    #[error("could not decode snapshot: {0}")]
    Decode(String),

    #[error("game has started but no opponent is present")]
    MissingOpponent,

    #[error("game has started but nobody has the next move")]
    NoNextMover,

    #[error("next move belongs to {0}, who is not in this game")]
    UnknownNextMover(PlayerId),

    #[error("illegal winner list {0:?}")]
    IllegalWinners(Vec<PlayerId>),

    #[error("invalid board: {0}")]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub id: GameId,
    pub me: Player,
    #[serde(default)]
    pub opponent: Option<Player>,
    pub tiles: RawTiles,
    #[serde(default)]
    pub next_move_player_id: Option<PlayerId>,
    #[serde(default)]
    pub awaiting_opponent_to_join: bool,
    #[serde(default)]
    pub winning_player_ids: Option<Vec<PlayerId>>,
    #[serde(default)]
    pub turns_played: u32,
}

impl GameSnapshot {
    /// Parse a snapshot from its JSON form and check it
    pub fn decode(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the invariants the client relies on.
    ///
    /// The board itself is validated by [`Board::rebuild`].
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.awaiting_opponent_to_join {
            return Ok(());
        }

        let opponent = self.opponent.as_ref().ok_or(SnapshotError::MissingOpponent)?;
        let next = self.next_move_player_id.ok_or(SnapshotError::NoNextMover)?;
        if next != self.me.id && next != opponent.id {
            return Err(SnapshotError::UnknownNextMover(next));
        }

        self.outcome()?;
        Ok(())
    }

    pub fn opponent_id(&self) -> Option<PlayerId> {
        self.opponent.as_ref().map(|p| p.id)
    }

    pub fn is_my_turn(&self) -> bool {
        self.next_move_player_id == Some(self.me.id)
    }

    /// `Some` once the authority has declared winners
    pub fn outcome(&self) -> Result<Option<Outcome>, SnapshotError> {
        match self.winning_player_ids.as_deref() {
            None | Some([]) => Ok(None),
            Some(winners) => Outcome::from_winners(winners, self.me.id, self.opponent_id()).map(Some),
        }
    }

    pub fn board(&self) -> Result<Board, SnapshotError> {
        Ok(Board::rebuild(&self.tiles)?)
    }
}
