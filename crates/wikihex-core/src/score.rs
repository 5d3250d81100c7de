//! Scores and game outcomes.
//!
//! Scores are always recomputed from the whole board; there is no running
//! total that could drift from the authority's tiles.

use crate::board::Board;
use crate::ids::PlayerId;
use crate::snapshot::SnapshotError;
use serde::{Deserialize, Serialize};

/// Both players' territory value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub mine: u64,
    pub opponent: u64,
}

impl Scores {
    pub fn total(&self) -> u64 {
        self.mine + self.opponent
    }
}

/// Sum `difficulty + 1` over the tiles each player owns
pub fn compute_scores(board: &Board, me: PlayerId, opponent: Option<PlayerId>) -> Scores {
    let mut scores = Scores::default();
    for tile in board.tiles() {
        match tile.owner_id {
            Some(owner) if owner == me => scores.mine += tile.difficulty.points(),
            Some(owner) if Some(owner) == opponent => scores.opponent += tile.difficulty.points(),
            _ => {}
        }
    }
    scores
}

/// What the board would be worth if every tile were owned
pub fn max_score(board: &Board) -> u64 {
    board.tiles().map(|tile| tile.difficulty.points()).sum()
}

/// How a finished game ended for the local player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    /// The opponent deleted the game before it finished
    OpponentConceded,
}

impl Outcome {
    /// Map the authority's winner list. Only "me", "them" or "both" are
    /// meaningful; anything else is an illegal snapshot.
    pub fn from_winners(
        winners: &[PlayerId],
        me: PlayerId,
        opponent: Option<PlayerId>,
    ) -> Result<Self, SnapshotError> {
        let has_me = winners.contains(&me);
        let has_opponent = opponent.is_some_and(|id| winners.contains(&id));

        match (winners.len(), has_me, has_opponent) {
            (1, true, false) => Ok(Outcome::Win),
            (1, false, true) => Ok(Outcome::Loss),
            (2, true, true) => Ok(Outcome::Draw),
            _ => Err(SnapshotError::IllegalWinners(winners.to_vec())),
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win | Outcome::OpponentConceded)
    }
}
