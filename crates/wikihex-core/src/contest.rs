//! Contests: the quiz round that decides a capture, level-up or attack.
//!
//! This module holds the pure part of resolving an action:
//! - which [`ContestIntent`] a tile implies for the player acting on it
//! - the category selection a tile needs before a contest can start
//! - the task/result data exchanged with the authority and the sub-game
//!
//! Applying the result to the board is deliberately absent: after a contest
//! the client fetches a fresh snapshot instead.

use crate::board::LegalMoves;
use crate::ids::{CategoryId, ContestId, PlayerId, TileId};
use crate::tile::{Category, Difficulty, Ownership, Tile, OFFERED_CATEGORIES};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from selecting a tile or decoding contest data
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ContestError {
    #[error("tile {0} is not a legal move")]
    IllegalMove(TileId),

    #[error("category {category} is not offered by tile {tile}")]
    CategoryNotOffered { tile: TileId, category: CategoryId },

    #[error("unknown sub-game type tag {0}")]
    UnknownSubGame(u8),
}

/// What acting on a tile means, given who owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContestIntent {
    /// Take an unowned tile
    Capture,
    /// Raise the level of an own tile
    LevelUp,
    /// Take a tile from the opponent
    Attack,
}

impl ContestIntent {
    pub fn for_ownership(ownership: Ownership) -> Self {
        match ownership {
            Ownership::Unowned => ContestIntent::Capture,
            Ownership::Mine => ContestIntent::LevelUp,
            Ownership::Opponent => ContestIntent::Attack,
        }
    }
}

/// The three sub-game presentations.
///
/// On the wire these are numeric tags: 0 sequencing, 1 image guess,
/// 2 multiple choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SubGameKind {
    Sequencing,
    ImageGuess,
    MultipleChoice,
}

impl SubGameKind {
    pub const ALL: [SubGameKind; 3] = [
        SubGameKind::Sequencing,
        SubGameKind::ImageGuess,
        SubGameKind::MultipleChoice,
    ];

    pub fn from_tag(tag: u8) -> Result<Self, ContestError> {
        match tag {
            0 => Ok(SubGameKind::Sequencing),
            1 => Ok(SubGameKind::ImageGuess),
            2 => Ok(SubGameKind::MultipleChoice),
            other => Err(ContestError::UnknownSubGame(other)),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            SubGameKind::Sequencing => 0,
            SubGameKind::ImageGuess => 1,
            SubGameKind::MultipleChoice => 2,
        }
    }

    /// Whether the player submits all options in an order rather than one pick
    pub fn is_ordering(&self) -> bool {
        matches!(self, SubGameKind::Sequencing)
    }
}

impl TryFrom<u8> for SubGameKind {
    type Error = ContestError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

impl From<SubGameKind> for u8 {
    fn from(kind: SubGameKind) -> Self {
        kind.tag()
    }
}

/// A question handed out by the authority when a contest starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestTask {
    pub id: ContestId,
    #[serde(rename = "type")]
    pub kind: SubGameKind,
    pub description: String,
    pub answer_options: Vec<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// The authority's answer to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestResult {
    pub correct_answers: Vec<String>,
}

impl ContestResult {
    /// Pass/fail for display. Order matters, which is what sequencing needs
    /// and is harmless for single-answer kinds.
    pub fn passed(&self, submitted: &[String]) -> bool {
        !submitted.is_empty() && submitted == self.correct_answers.as_slice()
    }
}

/// Everything a sub-game presenter needs to run one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGameParams {
    pub task: ContestTask,
    pub category: Category,
    pub difficulty: Difficulty,
    pub time_budget: Duration,
}

impl SubGameParams {
    pub fn new(task: ContestTask, category: Category, difficulty: Difficulty) -> Self {
        Self {
            task,
            category,
            time_budget: difficulty.time_budget(),
            difficulty,
        }
    }
}

/// How a sub-game round ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubGameOutcome {
    Submitted(Vec<String>),
    TimedOut,
}

impl SubGameOutcome {
    /// Answers to submit; running out of time submits nothing
    pub fn into_answers(self) -> Vec<String> {
        match self {
            SubGameOutcome::Submitted(answers) => answers,
            SubGameOutcome::TimedOut => Vec::new(),
        }
    }
}

/// The category a contest will be played in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryChoice {
    /// Set by an earlier contest on the tile and reused
    Fixed(Category),
    /// Not yet chosen; the player picks one of these
    Pick([Category; OFFERED_CATEGORIES]),
}

/// A tile the local player has selected but not yet contested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingContest {
    pub tile: TileId,
    pub intent: ContestIntent,
    pub difficulty: Difficulty,
    pub choice: CategoryChoice,
}

impl PendingContest {
    /// Start resolving an action on `tile` for `player`.
    ///
    /// Tiles outside `legal_moves` are refused; the caller is expected to have
    /// filtered those out already.
    pub fn select(
        tile: &Tile,
        legal_moves: &LegalMoves,
        player: PlayerId,
    ) -> Result<Self, ContestError> {
        if !legal_moves.contains(tile.id) {
            return Err(ContestError::IllegalMove(tile.id));
        }

        let choice = match tile.chosen_category() {
            Some(category) => CategoryChoice::Fixed(category.clone()),
            None => CategoryChoice::Pick(tile.available_categories.clone()),
        };

        Ok(Self {
            tile: tile.id,
            intent: ContestIntent::for_ownership(tile.ownership(player)),
            difficulty: tile.difficulty,
            choice,
        })
    }

    pub fn needs_category(&self) -> bool {
        matches!(self.choice, CategoryChoice::Pick(_))
    }

    /// The category already fixed on the tile, if any
    pub fn fixed_category(&self) -> Option<&Category> {
        match &self.choice {
            CategoryChoice::Fixed(category) => Some(category),
            CategoryChoice::Pick(_) => None,
        }
    }

    /// Resolve the player's pick. A fixed category only accepts itself.
    pub fn confirm(&self, category: CategoryId) -> Result<Category, ContestError> {
        let found = match &self.choice {
            CategoryChoice::Fixed(fixed) => (fixed.id == category).then_some(fixed),
            CategoryChoice::Pick(offered) => offered.iter().find(|c| c.id == category),
        };
        found.cloned().ok_or(ContestError::CategoryNotOffered {
            tile: self.tile,
            category,
        })
    }
}
