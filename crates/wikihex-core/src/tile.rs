//! Tiles, difficulty levels and quiz categories.
//!
//! [`TileState`] is what the authority sends for one cell. [`Tile`] is the same
//! data once it has been placed on a [`Board`](crate::board::Board) and knows
//! its position and linear index.

use crate::hex::HexCoord;
use crate::ids::{CategoryId, PlayerId, TileId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Number of categories offered for a tile that has none chosen yet
pub const OFFERED_CATEGORIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("difficulty {0} is out of range (0-2)")]
pub struct InvalidDifficulty(pub u8);

/// Tile level. Higher levels are worth more and give less time to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MAX: Difficulty = Difficulty(2);

    pub fn new(level: u8) -> Result<Self, InvalidDifficulty> {
        if level <= Self::MAX.0 {
            Ok(Self(level))
        } else {
            Err(InvalidDifficulty(level))
        }
    }

    pub const fn level(&self) -> u8 {
        self.0
    }

    /// Score contributed by an owned tile of this level
    pub const fn points(&self) -> u64 {
        self.0 as u64 + 1
    }

    /// Answer time granted by the sub-game
    pub const fn time_budget(&self) -> Duration {
        match self.0 {
            0 => Duration::from_secs(30),
            1 => Duration::from_secs(20),
            _ => Duration::from_secs(10),
        }
    }

    /// One level up, saturating at [`Difficulty::MAX`]
    pub fn raised(self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX.0))
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = InvalidDifficulty;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

/// A quiz category a tile can be contested in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
}

impl Category {
    pub fn new(id: CategoryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// One occupied cell as reported by the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileState {
    pub id: TileId,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub owner_id: Option<PlayerId>,
    #[serde(default)]
    pub chosen_category_id: Option<CategoryId>,
    #[serde(default)]
    pub available_categories: Vec<Category>,
}

/// A tile placed on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub difficulty: Difficulty,
    pub owner_id: Option<PlayerId>,
    pub chosen_category_id: Option<CategoryId>,
    pub available_categories: [Category; OFFERED_CATEGORIES],
    pub position: HexCoord,
    pub linear_index: usize,
}

/// How a tile relates to the player looking at it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    Unowned,
    Mine,
    Opponent,
}

impl Tile {
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner_id == Some(player)
    }

    pub fn ownership(&self, viewer: PlayerId) -> Ownership {
        match self.owner_id {
            None => Ownership::Unowned,
            Some(owner) if owner == viewer => Ownership::Mine,
            Some(_) => Ownership::Opponent,
        }
    }

    /// The chosen category, if the tile has been contested before
    pub fn chosen_category(&self) -> Option<&Category> {
        let chosen = self.chosen_category_id?;
        self.available_categories.iter().find(|c| c.id == chosen)
    }
}
