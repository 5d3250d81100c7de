//! Action points of the local player's turn.
//!
//! The budget is a prediction for the UI: the authority alone decides when a
//! turn really ends. It is still persisted after every change so a client that
//! is killed mid-turn comes back with the right number of points.

use crate::ids::GameId;
use crate::store::{game_key, KeyValueStore, BUDGET_RESTORE_FAILURES, REMAINING_ACTION_POINTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Actions per turn
pub const TOTAL_ACTION_POINTS: u8 = 3;

/// Restores allowed to fall back to a full budget before giving up
pub const MAX_RESTORE_FALLBACKS: i64 = 3;

/// Misuse of the budget. Both variants are programming or configuration
/// errors and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BudgetError {
    #[error("there is no action point left to remove")]
    NoBudget,

    #[error("there needs to be at least one action point slot, found {0}")]
    NoSlots(u8),
}

/// Where a restored budget came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// A valid persisted value
    Persisted,
    /// Missing or corrupt value, replaced by a full budget
    DefaultedFull { attempt: i64 },
    /// Too many fallbacks in a row; treated as exhausted
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBudget {
    remaining: u8,
    /// Action point slots the UI shows
    slots: u8,
}

impl Default for ActionBudget {
    fn default() -> Self {
        Self::new(TOTAL_ACTION_POINTS)
    }
}

impl ActionBudget {
    /// A full budget rendered with `slots` indicators
    pub fn new(slots: u8) -> Self {
        Self {
            remaining: TOTAL_ACTION_POINTS,
            slots,
        }
    }

    fn with_remaining(remaining: u8, slots: u8) -> Self {
        Self {
            remaining: remaining.min(TOTAL_ACTION_POINTS),
            slots,
        }
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn slots(&self) -> u8 {
        self.slots
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset_for_new_turn(&mut self) {
        self.remaining = TOTAL_ACTION_POINTS;
    }

    /// Spend one action point, returning what is left
    pub fn consume_one(&mut self) -> Result<u8, BudgetError> {
        if self.slots < 1 {
            return Err(BudgetError::NoSlots(self.slots));
        }
        if self.remaining == 0 {
            return Err(BudgetError::NoBudget);
        }
        self.remaining -= 1;
        Ok(self.remaining)
    }

    /// Write the current value for `game`
    pub fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S, game: GameId) {
        store.set_int(
            &game_key(game, REMAINING_ACTION_POINTS),
            i64::from(self.remaining),
        );
    }

    /// Read the budget of `game` back after a restart.
    ///
    /// A missing or corrupt value falls back to a full budget, which is written
    /// back as a repair. If the value is still unreadable after
    /// [`MAX_RESTORE_FALLBACKS`] such repairs in a row, the budget is treated
    /// as exhausted.
    pub fn restore<S: KeyValueStore + ?Sized>(
        store: &mut S,
        game: GameId,
        slots: u8,
    ) -> (Self, RestoreSource) {
        let value_key = game_key(game, REMAINING_ACTION_POINTS);
        let failures_key = game_key(game, BUDGET_RESTORE_FAILURES);

        let persisted = store
            .get_int(&value_key)
            .filter(|v| (0..=i64::from(TOTAL_ACTION_POINTS)).contains(v));

        if let Some(remaining) = persisted {
            store.remove(&failures_key);
            return (
                Self::with_remaining(remaining as u8, slots),
                RestoreSource::Persisted,
            );
        }

        let attempt = store.get_int(&failures_key).unwrap_or(0) + 1;
        store.set_int(&failures_key, attempt);

        if attempt <= MAX_RESTORE_FALLBACKS {
            let budget = Self::new(slots);
            budget.persist(store, game);
            (budget, RestoreSource::DefaultedFull { attempt })
        } else {
            (Self::with_remaining(0, slots), RestoreSource::GaveUp)
        }
    }
}
