//! Durable key-value storage for the little state that must survive a restart.
//!
//! Implementations write through: a `set` is durable by the time it returns
//! (or has been logged as lost). Keys belonging to one game are namespaced with
//! [`game_key`] so that two games never read each other's values.

use crate::ids::GameId;
use std::collections::HashMap;

/// Key of the game the client is currently playing or matchmaking for
pub const CURRENT_GAME_ID: &str = "CURRENT_GAME_ID";

/// Per-game: remaining action points of the local turn
pub const REMAINING_ACTION_POINTS: &str = "REMAINING_ACTION_POINTS";

/// Per-game: consecutive restores that fell back to a full budget
pub const BUDGET_RESTORE_FAILURES: &str = "BUDGET_RESTORE_FAILURES";

/// Per-game: set while the client is searching for an opponent
pub const IS_WAITING_FOR_OPPONENT: &str = "IS_WAITING_FOR_OPPONENT";

/// Keys written per game, cleared when the game ends or is abandoned
pub const GAME_KEYS: [&str; 3] = [
    REMAINING_ACTION_POINTS,
    BUDGET_RESTORE_FAILURES,
    IS_WAITING_FOR_OPPONENT,
];

/// Namespace `key` under `game`
pub fn game_key(game: GameId, key: &str) -> String {
    format!("{game}/{key}")
}

/// Minimal string-keyed persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|raw| raw.trim().parse().ok())
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, value.to_string());
    }

    /// Drop every per-game key of `game`
    fn clear_game(&mut self, game: GameId) {
        for key in GAME_KEYS {
            self.remove(&game_key(game, key));
        }
    }
}

/// Volatile store, for tests and sessions that do not need to resume
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}
