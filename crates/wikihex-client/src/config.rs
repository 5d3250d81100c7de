//! Client configuration, read from `WIKIHEX_*` environment variables.

use crate::room::MIN_BOARD_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use wikihex_core::BotDifficulty;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Poll interval while searching for an opponent
    #[serde(default = "default_search_poll_ms")]
    pub search_poll_ms: u64,
    /// Poll interval while the opponent is moving
    #[serde(default = "default_wait_poll_ms")]
    pub wait_poll_ms: u64,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Action point indicators shown by the presentation
    #[serde(default = "default_action_slots")]
    pub action_slots: u8,
    #[serde(default = "default_player_name")]
    pub player_name: String,
    /// Edge length of boards generated by the in-process authority
    #[serde(default = "default_board_size")]
    pub board_size: usize,
    /// Turns per player before the in-process authority ends a game
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Pause after a contest so its pass/fail colouring can be seen
    #[serde(default)]
    pub result_pause_ms: u64,
    #[serde(default = "default_bot_difficulty")]
    pub bot_difficulty: BotDifficulty,
}

fn default_search_poll_ms() -> u64 {
    3_000
}

fn default_wait_poll_ms() -> u64 {
    10_000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("wikihex-store.json")
}

fn default_action_slots() -> u8 {
    3
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_board_size() -> usize {
    8
}

fn default_max_turns() -> u32 {
    6
}

fn default_bot_difficulty() -> BotDifficulty {
    BotDifficulty::Medium
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            search_poll_ms: default_search_poll_ms(),
            wait_poll_ms: default_wait_poll_ms(),
            store_path: default_store_path(),
            action_slots: default_action_slots(),
            player_name: default_player_name(),
            board_size: default_board_size(),
            max_turns: default_max_turns(),
            result_pause_ms: 0,
            bot_difficulty: default_bot_difficulty(),
        }
    }
}

impl ClientConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("WIKIHEX_SEARCH_POLL_MS") {
            config.search_poll_ms = parse("WIKIHEX_SEARCH_POLL_MS", &v)?;
        }
        if let Some(v) = lookup("WIKIHEX_WAIT_POLL_MS") {
            config.wait_poll_ms = parse("WIKIHEX_WAIT_POLL_MS", &v)?;
        }
        if let Some(v) = lookup("WIKIHEX_STORE_PATH") {
            config.store_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("WIKIHEX_ACTION_SLOTS") {
            config.action_slots = parse("WIKIHEX_ACTION_SLOTS", &v)?;
        }
        if let Some(v) = lookup("WIKIHEX_PLAYER_NAME") {
            config.player_name = v;
        }
        if let Some(v) = lookup("WIKIHEX_BOARD_SIZE") {
            config.board_size = parse("WIKIHEX_BOARD_SIZE", &v)?;
            if config.board_size < MIN_BOARD_SIZE {
                return Err(ConfigError {
                    key: "WIKIHEX_BOARD_SIZE",
                    value: v,
                    reason: "boards need at least 4 rows".to_string(),
                });
            }
        }
        if let Some(v) = lookup("WIKIHEX_MAX_TURNS") {
            config.max_turns = parse("WIKIHEX_MAX_TURNS", &v)?;
            if config.max_turns == 0 {
                return Err(ConfigError {
                    key: "WIKIHEX_MAX_TURNS",
                    value: v,
                    reason: "a game needs at least one turn".to_string(),
                });
            }
        }
        if let Some(v) = lookup("WIKIHEX_RESULT_PAUSE_MS") {
            config.result_pause_ms = parse("WIKIHEX_RESULT_PAUSE_MS", &v)?;
        }
        if let Some(v) = lookup("WIKIHEX_BOT_DIFFICULTY") {
            config.bot_difficulty = match v.to_ascii_lowercase().as_str() {
                "easy" => BotDifficulty::Easy,
                "medium" => BotDifficulty::Medium,
                "hard" => BotDifficulty::Hard,
                _ => {
                    return Err(ConfigError {
                        key: "WIKIHEX_BOT_DIFFICULTY",
                        value: v,
                        reason: "expected easy, medium or hard".to_string(),
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn search_poll(&self) -> Duration {
        Duration::from_millis(self.search_poll_ms)
    }

    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(self.wait_poll_ms)
    }

    pub fn result_pause(&self) -> Duration {
        Duration::from_millis(self.result_pause_ms)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
