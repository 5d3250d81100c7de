//! The game authority the client talks to.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use wikihex_core::{CategoryId, ContestId, ContestResult, ContestTask, GameId, GameSnapshot, TileId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The request did not reach the authority or timed out
    #[error("network error: {0}")]
    Network(String),

    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// The authority refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl AuthorityError {
    /// Worth retrying later without any change on our side
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthorityError::Network(_))
    }
}

/// Remote owner of all game state.
///
/// The client never mutates a game locally; every change goes through one of
/// these calls and becomes visible in the next [`GameSnapshot`].
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Current state of `game` as seen by this client's player. `None` once
    /// the game has been deleted.
    async fn fetch_current_state(&self, game: GameId)
        -> Result<Option<GameSnapshot>, AuthorityError>;

    /// Join a game that is waiting for an opponent, or open a new one
    async fn create_or_join_game(&self) -> Result<GameId, AuthorityError>;

    /// Open a game against an AI opponent; it starts immediately
    async fn create_game_with_ai_opponent(&self) -> Result<GameId, AuthorityError>;

    async fn delete_game(&self, game: GameId) -> Result<(), AuthorityError>;

    async fn start_contest(
        &self,
        game: GameId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, AuthorityError>;

    async fn submit_contest_answer(
        &self,
        game: GameId,
        contest: ContestId,
        answers: Vec<String>,
    ) -> Result<ContestResult, AuthorityError>;
}

#[async_trait]
impl<A: RemoteAuthority + ?Sized> RemoteAuthority for Arc<A> {
    async fn fetch_current_state(
        &self,
        game: GameId,
    ) -> Result<Option<GameSnapshot>, AuthorityError> {
        (**self).fetch_current_state(game).await
    }

    async fn create_or_join_game(&self) -> Result<GameId, AuthorityError> {
        (**self).create_or_join_game().await
    }

    async fn create_game_with_ai_opponent(&self) -> Result<GameId, AuthorityError> {
        (**self).create_game_with_ai_opponent().await
    }

    async fn delete_game(&self, game: GameId) -> Result<(), AuthorityError> {
        (**self).delete_game(game).await
    }

    async fn start_contest(
        &self,
        game: GameId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, AuthorityError> {
        (**self).start_contest(game, tile, category).await
    }

    async fn submit_contest_answer(
        &self,
        game: GameId,
        contest: ContestId,
        answers: Vec<String>,
    ) -> Result<ContestResult, AuthorityError> {
        (**self).submit_contest_answer(game, contest, answers).await
    }
}
