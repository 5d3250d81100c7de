//! An in-process game authority.
//!
//! [`ServerState`] keeps every room behind a [`DashMap`]; each player talks
//! to it through their own [`LocalAuthority`] handle. AI opponents move
//! inside the room as soon as a human turn ends.

use crate::authority::{AuthorityError, RemoteAuthority};
use crate::room::{GameRoom, RoomError, RoomRules, RoomStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wikihex_core::{
    CategoryId, ContestId, ContestResult, ContestTask, GameId, GameSnapshot, Player, PlayerId,
    TileId,
};

impl From<RoomError> for AuthorityError {
    fn from(error: RoomError) -> Self {
        AuthorityError::Rejected(error.to_string())
    }
}

/// State shared by every player of the in-process authority
pub struct ServerState {
    /// All games that have not been deleted
    pub rooms: DashMap<GameId, GameRoom>,
    rules: RoomRules,
    offline: AtomicBool,
}

impl ServerState {
    pub fn new(rules: RoomRules) -> Self {
        Self {
            rooms: DashMap::new(),
            rules,
            offline: AtomicBool::new(false),
        }
    }

    /// A handle that acts as `player`
    pub fn connect(self: &Arc<Self>, player: Player) -> LocalAuthority {
        LocalAuthority {
            state: Arc::clone(self),
            player,
        }
    }

    /// Simulate an unreachable authority: every request fails with a network
    /// error until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// A room waiting for an opponent that `player` is not already in
    fn waiting_room_for(&self, player: PlayerId) -> Option<GameId> {
        self.rooms
            .iter()
            .find(|room| room.status == RoomStatus::Waiting && !room.has_player(player))
            .map(|room| room.id)
    }

    fn check_online(&self) -> Result<(), AuthorityError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthorityError::Network("authority unreachable".into()));
        }
        Ok(())
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(RoomRules::default())
    }
}

/// One player's connection to a [`ServerState`]
#[derive(Clone)]
pub struct LocalAuthority {
    state: Arc<ServerState>,
    player: Player,
}

impl LocalAuthority {
    pub fn player(&self) -> &Player {
        &self.player
    }

    fn open_room(&self) -> GameRoom {
        GameRoom::new(GameId::new_v4(), self.player.clone(), self.state.rules)
    }
}

#[async_trait]
impl RemoteAuthority for LocalAuthority {
    async fn fetch_current_state(
        &self,
        game: GameId,
    ) -> Result<Option<GameSnapshot>, AuthorityError> {
        self.state.check_online()?;
        let Some(room) = self.state.rooms.get(&game) else {
            return Ok(None);
        };
        Ok(Some(room.snapshot_for(self.player.id)?))
    }

    async fn create_or_join_game(&self) -> Result<GameId, AuthorityError> {
        self.state.check_online()?;
        if let Some(game) = self.state.waiting_room_for(self.player.id) {
            if let Some(mut room) = self.state.rooms.get_mut(&game) {
                match room.add_player(self.player.clone()) {
                    Ok(()) => {
                        info!("{} joined game {}", self.player.name, game);
                        return Ok(game);
                    }
                    // Someone else took the seat first
                    Err(e) => debug!("Could not join game {}: {}", game, e),
                }
            }
        }

        let room = self.open_room();
        let game = room.id;
        self.state.rooms.insert(game, room);
        info!("{} opened game {}", self.player.name, game);
        Ok(game)
    }

    async fn create_game_with_ai_opponent(&self) -> Result<GameId, AuthorityError> {
        self.state.check_online()?;
        let mut room = self.open_room();
        let game = room.id;
        let bot = room.add_bot()?;
        self.state.rooms.insert(game, room);
        info!("{} opened game {} against bot {}", self.player.name, game, bot);
        Ok(game)
    }

    async fn delete_game(&self, game: GameId) -> Result<(), AuthorityError> {
        self.state.check_online()?;
        let removed = self
            .state
            .rooms
            .remove_if(&game, |_, room| room.has_player(self.player.id));
        match removed {
            Some(_) => {
                info!("{} deleted game {}", self.player.name, game);
                Ok(())
            }
            None if self.state.rooms.contains_key(&game) => {
                Err(RoomError::PlayerNotInRoom.into())
            }
            None => Err(AuthorityError::GameNotFound(game)),
        }
    }

    async fn start_contest(
        &self,
        game: GameId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, AuthorityError> {
        self.state.check_online()?;
        let mut room = self
            .state
            .rooms
            .get_mut(&game)
            .ok_or(AuthorityError::GameNotFound(game))?;
        Ok(room.start_contest(self.player.id, tile, category)?)
    }

    async fn submit_contest_answer(
        &self,
        game: GameId,
        contest: ContestId,
        answers: Vec<String>,
    ) -> Result<ContestResult, AuthorityError> {
        self.state.check_online()?;
        let mut room = self
            .state
            .rooms
            .get_mut(&game)
            .ok_or(AuthorityError::GameNotFound(game))?;
        let result = room.submit_answer(self.player.id, contest, &answers)?;

        match room.play_bot_turns() {
            Ok(0) => {}
            Ok(played) => debug!("Bot played {} contests in game {}", played, game),
            Err(e) => warn!("Bot failed to move in game {}: {}", game, e),
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<ServerState> {
        Arc::new(ServerState::default())
    }

    #[tokio::test]
    async fn test_second_player_joins_waiting_game() {
        let state = state();
        let alice = state.connect(Player::new(PlayerId::new_v4(), "Alice"));
        let bob = state.connect(Player::new(PlayerId::new_v4(), "Bob"));

        let game = alice.create_or_join_game().await.unwrap();
        let waiting = alice.fetch_current_state(game).await.unwrap().unwrap();
        assert!(waiting.awaiting_opponent_to_join);

        assert_eq!(bob.create_or_join_game().await.unwrap(), game);
        let started = alice.fetch_current_state(game).await.unwrap().unwrap();
        assert!(!started.awaiting_opponent_to_join);
        assert!(started.is_my_turn());
        assert_eq!(started.opponent.unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn test_host_does_not_join_own_game() {
        let state = state();
        let alice = state.connect(Player::new(PlayerId::new_v4(), "Alice"));
        let first = alice.create_or_join_game().await.unwrap();
        let second = alice.create_or_join_game().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_deleted_game_reads_as_none() {
        let state = state();
        let alice = state.connect(Player::new(PlayerId::new_v4(), "Alice"));
        let game = alice.create_game_with_ai_opponent().await.unwrap();

        alice.delete_game(game).await.unwrap();
        assert_eq!(alice.fetch_current_state(game).await.unwrap(), None);
        assert_eq!(
            alice.delete_game(game).await,
            Err(AuthorityError::GameNotFound(game))
        );
    }

    #[tokio::test]
    async fn test_outsider_cannot_delete() {
        let state = state();
        let alice = state.connect(Player::new(PlayerId::new_v4(), "Alice"));
        let mallory = state.connect(Player::new(PlayerId::new_v4(), "Mallory"));
        let game = alice.create_game_with_ai_opponent().await.unwrap();

        assert!(matches!(
            mallory.delete_game(game).await,
            Err(AuthorityError::Rejected(_))
        ));
        assert!(state.rooms.contains_key(&game));
    }

    #[tokio::test]
    async fn test_offline_requests_fail_transiently() {
        let state = state();
        let alice = state.connect(Player::new(PlayerId::new_v4(), "Alice"));
        state.set_offline(true);

        let err = alice.create_or_join_game().await.unwrap_err();
        assert!(err.is_transient());

        state.set_offline(false);
        assert!(alice.create_or_join_game().await.is_ok());
    }
}
