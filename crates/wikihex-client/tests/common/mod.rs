//! Test doubles shared by the session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use wikihex_client::authority::{AuthorityError, RemoteAuthority};
use wikihex_client::sub_game::SubGame;
use wikihex_client::sync::{Sleeper, SyncSettings, TurnSynchronizer};
use wikihex_client::{CaptureResolver, GameSession};
use wikihex_core::{
    Category, CategoryId, ContestId, ContestResult, ContestTask, Difficulty, GameId,
    GameSnapshot, MemoryStore, Player, PlayerId, RawTiles, SessionEvent, SubGameKind,
    SubGameOutcome, SubGameParams, TileId, TileState,
};

pub type FetchResult = Result<Option<GameSnapshot>, AuthorityError>;

/// Answers fetches from a script; the last answer repeats once the script
/// runs out
pub struct ScriptedAuthority {
    pub game: GameId,
    fetches: Mutex<VecDeque<FetchResult>>,
    last: Mutex<Option<FetchResult>>,
    pub fetch_count: Mutex<usize>,
    pub deleted: Mutex<Vec<GameId>>,
    pub contests: Mutex<Vec<(TileId, CategoryId)>>,
    pub submissions: Mutex<Vec<Vec<String>>>,
    pub correct_answers: Vec<String>,
}

impl ScriptedAuthority {
    pub fn new(game: GameId) -> Self {
        Self {
            game,
            fetches: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            fetch_count: Mutex::new(0),
            deleted: Mutex::new(Vec::new()),
            contests: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            correct_answers: vec!["1415".to_string()],
        }
    }

    pub fn push(&self, result: FetchResult) {
        self.fetches.lock().unwrap().push_back(result);
    }

    pub fn push_snapshot(&self, snapshot: GameSnapshot) {
        self.push(Ok(Some(snapshot)));
    }

    pub fn fetches(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

#[async_trait]
impl RemoteAuthority for ScriptedAuthority {
    async fn fetch_current_state(&self, _game: GameId) -> FetchResult {
        *self.fetch_count.lock().unwrap() += 1;
        let next = self.fetches.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last.clone().unwrap_or(Ok(None)),
        }
    }

    async fn create_or_join_game(&self) -> Result<GameId, AuthorityError> {
        Ok(self.game)
    }

    async fn create_game_with_ai_opponent(&self) -> Result<GameId, AuthorityError> {
        Ok(self.game)
    }

    async fn delete_game(&self, game: GameId) -> Result<(), AuthorityError> {
        self.deleted.lock().unwrap().push(game);
        Ok(())
    }

    async fn start_contest(
        &self,
        _game: GameId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, AuthorityError> {
        self.contests.lock().unwrap().push((tile, category));
        Ok(ContestTask {
            id: ContestId::new_v4(),
            kind: SubGameKind::MultipleChoice,
            description: "Which came first?".to_string(),
            answer_options: vec!["1815".to_string(), "1415".to_string()],
            image_ref: None,
        })
    }

    async fn submit_contest_answer(
        &self,
        _game: GameId,
        _contest: ContestId,
        answers: Vec<String>,
    ) -> Result<ContestResult, AuthorityError> {
        self.submissions.lock().unwrap().push(answers);
        Ok(ContestResult {
            correct_answers: self.correct_answers.clone(),
        })
    }
}

type SleepHook = Box<dyn FnMut(usize) + Send>;

/// Returns at once and remembers every requested delay
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
    hook: Mutex<Option<SleepHook>>,
}

impl RecordingSleeper {
    /// Run `hook` with the number of sleeps so far on every sleep
    pub fn on_sleep(&self, hook: impl FnMut(usize) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(count);
        }
        tokio::task::yield_now().await;
    }
}

/// Always submits the same answers
pub struct FixedSubGame(pub Vec<String>);

#[async_trait]
impl SubGame for FixedSubGame {
    async fn start(&self, _params: SubGameParams) -> SubGameOutcome {
        SubGameOutcome::Submitted(self.0.clone())
    }
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        search_poll: Duration::from_millis(3_000),
        wait_poll: Duration::from_millis(10_000),
        action_slots: 3,
    }
}

pub fn synchronizer(
    authority: Arc<dyn RemoteAuthority>,
    sleeper: Arc<dyn Sleeper>,
) -> (TurnSynchronizer, mpsc::UnboundedReceiver<SessionEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let sync = TurnSynchronizer::new(
        authority,
        Box::new(MemoryStore::new()),
        sleeper,
        events_tx,
        settings(),
    );
    (sync, events_rx)
}

pub fn session(
    authority: Arc<dyn RemoteAuthority>,
    sleeper: Arc<dyn Sleeper>,
    sub_game: Arc<dyn SubGame>,
) -> (GameSession, mpsc::UnboundedReceiver<SessionEvent>) {
    let (sync, events) = synchronizer(authority, sleeper);
    let resolver = CaptureResolver::new(sub_game, Duration::ZERO);
    (GameSession::new(sync, resolver), events)
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// A running game on a 4×4 board. The local player owns the top-left tile,
/// the opponent the bottom-right one; every other tile is unowned level 1.
pub struct Fixture {
    pub game: GameId,
    pub me: Player,
    pub opponent: Player,
    pub categories: Vec<Category>,
    pub tiles: RawTiles,
}

impl Fixture {
    pub fn new() -> Self {
        let me = Player::new(PlayerId::new_v4(), "Ada");
        let opponent = Player::new(PlayerId::new_v4(), "Grace");
        let categories: Vec<Category> = ["History", "Space", "Food"]
            .into_iter()
            .map(|title| Category::new(CategoryId::new_v4(), title))
            .collect();

        let tiles = (0..4)
            .map(|row| {
                (0..4)
                    .map(|col| {
                        let (owner, level) = match (row, col) {
                            (0, 0) => (Some(me.id), 0),
                            (3, 3) => (Some(opponent.id), 0),
                            _ => (None, 1),
                        };
                        Some(TileState {
                            id: TileId::new_v4(),
                            difficulty: Difficulty::new(level).unwrap(),
                            owner_id: owner,
                            chosen_category_id: None,
                            available_categories: categories.clone(),
                        })
                    })
                    .collect()
            })
            .collect();

        Self {
            game: GameId::new_v4(),
            me,
            opponent,
            categories,
            tiles,
        }
    }

    pub fn tile_at(&self, row: usize, col: usize) -> &TileState {
        self.tiles[row][col].as_ref().unwrap()
    }

    pub fn tile_at_mut(&mut self, row: usize, col: usize) -> &mut TileState {
        self.tiles[row][col].as_mut().unwrap()
    }

    fn snapshot(&self, next: PlayerId) -> GameSnapshot {
        GameSnapshot {
            id: self.game,
            me: self.me.clone(),
            opponent: Some(self.opponent.clone()),
            tiles: self.tiles.clone(),
            next_move_player_id: Some(next),
            awaiting_opponent_to_join: false,
            winning_player_ids: None,
            turns_played: 0,
        }
    }

    pub fn my_turn(&self) -> GameSnapshot {
        self.snapshot(self.me.id)
    }

    pub fn their_turn(&self) -> GameSnapshot {
        self.snapshot(self.opponent.id)
    }

    pub fn awaiting(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.game,
            me: self.me.clone(),
            opponent: None,
            tiles: Vec::new(),
            next_move_player_id: None,
            awaiting_opponent_to_join: true,
            winning_player_ids: None,
            turns_played: 0,
        }
    }

    pub fn finished(&self, winners: Vec<PlayerId>) -> GameSnapshot {
        GameSnapshot {
            winning_player_ids: Some(winners),
            ..self.their_turn()
        }
    }
}
