//! Turn synchronization with the game authority.
//!
//! The [`TurnSynchronizer`] owns the current snapshot and everything derived
//! from it (board, legal moves, scores) plus the local action budget. It is
//! the only place those are replaced, and it replaces them wholesale:
//! - a fetched snapshot is validated completely before any state changes
//! - whose turn it is comes from the snapshot, never from the budget
//! - waiting loops poll with a fixed delay after each request and check a
//!   [`CancelToken`] between ticks only

use crate::authority::{AuthorityError, RemoteAuthority};
use crate::config::ClientConfig;
use crate::session::SessionError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wikihex_core::budget::RestoreSource;
use wikihex_core::store::{CURRENT_GAME_ID, IS_WAITING_FOR_OPPONENT};
use wikihex_core::{
    compute_scores, game_key, max_score, ActionBudget, Board, CategoryId, ContestId,
    ContestResult, ContestTask, GameId, GameSnapshot, KeyValueStore, LegalMoves, Outcome, Scores,
    SessionEvent, TileId, TileView, TurnState,
};

/// Delay between poll ticks
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared flag that stops a waiting loop at its next poll boundary.
///
/// While matchmaking, cancelling also tears the open game down.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub search_poll: Duration,
    pub wait_poll: Duration,
    pub action_slots: u8,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for SyncSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            search_poll: config.search_poll(),
            wait_poll: config.wait_poll(),
            action_slots: config.action_slots,
        }
    }
}

/// The latest snapshot of a running game and what follows from it
#[derive(Debug, Clone)]
pub struct GameView {
    pub snapshot: GameSnapshot,
    pub board: Board,
    pub legal_moves: LegalMoves,
    pub scores: Scores,
}

pub struct TurnSynchronizer {
    authority: Arc<dyn RemoteAuthority>,
    store: Box<dyn KeyValueStore + Send>,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancelToken,
    events: mpsc::UnboundedSender<SessionEvent>,
    settings: SyncSettings,
    state: TurnState,
    game: Option<GameId>,
    view: Option<GameView>,
    budget: ActionBudget,
}

impl TurnSynchronizer {
    pub fn new(
        authority: Arc<dyn RemoteAuthority>,
        store: Box<dyn KeyValueStore + Send>,
        sleeper: Arc<dyn Sleeper>,
        events: mpsc::UnboundedSender<SessionEvent>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            authority,
            store,
            sleeper,
            cancel: CancelToken::new(),
            events,
            budget: ActionBudget::new(settings.action_slots),
            settings,
            state: TurnState::PreGame,
            game: None,
            view: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.game
    }

    /// Last successfully applied snapshot of a started game
    pub fn view(&self) -> Option<&GameView> {
        self.view.as_ref()
    }

    pub fn budget(&self) -> ActionBudget {
        self.budget
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub(crate) fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Log an authority failure and tell the presentation if it is transient
    pub(crate) fn report(&self, error: &AuthorityError) {
        if error.is_transient() {
            warn!("Authority unreachable: {}", error);
            self.emit(SessionEvent::ServerUnreachable {
                message: error.to_string(),
            });
        } else {
            warn!("Authority refused: {}", error);
        }
    }

    fn set_state(&mut self, next: TurnState) {
        if self.state == next {
            return;
        }
        info!("Turn state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.emit(SessionEvent::TurnStateChanged(next));
        if let TurnState::GameOver(outcome) = next {
            self.emit(SessionEvent::GameOver(outcome));
        }
    }

    fn emit_budget(&self) {
        self.emit(SessionEvent::BudgetChanged {
            remaining: self.budget.remaining(),
            slots: self.budget.slots(),
        });
    }

    /// Pick the game up where a previous run left it
    pub async fn resume(&mut self) -> Result<TurnState, SessionError> {
        let Some(raw) = self.store.get(CURRENT_GAME_ID) else {
            debug!("No game to resume");
            return Ok(self.state);
        };
        let Ok(game) = GameId::parse(&raw) else {
            warn!("Dropping unreadable current game id {:?}", raw);
            self.store.remove(CURRENT_GAME_ID);
            return Ok(self.state);
        };

        info!("Resuming game {}", game);
        self.game = Some(game);
        self.refresh().await
    }

    /// Open a game, against the AI or whoever joins
    pub async fn start_match(&mut self, ai_opponent: bool) -> Result<TurnState, SessionError> {
        if let Some(game) = self.game {
            return Err(SessionError::GameInProgress(game));
        }

        let created = if ai_opponent {
            self.authority.create_game_with_ai_opponent().await
        } else {
            self.authority.create_or_join_game().await
        };
        let game = created.map_err(|e| {
            self.report(&e);
            e
        })?;

        info!("Entered game {}", game);
        self.game = Some(game);
        self.store.set(CURRENT_GAME_ID, game.to_string());
        ActionBudget::new(self.settings.action_slots).persist(&mut *self.store, game);
        self.refresh().await
    }

    /// Fetch and apply the current snapshot.
    ///
    /// A deleted game is not an error: mid-game it means the opponent
    /// conceded. Transient failures keep the last board and are reported.
    pub async fn refresh(&mut self) -> Result<TurnState, SessionError> {
        let game = self.game.ok_or(SessionError::NoGame)?;
        match self.authority.fetch_current_state(game).await {
            Ok(Some(snapshot)) => self.apply_snapshot(snapshot),
            Ok(None) | Err(AuthorityError::GameNotFound(_)) => Ok(self.game_vanished(game)),
            Err(e) => {
                self.report(&e);
                Err(e.into())
            }
        }
    }

    fn game_vanished(&mut self, game: GameId) -> TurnState {
        let state = self.state;
        match state {
            TurnState::GameOver(_) => {}
            TurnState::AwaitingMatch => {
                info!("Game {} closed before an opponent joined", game);
                self.forget_game(game);
                self.set_state(TurnState::PreGame);
            }
            TurnState::PreGame
                if self.store.get(&game_key(game, IS_WAITING_FOR_OPPONENT)).is_some() =>
            {
                info!("Game {} closed before an opponent joined", game);
                self.forget_game(game);
            }
            TurnState::PreGame | TurnState::MyTurn | TurnState::WaitingForOpponent => {
                info!("Game {} is gone, opponent conceded", game);
                self.store.clear_game(game);
                self.set_state(TurnState::GameOver(Outcome::OpponentConceded));
            }
        }
        self.state
    }

    /// Replace everything derived from the previous snapshot.
    ///
    /// Validation happens first, so a bad snapshot leaves the last good board
    /// in place.
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> Result<TurnState, SessionError> {
        snapshot.validate()?;
        let outcome = snapshot.outcome()?;
        let game = snapshot.id;
        // The opponent can move between two polls; a changed turn count still
        // marks a new turn of ours
        let turn_advanced = self
            .view
            .as_ref()
            .is_some_and(|view| view.snapshot.turns_played != snapshot.turns_played);

        let next = if snapshot.awaiting_opponent_to_join {
            TurnState::AwaitingMatch
        } else if let Some(outcome) = outcome {
            TurnState::GameOver(outcome)
        } else if snapshot.is_my_turn() {
            TurnState::MyTurn
        } else {
            TurnState::WaitingForOpponent
        };

        let view = if next == TurnState::AwaitingMatch {
            None
        } else {
            let board = snapshot.board()?;
            let me = snapshot.me.id;
            let legal_moves = board.legal_moves(me);
            let scores = compute_scores(&board, me, snapshot.opponent_id());
            Some(GameView {
                snapshot,
                board,
                legal_moves,
                scores,
            })
        };

        let waiting_key = game_key(game, IS_WAITING_FOR_OPPONENT);
        match next {
            TurnState::AwaitingMatch => self.store.set_int(&waiting_key, 1),
            _ if self.store.get(&waiting_key).is_some() => self.store.remove(&waiting_key),
            _ => {}
        }

        if let Some(view) = &view {
            self.emit(SessionEvent::BoardRebuilt {
                tiles: TileView::from_board(&view.board, view.snapshot.me.id, &view.legal_moves),
            });
            self.emit(SessionEvent::ScoresUpdated {
                scores: view.scores,
                max_score: max_score(&view.board),
                turns_played: view.snapshot.turns_played,
            });
        }

        match next {
            TurnState::MyTurn if self.state != TurnState::MyTurn || turn_advanced => {
                self.enter_my_turn(game)
            }
            TurnState::GameOver(_) => self.store.clear_game(game),
            _ => {}
        }

        self.view = view;
        self.set_state(next);
        Ok(next)
    }

    /// Entering a turn refills the budget. A client that starts up in the
    /// middle of its own turn restores what it had left instead.
    fn enter_my_turn(&mut self, game: GameId) {
        let slots = self.settings.action_slots;
        if self.state != TurnState::PreGame {
            self.budget = ActionBudget::new(slots);
            self.budget.persist(&mut *self.store, game);
            self.emit_budget();
            return;
        }

        let (mut budget, source) = ActionBudget::restore(&mut *self.store, game, slots);
        match source {
            RestoreSource::Persisted if budget.is_exhausted() => {
                // Spent in a turn whose handoff was never observed
                debug!("Budget of game {} was spent in an earlier turn", game);
                budget.reset_for_new_turn();
                budget.persist(&mut *self.store, game);
            }
            RestoreSource::Persisted => {}
            RestoreSource::DefaultedFull { attempt } => {
                warn!("Action budget of game {} unreadable, defaulted to full ({})", game, attempt);
            }
            RestoreSource::GaveUp => {
                warn!("Action budget of game {} keeps failing to load, treating it as spent", game);
            }
        }
        self.budget = budget;
        self.emit_budget();
    }

    /// Spend one action point and persist it right away
    pub fn consume_action(&mut self) -> Result<u8, SessionError> {
        let game = self.game.ok_or(SessionError::NoGame)?;
        let remaining = self.budget.consume_one()?;
        self.budget.persist(&mut *self.store, game);
        self.emit_budget();
        Ok(remaining)
    }

    pub(crate) async fn start_contest(
        &self,
        game: GameId,
        tile: TileId,
        category: CategoryId,
    ) -> Result<ContestTask, SessionError> {
        self.authority
            .start_contest(game, tile, category)
            .await
            .map_err(|e| {
                self.report(&e);
                e.into()
            })
    }

    pub(crate) async fn submit_contest_answer(
        &self,
        game: GameId,
        contest: ContestId,
        answers: Vec<String>,
    ) -> Result<ContestResult, SessionError> {
        self.authority
            .submit_contest_answer(game, contest, answers)
            .await
            .map_err(|e| {
                self.report(&e);
                e.into()
            })
    }

    /// One poll; only fatal errors stop the loop
    async fn poll_tick(&mut self) -> Result<(), SessionError> {
        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(e) if !e.is_fatal() => {
                debug!("Poll failed, trying again next tick: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until an opponent has joined.
    ///
    /// Cancelling deletes the open game and returns to [`TurnState::PreGame`].
    pub async fn await_match(&mut self) -> Result<TurnState, SessionError> {
        while self.state == TurnState::AwaitingMatch {
            if self.cancel.is_cancelled() {
                return self.cancel_matchmaking().await;
            }
            self.sleeper.sleep(self.settings.search_poll).await;
            if self.cancel.is_cancelled() {
                return self.cancel_matchmaking().await;
            }
            self.poll_tick().await?;
        }
        Ok(self.state)
    }

    /// Poll until the opponent has finished their turn, the game ends or the
    /// token is cancelled
    pub async fn wait_for_turn(&mut self) -> Result<TurnState, SessionError> {
        while self.state == TurnState::WaitingForOpponent {
            if self.cancel.is_cancelled() {
                debug!("Stopped waiting for the opponent");
                break;
            }
            self.sleeper.sleep(self.settings.wait_poll).await;
            if self.cancel.is_cancelled() {
                debug!("Stopped waiting for the opponent");
                break;
            }
            self.poll_tick().await?;
        }
        Ok(self.state)
    }

    /// Stop searching for an opponent and delete the open game
    pub async fn cancel_matchmaking(&mut self) -> Result<TurnState, SessionError> {
        let game = self.game.ok_or(SessionError::NoGame)?;
        self.delete_remote(game).await?;

        info!("Cancelled matchmaking for game {}", game);
        self.forget_game(game);
        self.cancel.reset();
        self.set_state(TurnState::PreGame);
        Ok(self.state)
    }

    /// Leave the current game. A running game is conceded; a finished one is
    /// only deleted.
    pub async fn leave_game(&mut self) -> Result<TurnState, SessionError> {
        let Some(game) = self.game else {
            return Ok(self.state);
        };
        self.delete_remote(game).await?;

        if self.state.is_terminal() {
            info!("Left finished game {}", game);
        } else {
            info!("Conceded game {}", game);
        }
        self.forget_game(game);
        self.set_state(TurnState::PreGame);
        self.emit(SessionEvent::Left);
        Ok(self.state)
    }

    async fn delete_remote(&self, game: GameId) -> Result<(), SessionError> {
        match self.authority.delete_game(game).await {
            Ok(()) | Err(AuthorityError::GameNotFound(_)) => Ok(()),
            Err(e) => {
                self.report(&e);
                Err(e.into())
            }
        }
    }

    fn forget_game(&mut self, game: GameId) {
        self.store.clear_game(game);
        self.store.remove(CURRENT_GAME_ID);
        self.game = None;
        self.view = None;
        self.budget = ActionBudget::new(self.settings.action_slots);
    }
}
