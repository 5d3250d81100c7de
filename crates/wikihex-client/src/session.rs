//! One player's game session: presentation intents in, events out.
//!
//! The session is a single flow of control. Between intents it runs the
//! synchronizer's waiting loops; while an intent is handled nothing else
//! touches the board.

use crate::authority::AuthorityError;
use crate::resolver::CaptureResolver;
use crate::sync::{CancelToken, TurnSynchronizer};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use wikihex_core::{
    is_legal_move, BoardError, BudgetError, Category, CategoryChoice, CategoryId, ContestError,
    GameId, Intent, PendingContest, SessionEvent, SnapshotError, TileId, TurnState,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("inconsistent game state from authority: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("action budget misuse: {0}")]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Contest(#[from] ContestError),

    #[error("no game in progress")]
    NoGame,

    #[error("game {0} is still in progress")]
    GameInProgress(GameId),

    #[error("it is not the local player's turn")]
    NotMyTurn,
}

impl SessionError {
    /// Fatal errors are bugs or impossible authority data and end the
    /// session. Everything the authority can refuse or fail at is retried
    /// through the presentation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Authority(_))
    }
}

/// How a session gets its game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Continue the game stored from a previous run, if any
    Resume,
    /// Join or open a game against another player
    Matchmaking,
    /// Open a game against the AI
    AiOpponent,
}

pub struct GameSession {
    sync: TurnSynchronizer,
    resolver: CaptureResolver,
    pending: Option<PendingContest>,
    /// Intents read while coalescing refreshes
    backlog: VecDeque<Intent>,
}

impl GameSession {
    pub fn new(sync: TurnSynchronizer, resolver: CaptureResolver) -> Self {
        Self {
            sync,
            resolver,
            pending: None,
            backlog: VecDeque::new(),
        }
    }

    pub fn sync(&self) -> &TurnSynchronizer {
        &self.sync
    }

    pub fn state(&self) -> TurnState {
        self.sync.state()
    }

    /// Token that stops waiting loops; cancelling while matchmaking also
    /// cancels the match
    pub fn cancel_token(&self) -> CancelToken {
        self.sync.cancel_token()
    }

    pub async fn start(&mut self, mode: StartMode) -> Result<TurnState, SessionError> {
        match mode {
            StartMode::Resume => self.sync.resume().await,
            StartMode::Matchmaking => self.sync.start_match(false).await,
            StartMode::AiOpponent => self.sync.start_match(true).await,
        }
    }

    /// Like [`start`](Self::start), but recoverable authority failures are
    /// retried after `retry_delay` until the cancel token is set. Once a game
    /// was entered, retries only refresh it.
    pub async fn start_retrying(
        &mut self,
        mode: StartMode,
        retry_delay: Duration,
    ) -> Result<TurnState, SessionError> {
        let mut mode = mode;
        loop {
            match self.start(mode).await {
                Err(e) if !e.is_fatal() && !self.sync.cancel_token().is_cancelled() => {
                    warn!("Could not start the session, retrying in {:?}: {}", retry_delay, e);
                    if self.sync.game_id().is_some() {
                        mode = StartMode::Resume;
                    }
                    self.sync.sleeper().sleep(retry_delay).await;
                }
                result => return result,
            }
        }
    }

    /// Run the waiting loop that matches the current state, if any
    pub async fn pump(&mut self) -> Result<TurnState, SessionError> {
        match self.sync.state() {
            TurnState::AwaitingMatch => self.sync.await_match().await,
            TurnState::WaitingForOpponent => self.sync.wait_for_turn().await,
            state => Ok(state),
        }
    }

    /// Handle intents until the presentation hangs up or the game is left
    pub async fn run(
        &mut self,
        intents: &mut mpsc::UnboundedReceiver<Intent>,
    ) -> Result<TurnState, SessionError> {
        loop {
            let Some(intent) = self.next_intent(intents).await? else {
                return Ok(self.sync.state());
            };

            let leaving = intent == Intent::Leave;
            let result = if intent == Intent::Refresh {
                self.refresh_coalesced(intents).await
            } else {
                self.handle(intent).await
            };
            if let Err(e) = result {
                absorb(e)?;
            }
            self.drop_stale_selection();

            if leaving && self.sync.game_id().is_none() {
                return Ok(self.sync.state());
            }
            // Acting on an intent resumes any waiting loop that was stopped
            self.sync.cancel_token().reset();
        }
    }

    /// Run the waiting loop of the current state, then hand out the next
    /// intent. While matchmaking, an arriving intent interrupts the search so
    /// that `CancelMatchmaking` and `Leave` are acted on at once.
    async fn next_intent(
        &mut self,
        intents: &mut mpsc::UnboundedReceiver<Intent>,
    ) -> Result<Option<Intent>, SessionError> {
        if self.backlog.is_empty() && self.sync.state() == TurnState::AwaitingMatch {
            let searched = tokio::select! {
                intent = intents.recv() => return Ok(intent),
                result = self.sync.await_match() => result,
            };
            if let Err(e) = searched {
                absorb(e)?;
            }
        }
        if let Err(e) = self.pump().await {
            absorb(e)?;
        }
        self.drop_stale_selection();

        match self.backlog.pop_front() {
            Some(intent) => Ok(Some(intent)),
            None => Ok(intents.recv().await),
        }
    }

    /// A selected tile only stands for the turn it was made in
    fn drop_stale_selection(&mut self) {
        if self.sync.state() != TurnState::MyTurn && self.pending.take().is_some() {
            debug!("Dropped the tile selection, the turn is over");
        }
    }

    /// Refresh once, answering every refresh that queued up meanwhile
    async fn refresh_coalesced(
        &mut self,
        intents: &mut mpsc::UnboundedReceiver<Intent>,
    ) -> Result<(), SessionError> {
        let result = self.refresh().await;
        while let Ok(next) = intents.try_recv() {
            if next == Intent::Refresh {
                debug!("Coalesced a refresh request");
            } else {
                self.backlog.push_back(next);
            }
        }
        result
    }

    pub async fn handle(&mut self, intent: Intent) -> Result<(), SessionError> {
        match intent {
            Intent::SelectTile(tile) => self.select_tile(tile).await,
            Intent::ConfirmCategory(category) => self.confirm_category(category).await,
            Intent::CancelSelection => {
                self.pending = None;
                Ok(())
            }
            Intent::Refresh => self.refresh().await,
            Intent::CancelMatchmaking => {
                if self.sync.state() == TurnState::AwaitingMatch {
                    self.sync.cancel_matchmaking().await?;
                }
                Ok(())
            }
            Intent::Leave => {
                self.pending = None;
                self.sync.leave_game().await.map(|_| ())
            }
        }
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        if self.sync.game_id().is_none() {
            debug!("Nothing to refresh without a game");
            return Ok(());
        }
        let refreshed = self.sync.refresh().await.map(|_| ());
        self.drop_stale_selection();
        refreshed
    }

    /// Tiles outside the legal moves are not selectable; taps on them are
    /// dropped here and never reach the resolver
    async fn select_tile(&mut self, tile: TileId) -> Result<(), SessionError> {
        if self.sync.state() != TurnState::MyTurn || self.sync.budget().is_exhausted() {
            debug!("Ignoring selection of {} outside an own turn", tile);
            return Ok(());
        }
        let Some(view) = self.sync.view() else {
            return Ok(());
        };
        let Some(selected) = view.board.tile(tile) else {
            debug!("Ignoring selection of unknown tile {}", tile);
            return Ok(());
        };
        if !is_legal_move(selected, &view.legal_moves) {
            debug!("Ignoring selection of {}, not a legal move", tile);
            return Ok(());
        }

        let pending = PendingContest::select(selected, &view.legal_moves, view.snapshot.me.id)?;
        match pending.choice.clone() {
            CategoryChoice::Pick(categories) => {
                self.sync
                    .emit(SessionEvent::CategoryChoiceRequired { tile, categories });
                self.pending = Some(pending);
                Ok(())
            }
            CategoryChoice::Fixed(category) => self.resolve(pending, category).await,
        }
    }

    /// A confirm that arrives after the turn moved on is dropped like a
    /// stale tap
    async fn confirm_category(&mut self, category: CategoryId) -> Result<(), SessionError> {
        let Some(pending) = self.pending.take() else {
            debug!("Ignoring category {} without a selected tile", category);
            return Ok(());
        };
        if self.sync.state() != TurnState::MyTurn || self.sync.budget().is_exhausted() {
            debug!("Ignoring category {} outside an own turn", category);
            return Ok(());
        }
        let still_legal = self
            .sync
            .view()
            .is_some_and(|view| view.legal_moves.contains(pending.tile));
        if !still_legal {
            debug!(
                "Ignoring category {}, tile {} is no longer a legal move",
                category, pending.tile
            );
            return Ok(());
        }
        let category = pending.confirm(category)?;
        self.resolve(pending, category).await
    }

    async fn resolve(
        &mut self,
        pending: PendingContest,
        category: Category,
    ) -> Result<(), SessionError> {
        let report = self.resolver.resolve(&mut self.sync, &pending, category).await?;
        debug!(
            "{:?} on {} {}, {} action points left",
            report.intent,
            report.tile,
            if report.passed { "passed" } else { "failed" },
            report.remaining
        );
        Ok(())
    }
}

fn absorb(error: SessionError) -> Result<(), SessionError> {
    if error.is_fatal() {
        error!("Session failed: {}", error);
        Err(error)
    } else {
        warn!("{}", error);
        Ok(())
    }
}
