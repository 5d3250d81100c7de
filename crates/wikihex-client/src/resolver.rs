//! Playing a contest on a selected tile.

use crate::session::SessionError;
use crate::sub_game::{SubGame, TimedSubGame};
use crate::sync::TurnSynchronizer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wikihex_core::{
    BudgetError, Category, ContestError, ContestIntent, PendingContest, SessionEvent,
    SubGameParams, TileId, TurnState,
};

/// What came out of one resolved action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestReport {
    pub tile: TileId,
    pub intent: ContestIntent,
    pub passed: bool,
    /// Action points left after this action
    pub remaining: u8,
    /// State after the follow-up refresh
    pub state: TurnState,
}

/// Runs the sub-game for a selected tile and hands the result to the
/// authority.
///
/// Ownership and difficulty changes are never applied here. After the
/// answer is submitted one action point is spent and the board is refreshed.
pub struct CaptureResolver {
    sub_game: TimedSubGame<Arc<dyn SubGame>>,
    result_pause: Duration,
}

impl CaptureResolver {
    pub fn new(sub_game: Arc<dyn SubGame>, result_pause: Duration) -> Self {
        Self {
            sub_game: TimedSubGame::new(sub_game),
            result_pause,
        }
    }

    pub async fn resolve(
        &self,
        sync: &mut TurnSynchronizer,
        pending: &PendingContest,
        category: Category,
    ) -> Result<ContestReport, SessionError> {
        let game = sync.game_id().ok_or(SessionError::NoGame)?;
        if sync.state() != TurnState::MyTurn {
            return Err(SessionError::NotMyTurn);
        }
        let legal = sync
            .view()
            .is_some_and(|view| view.legal_moves.contains(pending.tile));
        if !legal {
            return Err(ContestError::IllegalMove(pending.tile).into());
        }
        if sync.budget().is_exhausted() {
            return Err(BudgetError::NoBudget.into());
        }

        let task = sync.start_contest(game, pending.tile, category.id).await?;
        info!(
            "{:?} on tile {} in {} ({:?})",
            pending.intent, pending.tile, category.title, task.kind
        );

        let params = SubGameParams::new(task.clone(), category, pending.difficulty);
        sync.emit(SessionEvent::ContestStarted {
            tile: pending.tile,
            intent: pending.intent,
            kind: task.kind,
            time_budget: params.time_budget,
        });

        let answers = self.sub_game.start(params).await.into_answers();
        let result = sync
            .submit_contest_answer(game, task.id, answers.clone())
            .await?;
        let passed = result.passed(&answers);
        sync.emit(SessionEvent::ContestFinished {
            tile: pending.tile,
            passed,
        });

        if !self.result_pause.is_zero() {
            sync.sleeper().sleep(self.result_pause).await;
        }

        let remaining = sync.consume_action()?;
        let state = match sync.refresh().await {
            Ok(state) => state,
            Err(e) if !e.is_fatal() => {
                warn!("Board not refreshed after contest: {}", e);
                sync.state()
            }
            Err(e) => return Err(e),
        };

        Ok(ContestReport {
            tile: pending.tile,
            intent: pending.intent,
            passed,
            remaining,
            state,
        })
    }
}
