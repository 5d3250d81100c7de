//! Sub-game presenters: the quiz rounds a contest is played in.
//!
//! The session only knows the [`SubGame`] capability. Which of the three
//! presentations runs is decided by the presenter from
//! [`SubGameParams::task`]'s kind.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use wikihex_core::{Bot, BotDifficulty, PlayerId, SubGameOutcome, SubGameParams};

#[async_trait]
pub trait SubGame: Send + Sync {
    /// Run one round and report what the player submitted
    async fn start(&self, params: SubGameParams) -> SubGameOutcome;
}

#[async_trait]
impl<G: SubGame + ?Sized> SubGame for Arc<G> {
    async fn start(&self, params: SubGameParams) -> SubGameOutcome {
        (**self).start(params).await
    }
}

/// Enforces the round's time budget on any presenter
pub struct TimedSubGame<G> {
    inner: G,
}

impl<G: SubGame> TimedSubGame<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: SubGame> SubGame for TimedSubGame<G> {
    async fn start(&self, params: SubGameParams) -> SubGameOutcome {
        let budget = params.time_budget;
        match tokio::time::timeout(budget, self.inner.start(params)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!("Sub-game ran out of its {:?} budget", budget);
                SubGameOutcome::TimedOut
            }
        }
    }
}

/// Hands rounds to a presentation layer over channels.
///
/// The presentation receives each round's parameters from its
/// [`SubGameFrontend`] and answers with [`SubGameFrontend::submit_answer`].
pub struct ChannelSubGame {
    rounds: mpsc::UnboundedSender<SubGameParams>,
    answers: Mutex<mpsc::UnboundedReceiver<Vec<String>>>,
}

/// The presentation's end of a [`ChannelSubGame`]
pub struct SubGameFrontend {
    pub rounds: mpsc::UnboundedReceiver<SubGameParams>,
    answers: mpsc::UnboundedSender<Vec<String>>,
}

impl SubGameFrontend {
    pub fn submit_answer(&self, answers: Vec<String>) -> bool {
        self.answers.send(answers).is_ok()
    }
}

pub fn channel_sub_game() -> (ChannelSubGame, SubGameFrontend) {
    let (rounds_tx, rounds_rx) = mpsc::unbounded_channel();
    let (answers_tx, answers_rx) = mpsc::unbounded_channel();
    (
        ChannelSubGame {
            rounds: rounds_tx,
            answers: Mutex::new(answers_rx),
        },
        SubGameFrontend {
            rounds: rounds_rx,
            answers: answers_tx,
        },
    )
}

#[async_trait]
impl SubGame for ChannelSubGame {
    async fn start(&self, params: SubGameParams) -> SubGameOutcome {
        let mut answers = self.answers.lock().await;
        // Answers left over from a round that already timed out
        while answers.try_recv().is_ok() {}

        if self.rounds.send(params).is_err() {
            warn!("Sub-game frontend is gone; round counts as timed out");
            return SubGameOutcome::TimedOut;
        }
        match answers.recv().await {
            Some(answers) => SubGameOutcome::Submitted(answers),
            None => SubGameOutcome::TimedOut,
        }
    }
}

/// Lets a [`Bot`] play the rounds
pub struct BotSubGame {
    bot: Mutex<Bot>,
}

impl BotSubGame {
    pub fn new(player: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            bot: Mutex::new(Bot::new(player, difficulty)),
        }
    }

    pub fn from_bot(bot: Bot) -> Self {
        Self {
            bot: Mutex::new(bot),
        }
    }
}

#[async_trait]
impl SubGame for BotSubGame {
    async fn start(&self, params: SubGameParams) -> SubGameOutcome {
        let answers = self.bot.lock().await.answer(&params.task, params.difficulty);
        SubGameOutcome::Submitted(answers)
    }
}
