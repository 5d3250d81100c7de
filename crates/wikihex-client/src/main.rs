//! wikihex client running against the in-process authority.
//!
//! The local player is driven by an auto-player that reacts to session
//! events the way a presentation would, so a full game can be watched in
//! the logs.

use rand::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wikihex_client::{
    BotSubGame, CaptureResolver, ClientConfig, GameSession, JsonFileStore, RoomRules,
    ServerState, StartMode, SyncSettings, TokioSleeper, TurnSynchronizer,
};
use wikihex_core::{
    Difficulty, Intent, Ownership, Player, PlayerId, SessionEvent, TileView, TurnState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    info!("Starting wikihex client as {}...", config.player_name);

    let server = Arc::new(ServerState::new(RoomRules::from(&config)));
    let me = Player::new(PlayerId::new_v4(), config.player_name.clone());
    let authority = Arc::new(server.connect(me.clone()));

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (intents_tx, mut intents_rx) = mpsc::unbounded_channel();

    let sync = TurnSynchronizer::new(
        authority,
        Box::new(JsonFileStore::open(&config.store_path)),
        Arc::new(TokioSleeper),
        events_tx,
        SyncSettings::from(&config),
    );
    let resolver = CaptureResolver::new(
        Arc::new(BotSubGame::new(me.id, config.bot_difficulty)),
        config.result_pause(),
    );
    let mut session = GameSession::new(sync, resolver);

    let auto_player = tokio::spawn(auto_play(events_rx, intents_tx, config.wait_poll()));

    let mut mode = StartMode::Resume;
    loop {
        let state = session.start_retrying(mode, config.wait_poll()).await?;
        if mode == StartMode::Resume && !state.is_terminal() && session.sync().game_id().is_none()
        {
            mode = StartMode::AiOpponent;
            continue;
        }

        // A resumed game that is already over is only cleaned up
        let stale = mode == StartMode::Resume && state.is_terminal();
        let state = session.run(&mut intents_rx).await?;
        info!("Session ended in {:?}", state);
        if !stale {
            break;
        }
        mode = StartMode::AiOpponent;
    }

    drop(session);
    auto_player.await?;
    Ok(())
}

/// Plays the local side: picks tiles, categories and leaves finished games
async fn auto_play(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    intents: mpsc::UnboundedSender<Intent>,
    retry_delay: Duration,
) {
    let mut rng = StdRng::from_entropy();
    let mut tiles: Vec<TileView> = Vec::new();
    let mut my_turn = false;
    let mut remaining = 0;

    while let Some(event) = events.recv().await {
        let intent = match event {
            SessionEvent::BoardRebuilt { tiles: rebuilt } => {
                tiles = rebuilt;
                None
            }
            SessionEvent::BudgetChanged {
                remaining: left,
                slots,
            } => {
                remaining = left;
                // A refill without a state change: the opponent moved between polls
                (my_turn && left == slots)
                    .then(|| pick_tile(&tiles, &mut rng))
                    .flatten()
            }
            SessionEvent::TurnStateChanged(state) => {
                my_turn = state == TurnState::MyTurn;
                my_turn.then(|| pick_tile(&tiles, &mut rng)).flatten()
            }
            SessionEvent::ScoresUpdated {
                scores,
                max_score,
                turns_played,
            } => {
                info!(
                    "Score {} : {} of {} after {} turns",
                    scores.mine, scores.opponent, max_score, turns_played
                );
                (my_turn && remaining > 0)
                    .then(|| pick_tile(&tiles, &mut rng))
                    .flatten()
            }
            SessionEvent::CategoryChoiceRequired { categories, .. } => {
                categories
                    .choose(&mut rng)
                    .map(|category| Intent::ConfirmCategory(category.id))
            }
            SessionEvent::ContestStarted {
                intent, kind, time_budget, ..
            } => {
                info!("{:?} contest: {:?} in {:?}", intent, kind, time_budget);
                None
            }
            SessionEvent::ContestFinished { passed, .. } => {
                info!("Contest {}", if passed { "won" } else { "lost" });
                None
            }
            SessionEvent::ServerUnreachable { message } => {
                warn!("{}, refreshing in {:?}", message, retry_delay);
                tokio::time::sleep(retry_delay).await;
                Some(Intent::Refresh)
            }
            SessionEvent::GameOver(outcome) => {
                info!("Game over: {:?}", outcome);
                Some(Intent::Leave)
            }
            SessionEvent::Left => None,
        };

        if let Some(intent) = intent {
            if intents.send(intent).is_err() {
                break;
            }
        }
    }
}

/// Expand first, then attack, then level up
fn pick_tile(tiles: &[TileView], rng: &mut StdRng) -> Option<Intent> {
    let legal: Vec<&TileView> = tiles.iter().filter(|t| t.is_legal).collect();
    let preferences: [fn(&TileView) -> bool; 3] = [
        |t| t.ownership == Ownership::Unowned,
        |t| t.ownership == Ownership::Opponent,
        |t| t.difficulty < Difficulty::MAX,
    ];
    preferences
        .iter()
        .find_map(|wanted| {
            let matching: Vec<_> = legal.iter().filter(|t| wanted(t)).collect();
            matching.choose(rng).map(|t| t.id)
        })
        .or_else(|| legal.choose(rng).map(|t| t.id))
        .map(Intent::SelectTile)
}
