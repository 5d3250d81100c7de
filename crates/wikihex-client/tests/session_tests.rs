//! Session scenarios against scripted and in-process authorities.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wikihex_client::{
    AuthorityError, BotSubGame, RoomRules, ServerState, SessionError, StartMode, TokioSleeper,
    TurnSynchronizer,
};
use wikihex_core::store::{CURRENT_GAME_ID, IS_WAITING_FOR_OPPONENT, REMAINING_ACTION_POINTS};
use wikihex_core::{
    game_key, BotDifficulty, Intent, KeyValueStore, MemoryStore, Outcome, Player, PlayerId,
    Scores, SessionEvent, SnapshotError, TurnState,
};

fn scripted(fixture: &Fixture) -> Arc<ScriptedAuthority> {
    Arc::new(ScriptedAuthority::new(fixture.game))
}

#[tokio::test]
async fn test_opponent_conceding_mid_wait_ends_the_game() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.their_turn());
    authority.push_snapshot(fixture.their_turn());
    authority.push(Ok(None));
    let sleeper = Arc::new(RecordingSleeper::default());
    let (mut sync, mut events) = synchronizer(authority.clone(), sleeper.clone());

    assert_eq!(
        sync.start_match(true).await.unwrap(),
        TurnState::WaitingForOpponent
    );
    let state = sync.wait_for_turn().await.unwrap();

    assert_eq!(state, TurnState::GameOver(Outcome::OpponentConceded));
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(10_000); 2]);
    assert!(drain(&mut events).contains(&SessionEvent::GameOver(Outcome::OpponentConceded)));
}

#[tokio::test]
async fn test_turn_handoff_refills_budget() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut sync, _events) = synchronizer(authority, Arc::new(RecordingSleeper::default()));

    assert_eq!(sync.start_match(true).await.unwrap(), TurnState::MyTurn);
    assert_eq!(sync.budget().remaining(), 3);
    sync.consume_action().unwrap();
    assert_eq!(sync.consume_action().unwrap(), 1);

    sync.apply_snapshot(fixture.their_turn()).unwrap();
    assert_eq!(sync.state(), TurnState::WaitingForOpponent);
    // Remaining points are not what decides the turn
    assert_eq!(sync.budget().remaining(), 1);

    sync.apply_snapshot(fixture.my_turn()).unwrap();
    assert_eq!(sync.state(), TurnState::MyTurn);
    assert_eq!(sync.budget().remaining(), 3);
}

#[tokio::test]
async fn test_unseen_opponent_turn_still_refills_budget() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut sync, _events) = synchronizer(authority, Arc::new(RecordingSleeper::default()));

    sync.start_match(true).await.unwrap();
    for _ in 0..3 {
        sync.consume_action().unwrap();
    }
    assert!(sync.budget().is_exhausted());

    let mut next_turn = fixture.my_turn();
    next_turn.turns_played = 1;
    sync.apply_snapshot(next_turn).unwrap();
    assert_eq!(sync.budget().remaining(), 3);
}

#[tokio::test]
async fn test_winner_lists_map_to_outcomes() {
    let fixture = Fixture::new();
    let cases = [
        (vec![fixture.me.id], Outcome::Win),
        (vec![fixture.opponent.id], Outcome::Loss),
        (vec![fixture.me.id, fixture.opponent.id], Outcome::Draw),
    ];

    for (winners, expected) in cases {
        let authority = scripted(&fixture);
        authority.push_snapshot(fixture.finished(winners));
        let (mut sync, mut events) =
            synchronizer(authority, Arc::new(RecordingSleeper::default()));

        assert_eq!(
            sync.start_match(true).await.unwrap(),
            TurnState::GameOver(expected)
        );
        assert!(drain(&mut events).contains(&SessionEvent::GameOver(expected)));
    }
}

#[tokio::test]
async fn test_illegal_winner_list_keeps_last_state() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.their_turn());
    let (mut sync, _events) = synchronizer(authority, Arc::new(RecordingSleeper::default()));
    sync.start_match(true).await.unwrap();

    let stranger = PlayerId::new_v4();
    let result = sync.apply_snapshot(fixture.finished(vec![stranger]));

    assert!(matches!(
        result,
        Err(SessionError::Snapshot(SnapshotError::IllegalWinners(_)))
    ));
    assert!(result.unwrap_err().is_fatal());
    assert_eq!(sync.state(), TurnState::WaitingForOpponent);
    assert!(sync.view().is_some());
}

#[tokio::test]
async fn test_cancelling_matchmaking_deletes_the_game() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.awaiting());
    let sleeper = Arc::new(RecordingSleeper::default());
    let (mut sync, mut events) = synchronizer(authority.clone(), sleeper.clone());

    assert_eq!(
        sync.start_match(false).await.unwrap(),
        TurnState::AwaitingMatch
    );
    let token = sync.cancel_token();
    sleeper.on_sleep(move |count| {
        if count == 2 {
            token.cancel();
        }
    });

    let state = sync.await_match().await.unwrap();

    assert_eq!(state, TurnState::PreGame);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(3_000); 2]);
    assert_eq!(*authority.deleted.lock().unwrap(), vec![fixture.game]);
    assert_eq!(sync.game_id(), None);
    assert_eq!(sync.store().get(CURRENT_GAME_ID), None);
    assert!(!sync.cancel_token().is_cancelled());
    assert!(drain(&mut events).contains(&SessionEvent::TurnStateChanged(TurnState::PreGame)));
}

#[tokio::test]
async fn test_network_failure_keeps_the_board() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    authority.push(Err(AuthorityError::Network("timeout".into())));
    let (mut sync, mut events) =
        synchronizer(authority.clone(), Arc::new(RecordingSleeper::default()));

    sync.start_match(true).await.unwrap();
    let before = sync.view().unwrap().board.tile_count();
    drain(&mut events);

    let err = sync.refresh().await.unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(sync.state(), TurnState::MyTurn);
    assert_eq!(sync.view().unwrap().board.tile_count(), before);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [SessionEvent::ServerUnreachable { .. }]
    ));
}

#[tokio::test]
async fn test_resume_restores_spent_budget() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut sync, _events) = synchronizer(authority.clone(), Arc::new(RecordingSleeper::default()));
    sync.start_match(true).await.unwrap();
    sync.consume_action().unwrap();

    // Same store, new synchronizer: a restart in the middle of the turn
    let mut copy = MemoryStore::new();
    for key in [
        CURRENT_GAME_ID.to_string(),
        game_key(fixture.game, REMAINING_ACTION_POINTS),
    ] {
        if let Some(value) = sync.store().get(&key) {
            copy.set(&key, value);
        }
    }
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let mut restarted = TurnSynchronizer::new(
        authority,
        Box::new(copy),
        Arc::new(RecordingSleeper::default()),
        events_tx,
        settings(),
    );

    assert_eq!(restarted.resume().await.unwrap(), TurnState::MyTurn);
    assert_eq!(restarted.budget().remaining(), 2);
}

#[tokio::test]
async fn test_fresh_capture_scores_two() {
    let mut fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let target = fixture.tile_at(0, 1).id;
    let category = fixture.categories[1].clone();
    {
        let my_id = fixture.me.id;
        let tile = fixture.tile_at_mut(0, 1);
        tile.owner_id = Some(my_id);
        tile.chosen_category_id = Some(category.id);
    }
    authority.push_snapshot(fixture.my_turn());

    let (mut session, mut events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(vec!["1415".into()])),
    );
    session.start(StartMode::AiOpponent).await.unwrap();
    drain(&mut events);

    session.handle(Intent::SelectTile(target)).await.unwrap();
    let offered = drain(&mut events);
    assert!(matches!(
        offered.as_slice(),
        [SessionEvent::CategoryChoiceRequired { tile, .. }] if *tile == target
    ));
    assert!(authority.contests.lock().unwrap().is_empty());

    session
        .handle(Intent::ConfirmCategory(category.id))
        .await
        .unwrap();
    let seen = drain(&mut events);

    assert_eq!(*authority.contests.lock().unwrap(), vec![(target, category.id)]);
    assert!(seen.contains(&SessionEvent::ContestFinished {
        tile: target,
        passed: true
    }));
    assert!(seen.contains(&SessionEvent::BudgetChanged {
        remaining: 2,
        slots: 3
    }));
    assert_eq!(
        session.sync().view().unwrap().scores,
        Scores {
            mine: 3,
            opponent: 1
        }
    );
}

#[tokio::test]
async fn test_selections_outside_legal_moves_are_ignored() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut session, mut events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(vec!["1415".into()])),
    );
    session.start(StartMode::AiOpponent).await.unwrap();
    drain(&mut events);

    // Far corner, next to the opponent only
    let far = fixture.tile_at(3, 2).id;
    session.handle(Intent::SelectTile(far)).await.unwrap();

    assert!(drain(&mut events).is_empty());
    assert!(authority.contests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_requests_are_coalesced() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut session, _events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(Vec::new())),
    );
    session.start(StartMode::AiOpponent).await.unwrap();
    assert_eq!(authority.fetches(), 1);

    let (intents_tx, mut intents_rx) = mpsc::unbounded_channel();
    for _ in 0..4 {
        intents_tx.send(Intent::Refresh).unwrap();
    }
    drop(intents_tx);

    assert_eq!(session.run(&mut intents_rx).await.unwrap(), TurnState::MyTurn);
    assert_eq!(authority.fetches(), 2);
}

#[tokio::test]
async fn test_leaving_concedes_and_clears() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut session, mut events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(Vec::new())),
    );
    session.start(StartMode::AiOpponent).await.unwrap();
    drain(&mut events);

    let (intents_tx, mut intents_rx) = mpsc::unbounded_channel();
    intents_tx.send(Intent::Leave).unwrap();

    assert_eq!(session.run(&mut intents_rx).await.unwrap(), TurnState::PreGame);
    assert_eq!(*authority.deleted.lock().unwrap(), vec![fixture.game]);
    assert_eq!(session.sync().store().get(CURRENT_GAME_ID), None);
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::TurnStateChanged(TurnState::PreGame),
            SessionEvent::Left
        ]
    );
}

#[tokio::test]
async fn test_full_game_against_ai() {
    let rules = RoomRules {
        board_size: 6,
        max_turns: 2,
        contests_per_turn: 3,
        bot_difficulty: BotDifficulty::Medium,
    };
    let server = Arc::new(ServerState::new(rules));
    let me = Player::new(PlayerId::new_v4(), "Ada");
    let authority = Arc::new(server.connect(me.clone()));
    let (mut session, _events) = session(
        authority,
        Arc::new(RecordingSleeper::default()),
        Arc::new(BotSubGame::new(me.id, BotDifficulty::Hard)),
    );

    session.start(StartMode::AiOpponent).await.unwrap();
    for _ in 0..100 {
        match session.pump().await.unwrap() {
            TurnState::GameOver(_) => break,
            TurnState::MyTurn => {
                let view = session.sync().view().unwrap();
                let tile = view
                    .legal_moves
                    .iter()
                    .filter_map(|id| view.board.tile(id))
                    .min_by_key(|tile| tile.owner_id.is_some())
                    .unwrap();
                let (id, category) = (tile.id, tile.available_categories[0].id);
                let needs_category = tile.chosen_category_id.is_none();

                session.handle(Intent::SelectTile(id)).await.unwrap();
                if needs_category {
                    session
                        .handle(Intent::ConfirmCategory(category))
                        .await
                        .unwrap();
                }
            }
            state => panic!("unexpected state {:?}", state),
        }
    }

    let TurnState::GameOver(outcome) = session.state() else {
        panic!("game did not finish: {:?}", session.state());
    };
    assert_ne!(outcome, Outcome::OpponentConceded);
    assert!(session.sync().game_id().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_waiting_polls_until_the_turn_comes_back() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    let (mut sync, mut events) = synchronizer(authority.clone(), Arc::new(TokioSleeper));
    sync.start_match(true).await.unwrap();
    sync.consume_action().unwrap();
    sync.consume_action().unwrap();
    sync.apply_snapshot(fixture.their_turn()).unwrap();
    authority.push_snapshot(fixture.their_turn());
    authority.push_snapshot(fixture.my_turn());
    drain(&mut events);

    let started = tokio::time::Instant::now();
    assert_eq!(sync.wait_for_turn().await.unwrap(), TurnState::MyTurn);

    assert!(started.elapsed() >= Duration::from_millis(20_000));
    assert_eq!(authority.fetches(), 3);
    assert_eq!(sync.budget().remaining(), 3);
    assert_eq!(
        sync.store().get_int(&game_key(fixture.game, REMAINING_ACTION_POINTS)),
        Some(3)
    );
    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|event| matches!(event, SessionEvent::BoardRebuilt { .. })));
    assert!(seen.contains(&SessionEvent::BudgetChanged {
        remaining: 3,
        slots: 3
    }));
    assert_eq!(
        seen.last(),
        Some(&SessionEvent::TurnStateChanged(TurnState::MyTurn))
    );
}

#[tokio::test(start_paused = true)]
async fn test_waiting_ends_when_winners_appear() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.their_turn());
    authority.push_snapshot(fixture.their_turn());
    authority.push_snapshot(fixture.finished(vec![fixture.me.id]));
    let (mut sync, mut events) = synchronizer(authority.clone(), Arc::new(TokioSleeper));

    sync.start_match(true).await.unwrap();
    let state = sync.wait_for_turn().await.unwrap();

    assert_eq!(state, TurnState::GameOver(Outcome::Win));
    assert_eq!(authority.fetches(), 3);
    assert_eq!(
        sync.store().get(&game_key(fixture.game, REMAINING_ACTION_POINTS)),
        None
    );
    // The game stays current until it is left
    assert_eq!(sync.game_id(), Some(fixture.game));
    assert!(drain(&mut events).contains(&SessionEvent::GameOver(Outcome::Win)));
}

#[tokio::test]
async fn test_cancelled_wait_stops_without_touching_the_store() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.their_turn());
    let sleeper = Arc::new(RecordingSleeper::default());
    let (mut sync, _events) = synchronizer(authority.clone(), sleeper.clone());
    sync.start_match(true).await.unwrap();

    let budget_key = game_key(fixture.game, REMAINING_ACTION_POINTS);
    let stored = (sync.store().get(CURRENT_GAME_ID), sync.store().get(&budget_key));
    let token = sync.cancel_token();
    sleeper.on_sleep(move |count| {
        if count == 1 {
            token.cancel();
        }
    });

    assert_eq!(
        sync.wait_for_turn().await.unwrap(),
        TurnState::WaitingForOpponent
    );
    assert_eq!(authority.fetches(), 1);
    assert!(authority.deleted.lock().unwrap().is_empty());
    assert_eq!(sync.game_id(), Some(fixture.game));
    assert_eq!(
        (sync.store().get(CURRENT_GAME_ID), sync.store().get(&budget_key)),
        stored
    );
}

#[tokio::test]
async fn test_failed_poll_keeps_waiting_on_the_same_board() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.their_turn());
    authority.push(Err(AuthorityError::Network("timeout".into())));
    let sleeper = Arc::new(RecordingSleeper::default());
    let (mut sync, mut events) = synchronizer(authority.clone(), sleeper.clone());
    sync.start_match(true).await.unwrap();
    let before = sync.view().unwrap().board.tile_count();
    drain(&mut events);

    // Stop at the second tick, after the failed one
    let token = sync.cancel_token();
    sleeper.on_sleep(move |count| {
        if count == 2 {
            token.cancel();
        }
    });

    assert_eq!(
        sync.wait_for_turn().await.unwrap(),
        TurnState::WaitingForOpponent
    );
    assert_eq!(authority.fetches(), 2);
    assert_eq!(sleeper.sleeps().len(), 2);
    assert_eq!(sync.view().unwrap().board.tile_count(), before);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [SessionEvent::ServerUnreachable { .. }]
    ));
}

#[tokio::test]
async fn test_match_found_by_polling() {
    let fixture = Fixture::new();
    let cases = [
        (fixture.my_turn(), TurnState::MyTurn),
        (fixture.their_turn(), TurnState::WaitingForOpponent),
    ];

    for (joined, expected) in cases {
        let authority = scripted(&fixture);
        authority.push_snapshot(fixture.awaiting());
        authority.push_snapshot(fixture.awaiting());
        authority.push_snapshot(joined);
        let sleeper = Arc::new(RecordingSleeper::default());
        let (mut sync, _events) = synchronizer(authority.clone(), sleeper.clone());
        let waiting_key = game_key(fixture.game, IS_WAITING_FOR_OPPONENT);

        assert_eq!(
            sync.start_match(false).await.unwrap(),
            TurnState::AwaitingMatch
        );
        assert!(sync.store().get(&waiting_key).is_some());

        assert_eq!(sync.await_match().await.unwrap(), expected);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(3_000); 2]);
        assert_eq!(sync.store().get(&waiting_key), None);
        assert!(sync.view().is_some());
        assert_eq!(sync.budget().remaining(), 3);
    }
}

#[tokio::test]
async fn test_game_closed_while_searching_returns_to_pregame() {
    let fixture = Fixture::new();
    let cases = [Ok(None), Err(AuthorityError::GameNotFound(fixture.game))];

    for vanished in cases {
        let authority = scripted(&fixture);
        authority.push_snapshot(fixture.awaiting());
        authority.push(vanished);
        let (mut sync, mut events) =
            synchronizer(authority.clone(), Arc::new(RecordingSleeper::default()));
        sync.start_match(false).await.unwrap();

        assert_eq!(sync.await_match().await.unwrap(), TurnState::PreGame);
        assert_eq!(sync.game_id(), None);
        assert_eq!(sync.store().get(CURRENT_GAME_ID), None);
        assert_eq!(
            sync.store().get(&game_key(fixture.game, IS_WAITING_FOR_OPPONENT)),
            None
        );
        assert!(authority.deleted.lock().unwrap().is_empty());
        assert!(!drain(&mut events)
            .iter()
            .any(|event| matches!(event, SessionEvent::GameOver(_))));
    }
}

#[tokio::test]
async fn test_category_confirm_after_concede_is_dropped() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    authority.push(Ok(None));
    let (mut session, mut events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(vec!["1415".into()])),
    );
    session.start(StartMode::AiOpponent).await.unwrap();
    drain(&mut events);

    let (intents_tx, mut intents_rx) = mpsc::unbounded_channel();
    intents_tx
        .send(Intent::SelectTile(fixture.tile_at(0, 1).id))
        .unwrap();
    intents_tx.send(Intent::Refresh).unwrap();
    intents_tx
        .send(Intent::ConfirmCategory(fixture.categories[0].id))
        .unwrap();
    drop(intents_tx);

    let state = session.run(&mut intents_rx).await.unwrap();

    assert_eq!(state, TurnState::GameOver(Outcome::OpponentConceded));
    assert!(authority.contests.lock().unwrap().is_empty());
    assert!(drain(&mut events).contains(&SessionEvent::GameOver(Outcome::OpponentConceded)));
}

#[tokio::test]
async fn test_category_confirm_after_handoff_is_dropped() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.my_turn());
    authority.push_snapshot(fixture.their_turn());
    let (mut session, _events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(vec!["1415".into()])),
    );
    session.start(StartMode::AiOpponent).await.unwrap();

    session
        .handle(Intent::SelectTile(fixture.tile_at(0, 1).id))
        .await
        .unwrap();
    session.handle(Intent::Refresh).await.unwrap();
    assert_eq!(session.state(), TurnState::WaitingForOpponent);

    session
        .handle(Intent::ConfirmCategory(fixture.categories[0].id))
        .await
        .unwrap();
    assert!(authority.contests.lock().unwrap().is_empty());

    // The selection does not survive into the next turn either
    authority.push_snapshot(fixture.my_turn());
    session.handle(Intent::Refresh).await.unwrap();
    session
        .handle(Intent::ConfirmCategory(fixture.categories[0].id))
        .await
        .unwrap();
    assert!(authority.contests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_intent_interrupts_matchmaking() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push_snapshot(fixture.awaiting());
    let (mut session, mut events) = session(
        authority.clone(),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedSubGame(Vec::new())),
    );
    assert_eq!(
        session.start(StartMode::Matchmaking).await.unwrap(),
        TurnState::AwaitingMatch
    );

    let (intents_tx, mut intents_rx) = mpsc::unbounded_channel();
    intents_tx.send(Intent::CancelMatchmaking).unwrap();
    drop(intents_tx);

    assert_eq!(session.run(&mut intents_rx).await.unwrap(), TurnState::PreGame);
    assert_eq!(*authority.deleted.lock().unwrap(), vec![fixture.game]);
    assert_eq!(session.sync().game_id(), None);
    assert!(drain(&mut events).contains(&SessionEvent::TurnStateChanged(TurnState::PreGame)));
}

#[tokio::test]
async fn test_start_retries_after_network_failure() {
    let fixture = Fixture::new();
    let authority = scripted(&fixture);
    authority.push(Err(AuthorityError::Network("timeout".into())));
    authority.push_snapshot(fixture.my_turn());
    let sleeper = Arc::new(RecordingSleeper::default());
    let (mut session, mut events) = session(
        authority.clone(),
        sleeper.clone(),
        Arc::new(FixedSubGame(Vec::new())),
    );

    let state = session
        .start_retrying(StartMode::AiOpponent, Duration::from_millis(5_000))
        .await
        .unwrap();

    assert_eq!(state, TurnState::MyTurn);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(5_000)]);
    assert_eq!(authority.fetches(), 2);
    assert_eq!(session.sync().game_id(), Some(fixture.game));
    assert_eq!(session.sync().budget().remaining(), 3);
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, SessionEvent::ServerUnreachable { .. })));
}
