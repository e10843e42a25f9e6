//! Round flow: starting games, predictions, answers, and the phase timers
//! that force the game forward when players stall.
//!
//! Timer expiries re-enter through the same per-room lock as player actions
//! and re-check the `(round, phase)` they were armed for, so a fire that
//! raced a cancellation is a no-op.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        events::{PredictionsProgressEvent, ScoreUpdateSummary, ScoringResultsEvent},
        game::{QuestionSummary, RoomSummary},
    },
    error::ServiceError,
    services::{events, room_service},
    state::{
        SharedState,
        engine::{self, RoundOutcome, ScoringOutcome},
        room::{Choice, Room, RoomPhase},
        timers::TimerKey,
    },
};

/// Host-only: start the game and open round one.
pub async fn start_game(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
) -> Result<RoomSummary, ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = room_service::load_room(state, code).await?;
    engine::start_game(&mut room, player_id)?;
    let question = open_round(state, &mut room)?;
    room_service::persist_room(state, &room).await?;

    events::broadcast_room_state(state, &room);
    events::broadcast_round_started(state, &room, question);
    arm_phase_timer(state, &room);
    info!(room = code, starter = %player_id, rounds = room.total_rounds, "game started");
    Ok(RoomSummary::from(&room))
}

/// Record a predictor's guess; closes the window when the last one is in.
pub async fn submit_prediction(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
    choice: Choice,
) -> Result<PredictionsProgressEvent, ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = room_service::load_room(state, code).await?;
    let received = engine::submit_prediction(&mut room, player_id, choice)?;
    let expected = room.expected_predictions();
    let all_in = received == expected;
    if all_in {
        engine::close_predictions(&mut room);
    }
    room_service::persist_room(state, &room).await?;

    events::broadcast_predictions_progress(state, &room, received);
    if all_in {
        state.timers().cancel(code);
        events::broadcast_answering_phase(state, &room);
        arm_phase_timer(state, &room);
    }
    Ok(PredictionsProgressEvent {
        round_number: room.current_round,
        received,
        expected,
    })
}

/// Record the answerer's choice and resolve the round.
pub async fn submit_answer(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
    choice: Choice,
) -> Result<ScoringResultsEvent, ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = room_service::load_room(state, code).await?;
    let outcome = engine::submit_answer(&mut room, player_id, choice)?;
    room_service::persist_room(state, &room).await?;

    // Cancel only after the save: a failed persist leaves the answering
    // deadline armed so the round cannot stall.
    state.timers().cancel(code);
    events::broadcast_scoring_results(state, &room, &outcome);
    arm_phase_timer(state, &room);
    info!(room = code, round = outcome.round_number, "round resolved");
    Ok(scoring_response(&room, outcome))
}

/// Prediction window elapsed: close predictions with whoever is in.
pub async fn handle_prediction_timeout(state: SharedState, code: String, round: u32) {
    let _guard = state.locks().acquire(&code).await;
    let Some(mut room) = reload_for_timer(&state, &code, round, RoomPhase::Predicting).await else {
        return;
    };
    engine::close_predictions(&mut room);
    if room_service::persist_room(&state, &room).await.is_err() {
        warn!(room = %code, round, "prediction timeout not applied, save failed");
        return;
    }
    info!(room = %code, round, "prediction window timed out");
    events::broadcast_answering_phase(&state, &room);
    arm_phase_timer(&state, &room);
}

/// Answer window elapsed: inject the default choice for the answerer. This
/// also resolves rounds whose answerer left mid-game.
pub async fn handle_answer_timeout(state: SharedState, code: String, round: u32) {
    let _guard = state.locks().acquire(&code).await;
    let Some(mut room) = reload_for_timer(&state, &code, round, RoomPhase::Answering).await else {
        return;
    };
    let Some(answerer) = room.current_player_id else {
        return;
    };
    let outcome = match engine::submit_answer(&mut room, answerer, Choice::DEFAULT_ANSWER) {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(room = %code, round, error = %err, "answer timeout superseded by a player action");
            return;
        }
    };
    if room_service::persist_room(&state, &room).await.is_err() {
        warn!(room = %code, round, "answer timeout not applied, save failed");
        return;
    }
    info!(room = %code, round, "answer timed out, default applied");
    events::broadcast_scoring_results(&state, &room, &outcome);
    arm_phase_timer(&state, &room);
}

/// Scoring dwell elapsed: roll over to the next round or finish the game.
pub async fn handle_scoring_elapsed(state: SharedState, code: String, round: u32) {
    let _guard = state.locks().acquire(&code).await;
    let Some(mut room) = reload_for_timer(&state, &code, round, RoomPhase::Scoring).await else {
        return;
    };
    match engine::advance_or_finish(&mut room) {
        RoundOutcome::GameComplete => {
            if room_service::persist_room(&state, &room).await.is_err() {
                warn!(room = %code, "game completion not applied, save failed");
                return;
            }
            info!(room = %code, "all rounds played, showing final scores");
            events::broadcast_final_scores(&state, &room);
            arm_phase_timer(&state, &room);
        }
        RoundOutcome::Continue { next_player_id, .. } => {
            let question = match open_round(&state, &mut room) {
                Ok(question) => question,
                Err(_) => {
                    engine::end_game_early(&mut room);
                    if room_service::persist_room(&state, &room).await.is_err() {
                        warn!(room = %code, "early game end not applied, save failed");
                        return;
                    }
                    warn!(room = %code, "question catalog exhausted, ending game early");
                    events::broadcast_room_error(
                        &state,
                        &code,
                        "questions_exhausted",
                        "no unused question left, the game ends early",
                    );
                    events::broadcast_final_scores(&state, &room);
                    arm_phase_timer(&state, &room);
                    return;
                }
            };
            if room_service::persist_room(&state, &room).await.is_err() {
                warn!(room = %code, "round rollover not applied, save failed");
                return;
            }
            events::broadcast_next_round(&state, &room, next_player_id);
            events::broadcast_round_started(&state, &room, question);
            arm_phase_timer(&state, &room);
        }
    }
}

/// Final leaderboard dwell elapsed: run the winner celebration.
pub async fn handle_final_scores_elapsed(state: SharedState, code: String, round: u32) {
    let _guard = state.locks().acquire(&code).await;
    let Some(mut room) = reload_for_timer(&state, &code, round, RoomPhase::FinalScores).await
    else {
        return;
    };
    let Some(winner) = room.leaderboard.first().cloned() else {
        return;
    };
    engine::show_winner(&mut room);
    if room_service::persist_room(&state, &room).await.is_err() {
        warn!(room = %code, "winner phase not applied, save failed");
        return;
    }
    events::broadcast_winner_animation(&state, &room, winner);
    arm_phase_timer(&state, &room);
}

/// Winner celebration elapsed: the game reaches its terminal phase.
pub async fn handle_winner_elapsed(state: SharedState, code: String, round: u32) {
    let _guard = state.locks().acquire(&code).await;
    let Some(mut room) =
        reload_for_timer(&state, &code, round, RoomPhase::WinnerAnimation).await
    else {
        return;
    };
    engine::complete_game(&mut room);
    if room_service::persist_room(&state, &room).await.is_err() {
        warn!(room = %code, "game completion not applied, save failed");
        return;
    }
    info!(room = %code, "game completed");
    events::broadcast_game_completed(&state, &room);
}

/// Draw an unused question and open the room's current round with it.
fn open_round(state: &SharedState, room: &mut Room) -> Result<QuestionSummary, ServiceError> {
    let question = state
        .questions()
        .sample_unused(&room.used_question_ids)
        .ok_or(ServiceError::QuestionsExhausted)?;
    let summary = QuestionSummary::from(&question);
    engine::begin_round(room, question.id)?;
    Ok(summary)
}

/// Arm the timer matching the room's current phase, replacing any pending
/// one. Unlisted phases leave no timer armed.
pub(crate) fn arm_phase_timer(state: &SharedState, room: &Room) {
    let code = room.code.clone();
    let round = room.current_round;
    let key = TimerKey {
        round,
        phase: room.phase,
    };
    let secs = match room.phase {
        RoomPhase::Predicting => room.settings.prediction_secs,
        RoomPhase::Answering => room.settings.answer_secs,
        RoomPhase::Scoring => room.settings.scoring_secs,
        RoomPhase::FinalScores => room.settings.final_scores_secs,
        RoomPhase::WinnerAnimation => room.settings.winner_animation_secs,
        RoomPhase::Waiting | RoomPhase::Finished => {
            state.timers().cancel(&room.code);
            return;
        }
    };

    let phase = room.phase;
    let task_state = state.clone();
    let timer_code = code.clone();
    state.timers().schedule(
        &code,
        key,
        std::time::Duration::from_secs(secs),
        async move {
            match phase {
                RoomPhase::Predicting => {
                    handle_prediction_timeout(task_state, timer_code, round).await
                }
                RoomPhase::Answering => handle_answer_timeout(task_state, timer_code, round).await,
                RoomPhase::Scoring => handle_scoring_elapsed(task_state, timer_code, round).await,
                RoomPhase::FinalScores => {
                    handle_final_scores_elapsed(task_state, timer_code, round).await
                }
                RoomPhase::WinnerAnimation => {
                    handle_winner_elapsed(task_state, timer_code, round).await
                }
                RoomPhase::Waiting | RoomPhase::Finished => {}
            }
        },
    );
}

/// Reload a room for a timer fire, dropping stale fires whose `(round,
/// phase)` no longer matches the live room.
async fn reload_for_timer(
    state: &SharedState,
    code: &str,
    round: u32,
    phase: RoomPhase,
) -> Option<Room> {
    let room = match room_service::load_room(state, code).await {
        Ok(room) => room,
        Err(_) => {
            debug!(room = code, "timer fired for a deleted room");
            return None;
        }
    };
    if room.phase != phase || room.current_round != round {
        debug!(
            room = code,
            armed_round = round,
            ?phase,
            live_round = room.current_round,
            live_phase = ?room.phase,
            "stale timer fire ignored"
        );
        return None;
    }
    Some(room)
}

fn scoring_response(room: &Room, outcome: ScoringOutcome) -> ScoringResultsEvent {
    ScoringResultsEvent {
        round_number: outcome.round_number,
        answer: outcome.answer,
        score_updates: outcome
            .score_updates
            .iter()
            .map(ScoreUpdateSummary::from)
            .collect(),
        leaderboard: room.leaderboard.clone(),
        scoring_secs: room.settings.scoring_secs,
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::future::BoxFuture;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            questions::BuiltinQuestionBank,
            room_store::{RoomStore, memory::MemoryRoomStore},
            storage::{StorageError, StorageResult},
        },
        state::{AppState, room::RoomStatus},
    };

    /// Store whose saves can be switched to fail, for persistence-failure
    /// paths the in-memory store cannot reach.
    struct FailingSaveStore {
        inner: MemoryRoomStore,
        fail_saves: Arc<AtomicBool>,
    }

    impl RoomStore for FailingSaveStore {
        fn insert_room(&self, room: Room) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.insert_room(room)
        }

        fn save_room(&self, room: Room) -> BoxFuture<'static, StorageResult<()>> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Box::pin(async {
                    Err(StorageError::unavailable(
                        "save rejected".into(),
                        io::Error::other("save rejected"),
                    ))
                });
            }
            self.inner.save_room(room)
        }

        fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<Room>>> {
            self.inner.find_room(code)
        }

        fn delete_room(&self, code: &str) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.delete_room(code)
        }

        fn list_codes(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
            self.inner.list_codes()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
    }

    async fn four_player_room(state: &SharedState) -> (String, Uuid, Vec<Uuid>) {
        let membership = room_service::create_room(state, "Ada")
            .await
            .unwrap();
        let code = membership.room.code.clone();
        let host_id = membership.player_id;
        let mut players = vec![host_id];
        for name in ["Grace", "Joan", "Alan"] {
            players.push(
                room_service::join_room(state, &code, name)
                    .await
                    .unwrap()
                    .player_id,
            );
        }
        (code, host_id, players)
    }

    async fn stored_room(state: &SharedState, code: &str) -> Room {
        state.store().find_room(code).await.unwrap().unwrap()
    }

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(MemoryRoomStore::new()),
            Arc::new(BuiltinQuestionBank::new()),
        )
    }

    /// Drive one round to its scoring screen: every non-answerer predicts A,
    /// then the answerer picks B.
    async fn play_round(state: &SharedState, code: &str, players: &[Uuid]) -> ScoringResultsEvent {
        let answerer = stored_room(state, code).await.current_player_id.unwrap();
        for &player in players.iter().filter(|&&p| p != answerer) {
            submit_prediction(state, code, player, Choice::A)
                .await
                .unwrap();
        }
        submit_answer(state, code, answerer, Choice::B).await.unwrap()
    }

    #[tokio::test]
    async fn full_game_reaches_completion() {
        let state = test_state();
        let (code, host_id, players) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let total_rounds = stored_room(&state, &code).await.total_rounds;
        assert_eq!(total_rounds, 12);

        for round in 1..=total_rounds {
            let results = play_round(&state, &code, &players).await;
            assert_eq!(results.round_number, round);
            assert_eq!(results.answer, Choice::B);
            assert_eq!(results.score_updates.len(), 3);
            handle_scoring_elapsed(state.clone(), code.clone(), round).await;
        }

        let room = stored_room(&state, &code).await;
        assert_eq!(room.phase, RoomPhase::FinalScores);
        handle_final_scores_elapsed(state.clone(), code.clone(), total_rounds).await;
        assert_eq!(
            stored_room(&state, &code).await.phase,
            RoomPhase::WinnerAnimation
        );
        handle_winner_elapsed(state.clone(), code.clone(), total_rounds).await;

        let room = stored_room(&state, &code).await;
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.phase, RoomPhase::Finished);
        assert_eq!(room.leaderboard.len(), 4);
        // Everyone predicted A against a B answer, so nobody scored.
        assert!(room.leaderboard.iter().all(|entry| entry.score == 0));
    }

    #[tokio::test]
    async fn rotation_visits_every_player_before_repeating() {
        let state = test_state();
        let (code, host_id, players) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let mut answerers = Vec::new();
        for round in 1..=players.len() as u32 {
            answerers.push(stored_room(&state, &code).await.current_player_id.unwrap());
            play_round(&state, &code, &players).await;
            handle_scoring_elapsed(state.clone(), code.clone(), round).await;
        }

        let mut unique = answerers.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), players.len());
        // The fifth round wraps back to the first answerer.
        assert_eq!(
            stored_room(&state, &code).await.current_player_id,
            Some(answerers[0])
        );
    }

    #[tokio::test]
    async fn answer_rejected_while_predictions_open() {
        let state = test_state();
        let (code, host_id, _) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let answerer = stored_room(&state, &code).await.current_player_id.unwrap();
        let err = submit_answer(&state, &code, answerer, Choice::A)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "predictions_pending");
    }

    #[tokio::test]
    async fn timeouts_close_predictions_and_default_the_answer() {
        let state = test_state();
        let (code, host_id, players) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let answerer = stored_room(&state, &code).await.current_player_id.unwrap();
        let predictor = players.iter().copied().find(|&p| p != answerer).unwrap();
        submit_prediction(&state, &code, predictor, Choice::B)
            .await
            .unwrap();

        handle_prediction_timeout(state.clone(), code.clone(), 1).await;
        let room = stored_room(&state, &code).await;
        assert_eq!(room.phase, RoomPhase::Answering);
        assert_eq!(room.rounds[0].predictions.len(), 1);

        handle_answer_timeout(state.clone(), code.clone(), 1).await;
        let room = stored_room(&state, &code).await;
        assert_eq!(room.phase, RoomPhase::Scoring);
        assert_eq!(room.rounds[0].player_answer, Some(Choice::DEFAULT_ANSWER));
    }

    #[tokio::test]
    async fn stale_timer_fire_leaves_the_room_untouched() {
        let state = test_state();
        let (code, host_id, _) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        // An answer timeout armed for a phase the room is no longer in.
        handle_answer_timeout(state.clone(), code.clone(), 1).await;
        let room = stored_room(&state, &code).await;
        assert_eq!(room.phase, RoomPhase::Predicting);
        assert!(room.rounds[0].player_answer.is_none());
    }

    #[tokio::test]
    async fn failed_answer_save_keeps_the_answering_deadline_armed() {
        let fail_saves = Arc::new(AtomicBool::new(false));
        let store = FailingSaveStore {
            inner: MemoryRoomStore::new(),
            fail_saves: Arc::clone(&fail_saves),
        };
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store),
            Arc::new(BuiltinQuestionBank::new()),
        );
        let (code, host_id, players) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let answerer = stored_room(&state, &code).await.current_player_id.unwrap();
        for &player in players.iter().filter(|&&p| p != answerer) {
            submit_prediction(&state, &code, player, Choice::A)
                .await
                .unwrap();
        }

        fail_saves.store(true, Ordering::SeqCst);
        let err = submit_answer(&state, &code, answerer, Choice::B)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "storage_unavailable");

        // The stored room is untouched and the answering deadline is still
        // armed, so the round cannot stall.
        let room = stored_room(&state, &code).await;
        assert_eq!(room.phase, RoomPhase::Answering);
        assert!(room.rounds[0].player_answer.is_none());
        assert_eq!(
            state.timers().pending(&code),
            Some(TimerKey {
                round: 1,
                phase: RoomPhase::Answering
            })
        );

        fail_saves.store(false, Ordering::SeqCst);
        submit_answer(&state, &code, answerer, Choice::B).await.unwrap();
        assert_eq!(stored_room(&state, &code).await.phase, RoomPhase::Scoring);
    }

    #[tokio::test]
    async fn current_question_follows_the_active_round() {
        let state = test_state();
        let (code, host_id, _) = four_player_room(&state).await;
        let err = room_service::current_question(&state, &code)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "not_found");

        start_game(&state, &code, host_id).await.unwrap();
        let question = room_service::current_question(&state, &code).await.unwrap();
        let room = stored_room(&state, &code).await;
        assert_eq!(
            Some(question.id),
            room.current_round_record().map(|round| round.question_id)
        );
    }

    #[tokio::test]
    async fn mid_game_leaver_is_detached_and_skipped_as_answerer() {
        let state = test_state();
        let (code, host_id, players) = four_player_room(&state).await;
        start_game(&state, &code, host_id).await.unwrap();

        let answerer = stored_room(&state, &code).await.current_player_id.unwrap();
        let leaver = players.iter().copied().find(|&p| p != answerer).unwrap();
        room_service::leave_room(&state, &code, leaver).await.unwrap();

        let room = stored_room(&state, &code).await;
        assert_eq!(room.players.len(), 4);
        assert!(!room.player(leaver).unwrap().is_connected);
        // The detached slot still counts toward the prediction quota.
        assert_eq!(room.expected_predictions(), 3);
    }
}
