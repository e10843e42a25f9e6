//! Pure state-transition logic for a room. Every operation here works on a
//! room snapshot already owned by the caller; persistence, timers, and
//! broadcasting live in the service layer.

use std::time::SystemTime;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::state::room::{
    Choice, LeaderboardEntry, Player, Prediction, Room, RoomPhase, RoomStatus, Round,
};

/// Points granted for each correct prediction.
pub const CORRECT_PREDICTION_REWARD: u32 = 10;

/// Rejection raised by an engine operation. No variant mutates the room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The room already holds its full quota of players.
    #[error("room is full ({max_players} players maximum)")]
    RoomFull {
        /// Configured quota for the room.
        max_players: usize,
    },
    /// Another player already uses this name (case-insensitive).
    #[error("player name `{name}` is already taken")]
    NameTaken {
        /// The rejected name.
        name: String,
    },
    /// The room is no longer in the waiting state.
    #[error("room cannot be joined once the game has started")]
    RoomNotJoinable,
    /// Only the host may perform this action.
    #[error("only the host can start the game")]
    NotHost,
    /// A game needs exactly the quota of players to start.
    #[error("need exactly {needed} players to start, currently {current}")]
    NotEnoughPlayers {
        /// Players currently in the room.
        current: usize,
        /// Players required.
        needed: usize,
    },
    /// The game already started or finished.
    #[error("game has already started or finished")]
    AlreadyStarted,
    /// The operation requires a running game.
    #[error("no game is running in this room")]
    GameNotRunning,
    /// No round has been materialized for the current round number.
    #[error("no active round")]
    NoActiveRound,
    /// The answerer cannot predict their own answer.
    #[error("the current player cannot predict their own answer")]
    SelfPrediction,
    /// The predictor already submitted for this round.
    #[error("prediction already submitted for this round")]
    DuplicatePrediction,
    /// The round is already completed.
    #[error("round is already completed")]
    RoundInactive,
    /// Only the round's answerer may submit the answer.
    #[error("only the current player can submit an answer")]
    NotYourTurn,
    /// The answer for this round was already recorded.
    #[error("answer already submitted for this round")]
    AnswerAlreadyGiven,
    /// Predictions are still open; the answer is not accepted yet.
    #[error("waiting for predictions ({received}/{expected} received)")]
    PredictionsPending {
        /// Predictions recorded so far.
        received: usize,
        /// Predictions required before answering.
        expected: usize,
    },
    /// The referenced player is not part of the room.
    #[error("player not found in this room")]
    PlayerNotFound,
}

impl EngineError {
    /// Stable machine-readable code clients use to pick retry/resync behavior.
    pub fn reason_code(&self) -> &'static str {
        match self {
            EngineError::RoomFull { .. } => "room_full",
            EngineError::NameTaken { .. } => "name_taken",
            EngineError::RoomNotJoinable => "room_not_joinable",
            EngineError::NotHost => "not_host",
            EngineError::NotEnoughPlayers { .. } => "not_enough_players",
            EngineError::AlreadyStarted => "already_started",
            EngineError::GameNotRunning => "game_not_running",
            EngineError::NoActiveRound => "no_active_round",
            EngineError::SelfPrediction => "self_prediction",
            EngineError::DuplicatePrediction => "duplicate_prediction",
            EngineError::RoundInactive => "round_inactive",
            EngineError::NotYourTurn => "not_your_turn",
            EngineError::AnswerAlreadyGiven => "answer_already_given",
            EngineError::PredictionsPending { .. } => "predictions_pending",
            EngineError::PlayerNotFound => "player_not_found",
        }
    }
}

/// Score change applied to one predictor when a round resolves.
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    /// The predictor.
    pub player_id: Uuid,
    /// Display name at resolution time.
    pub player_name: String,
    /// The guess that was evaluated.
    pub predicted_choice: Choice,
    /// Whether the guess matched the answer.
    pub is_correct: bool,
    /// Points granted (0 or the fixed reward).
    pub points_earned: u32,
    /// Score after applying the reward.
    pub new_score: u32,
}

/// Result of resolving a round after the answer came in.
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    /// The resolved round.
    pub round_number: u32,
    /// The revealed answer.
    pub answer: Choice,
    /// Per-predictor resolution, in submission order.
    pub score_updates: Vec<ScoreUpdate>,
}

/// What comes after the scoring dwell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// All rounds played; the room moved to the final-scores phase.
    GameComplete,
    /// The game continues with the next answerer.
    Continue {
        /// Round number about to be played.
        next_round: u32,
        /// Answerer for that round.
        next_player_id: Uuid,
    },
}

/// Effect of removing a player from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The room is now empty and must be deleted.
    DeleteRoom,
    /// The player was removed from a waiting room.
    Removed {
        /// New host if the departing player was hosting.
        new_host_id: Option<Uuid>,
    },
    /// Mid-game departure: the slot and score stay, the player is detached.
    Detached,
}

/// Admit a new player into a waiting room. Returns the created player's id.
pub fn admit_player(room: &mut Room, name: &str) -> Result<Uuid, EngineError> {
    if room.status != RoomStatus::Waiting {
        return Err(EngineError::RoomNotJoinable);
    }
    if room.players.len() >= room.max_players {
        return Err(EngineError::RoomFull {
            max_players: room.max_players,
        });
    }
    let trimmed = name.trim();
    if room
        .players
        .iter()
        .any(|p| p.name.eq_ignore_ascii_case(trimmed))
    {
        return Err(EngineError::NameTaken {
            name: trimmed.to_string(),
        });
    }

    let player = Player {
        id: Uuid::new_v4(),
        name: trimmed.to_string(),
        score: 0,
        is_ready: false,
        is_connected: true,
        joined_at: SystemTime::now(),
    };
    let id = player.id;
    room.players.push(player);
    room.touch();
    Ok(id)
}

/// Toggle a player's lobby ready flag, returning the new value.
pub fn toggle_ready(room: &mut Room, player_id: Uuid) -> Result<bool, EngineError> {
    let player = room
        .player_mut(player_id)
        .ok_or(EngineError::PlayerNotFound)?;
    player.is_ready = !player.is_ready;
    let ready = player.is_ready;
    room.touch();
    Ok(ready)
}

/// Start the game: full room required, host only. Picks the first answerer
/// uniformly at random among the roster.
pub fn start_game(room: &mut Room, requester_id: Uuid) -> Result<(), EngineError> {
    if requester_id != room.host_id {
        return Err(EngineError::NotHost);
    }
    if room.status != RoomStatus::Waiting {
        return Err(EngineError::AlreadyStarted);
    }
    if room.players.len() != room.max_players {
        return Err(EngineError::NotEnoughPlayers {
            current: room.players.len(),
            needed: room.max_players,
        });
    }

    let first = rand::rng().random_range(0..room.players.len());
    room.status = RoomStatus::Playing;
    room.current_round = 1;
    room.current_player_id = Some(room.players[first].id);
    room.rounds.clear();
    room.touch();
    Ok(())
}

/// Materialize the round for the current round number with the supplied
/// question, and open the prediction phase.
pub fn begin_round(room: &mut Room, question_id: Uuid) -> Result<&Round, EngineError> {
    if room.status != RoomStatus::Playing {
        return Err(EngineError::GameNotRunning);
    }
    let answerer = room.current_player_id.ok_or(EngineError::NoActiveRound)?;

    room.used_question_ids.insert(question_id);
    room.rounds.push(Round {
        round_number: room.current_round,
        current_player_id: answerer,
        question_id,
        predictions: Vec::new(),
        player_answer: None,
        started_at: SystemTime::now(),
        answered_at: None,
        is_completed: false,
    });
    room.phase = RoomPhase::Predicting;
    room.touch();
    room.rounds.last().ok_or(EngineError::NoActiveRound)
}

/// Record one predictor's guess for the current round. Returns the number of
/// distinct predictors recorded so far.
pub fn submit_prediction(
    room: &mut Room,
    player_id: Uuid,
    choice: Choice,
) -> Result<usize, EngineError> {
    if room.player(player_id).is_none() {
        return Err(EngineError::PlayerNotFound);
    }
    let Some(round) = room.current_round_record_mut() else {
        return Err(EngineError::NoActiveRound);
    };
    if round.is_completed {
        return Err(EngineError::RoundInactive);
    }
    if player_id == round.current_player_id {
        return Err(EngineError::SelfPrediction);
    }
    if round.prediction_of(player_id).is_some() {
        return Err(EngineError::DuplicatePrediction);
    }

    let question_id = round.question_id;
    let target = round.current_player_id;
    round.predictions.push(Prediction {
        player_id,
        question_id,
        target_player_id: target,
        predicted_choice: choice,
        is_correct: None,
        submitted_at: SystemTime::now(),
    });
    let count = round.predictor_count();
    room.touch();
    Ok(count)
}

/// Close the prediction window and hand the turn to the answerer. Called when
/// every predictor is in or when the prediction timer fires.
pub fn close_predictions(room: &mut Room) {
    room.phase = RoomPhase::Answering;
    room.touch();
}

/// Record the answerer's choice, resolve every prediction, and apply rewards.
/// This is the only operation that changes scores; it applies exactly once
/// per round because a completed round rejects any further answer.
pub fn submit_answer(
    room: &mut Room,
    player_id: Uuid,
    choice: Choice,
) -> Result<ScoringOutcome, EngineError> {
    let expected = room.expected_predictions();
    // Answerer identity and round bookkeeping share a borrow of the room, so
    // gather the per-round facts first.
    let (answerer, received, answered) = {
        let round = room
            .current_round_record()
            .ok_or(EngineError::NoActiveRound)?;
        (
            round.current_player_id,
            round.predictor_count(),
            round.player_answer.is_some(),
        )
    };
    if player_id != answerer {
        return Err(EngineError::NotYourTurn);
    }
    if answered {
        return Err(EngineError::AnswerAlreadyGiven);
    }
    // While the prediction window is open the answer is premature; once the
    // window closed (all predictors in, or the timer forced the phase) the
    // answer is accepted even with predictors missing.
    if room.phase == RoomPhase::Predicting && received < expected {
        return Err(EngineError::PredictionsPending {
            received,
            expected,
        });
    }

    let now = SystemTime::now();
    let round_number;
    let resolved: Vec<(Uuid, Choice, bool)>;
    {
        let round = room
            .current_round_record_mut()
            .ok_or(EngineError::NoActiveRound)?;
        round.player_answer = Some(choice);
        round.answered_at = Some(now);
        round.is_completed = true;
        round_number = round.round_number;
        resolved = round
            .predictions
            .iter_mut()
            .map(|prediction| {
                let correct = prediction.predicted_choice == choice;
                prediction.is_correct = Some(correct);
                (prediction.player_id, prediction.predicted_choice, correct)
            })
            .collect();
    }

    let mut score_updates = Vec::with_capacity(resolved.len());
    for (predictor, predicted_choice, correct) in resolved {
        let Some(player) = room.player_mut(predictor) else {
            continue;
        };
        let points = if correct { CORRECT_PREDICTION_REWARD } else { 0 };
        player.score += points;
        score_updates.push(ScoreUpdate {
            player_id: predictor,
            player_name: player.name.clone(),
            predicted_choice,
            is_correct: correct,
            points_earned: points,
            new_score: player.score,
        });
    }

    room.phase = RoomPhase::Scoring;
    room.leaderboard = compute_leaderboard(room);
    room.touch();
    Ok(ScoringOutcome {
        round_number,
        answer: choice,
        score_updates,
    })
}

/// After the scoring dwell, either finish the game or rotate to the next
/// answerer in join order.
pub fn advance_or_finish(room: &mut Room) -> RoundOutcome {
    if room.current_round >= room.total_rounds {
        room.status = RoomStatus::Finished;
        room.phase = RoomPhase::FinalScores;
        room.leaderboard = compute_leaderboard(room);
        room.touch();
        return RoundOutcome::GameComplete;
    }

    let next_index = room
        .current_player_id
        .and_then(|id| room.players.iter().position(|p| p.id == id))
        .map(|index| (index + 1) % room.players.len())
        .unwrap_or(0);
    let next_player_id = room.players[next_index].id;
    room.current_round += 1;
    room.current_player_id = Some(next_player_id);
    room.touch();
    RoundOutcome::Continue {
        next_round: room.current_round,
        next_player_id,
    }
}

/// End the game before its last round, used when the question catalog runs
/// dry. The room goes straight to the final-scores dwell.
pub fn end_game_early(room: &mut Room) {
    room.status = RoomStatus::Finished;
    room.phase = RoomPhase::FinalScores;
    room.leaderboard = compute_leaderboard(room);
    room.touch();
}

/// Move from the final leaderboard dwell to the winner celebration.
pub fn show_winner(room: &mut Room) {
    room.phase = RoomPhase::WinnerAnimation;
    room.touch();
}

/// Terminal transition once the winner celebration dwell elapses.
pub fn complete_game(room: &mut Room) {
    room.phase = RoomPhase::Finished;
    room.touch();
}

/// Remove a player. Outside a running game the slot is freed and the host
/// handed to the next player in join order; mid-game the slot and score
/// survive and the player is only detached, so the answerer rotation stays
/// valid (their rounds resolve through the answer-timeout default).
pub fn remove_player(room: &mut Room, player_id: Uuid) -> Result<RemovalOutcome, EngineError> {
    if room.player(player_id).is_none() {
        return Err(EngineError::PlayerNotFound);
    }

    if room.status == RoomStatus::Playing {
        let player = room
            .player_mut(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        player.is_connected = false;
        room.touch();
        return Ok(RemovalOutcome::Detached);
    }

    room.players.retain(|p| p.id != player_id);
    if room.players.is_empty() {
        return Ok(RemovalOutcome::DeleteRoom);
    }

    let mut new_host_id = None;
    if room.host_id == player_id {
        room.host_id = room.players[0].id;
        new_host_id = Some(room.host_id);
    }
    room.touch();
    Ok(RemovalOutcome::Removed { new_host_id })
}

/// Derive ranked standings: score descending, ties kept in join order so the
/// ordering is deterministic and idempotent.
pub fn compute_leaderboard(room: &Room) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = room
        .players
        .iter()
        .map(|player| {
            let correct_predictions = room
                .rounds
                .iter()
                .flat_map(|round| round.predictions.iter())
                .filter(|p| p.player_id == player.id && p.is_correct == Some(true))
                .count() as u32;
            LeaderboardEntry {
                player_id: player.id,
                player_name: player.name.clone(),
                score: player.score,
                correct_predictions,
            }
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn waiting_room(names: &[&str]) -> Room {
        let config = AppConfig::default();
        let mut room = Room::new("1234".into(), names[0].into(), &config);
        for name in &names[1..] {
            admit_player(&mut room, name).unwrap();
        }
        room
    }

    fn playing_room() -> Room {
        let mut room = waiting_room(&["Ava", "Ben", "Cy", "Dee"]);
        let host = room.host_id;
        start_game(&mut room, host).unwrap();
        begin_round(&mut room, Uuid::new_v4()).unwrap();
        room
    }

    fn predictors(room: &Room) -> Vec<Uuid> {
        let answerer = room.current_player_id.unwrap();
        room.players
            .iter()
            .map(|p| p.id)
            .filter(|id| *id != answerer)
            .collect()
    }

    #[test]
    fn room_fills_up_then_rejects() {
        let mut room = waiting_room(&["Ava", "Ben", "Cy"]);
        assert_eq!(room.status, RoomStatus::Waiting);
        admit_player(&mut room, "Dee").unwrap();
        assert_eq!(room.players.len(), 4);

        let err = admit_player(&mut room, "Eve").unwrap_err();
        assert_eq!(err, EngineError::RoomFull { max_players: 4 });
        assert_eq!(err.reason_code(), "room_full");
    }

    #[test]
    fn duplicate_name_is_case_insensitive() {
        let mut room = waiting_room(&["Ava", "Ben"]);
        let err = admit_player(&mut room, "  ava ").unwrap_err();
        assert!(matches!(err, EngineError::NameTaken { .. }));
    }

    #[test]
    fn join_rejected_once_playing() {
        let mut room = playing_room();
        assert_eq!(
            admit_player(&mut room, "Eve").unwrap_err(),
            EngineError::RoomNotJoinable
        );
    }

    #[test]
    fn start_requires_host_and_full_room() {
        let mut room = waiting_room(&["Ava", "Ben", "Cy"]);
        let non_host = room.players[1].id;
        let host = room.host_id;
        assert_eq!(start_game(&mut room, non_host).unwrap_err(), EngineError::NotHost);
        assert_eq!(
            start_game(&mut room, host).unwrap_err(),
            EngineError::NotEnoughPlayers {
                current: 3,
                needed: 4
            }
        );

        admit_player(&mut room, "Dee").unwrap();
        start_game(&mut room, host).unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.current_round, 1);
        assert_eq!(room.total_rounds, 12);
        let answerer = room.current_player_id.unwrap();
        assert!(room.players.iter().any(|p| p.id == answerer));

        assert_eq!(
            start_game(&mut room, host).unwrap_err(),
            EngineError::AlreadyStarted
        );
    }

    #[test]
    fn begin_round_tracks_used_questions() {
        let mut room = waiting_room(&["Ava", "Ben", "Cy", "Dee"]);
        let host = room.host_id;
        start_game(&mut room, host).unwrap();
        let question = Uuid::new_v4();
        let round = begin_round(&mut room, question).unwrap();
        assert_eq!(round.round_number, 1);
        assert!(!round.is_completed);
        assert_eq!(room.phase, RoomPhase::Predicting);
        assert!(room.used_question_ids.contains(&question));
    }

    #[test]
    fn answerer_cannot_predict_own_round() {
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        assert_eq!(
            submit_prediction(&mut room, answerer, Choice::A).unwrap_err(),
            EngineError::SelfPrediction
        );
    }

    #[test]
    fn second_prediction_rejected_regardless_of_choice() {
        let mut room = playing_room();
        let predictor = predictors(&room)[0];
        submit_prediction(&mut room, predictor, Choice::A).unwrap();
        assert_eq!(
            submit_prediction(&mut room, predictor, Choice::A).unwrap_err(),
            EngineError::DuplicatePrediction
        );
        assert_eq!(
            submit_prediction(&mut room, predictor, Choice::B).unwrap_err(),
            EngineError::DuplicatePrediction
        );
    }

    #[test]
    fn answer_rejected_while_predictions_open() {
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        let guessers = predictors(&room);
        submit_prediction(&mut room, guessers[0], Choice::A).unwrap();
        submit_prediction(&mut room, guessers[1], Choice::B).unwrap();

        assert_eq!(
            submit_answer(&mut room, answerer, Choice::A).unwrap_err(),
            EngineError::PredictionsPending {
                received: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn answer_accepted_after_timeout_closes_predictions_early() {
        // Scenario: prediction timer fires with 2 of 3 predictions in.
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        let guessers = predictors(&room);
        submit_prediction(&mut room, guessers[0], Choice::A).unwrap();
        submit_prediction(&mut room, guessers[1], Choice::A).unwrap();
        close_predictions(&mut room);

        let outcome = submit_answer(&mut room, answerer, Choice::A).unwrap();
        assert_eq!(outcome.score_updates.len(), 2);
        // The absent predictor left no record and gained nothing.
        let absent = guessers[2];
        assert!(room
            .current_round_record()
            .unwrap()
            .prediction_of(absent)
            .is_none());
        assert_eq!(room.player(absent).unwrap().score, 0);
    }

    #[test]
    fn scoring_rewards_exactly_the_correct_predictors() {
        // Scenario: predictions A, B, A; answer A.
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        let guessers = predictors(&room);
        submit_prediction(&mut room, guessers[0], Choice::A).unwrap();
        submit_prediction(&mut room, guessers[1], Choice::B).unwrap();
        submit_prediction(&mut room, guessers[2], Choice::A).unwrap();
        close_predictions(&mut room);

        let outcome = submit_answer(&mut room, answerer, Choice::A).unwrap();
        assert_eq!(outcome.answer, Choice::A);
        assert_eq!(room.player(guessers[0]).unwrap().score, 10);
        assert_eq!(room.player(guessers[1]).unwrap().score, 0);
        assert_eq!(room.player(guessers[2]).unwrap().score, 10);
        assert_eq!(room.player(answerer).unwrap().score, 0);

        let round = room.current_round_record().unwrap();
        assert!(round.is_completed);
        for prediction in &round.predictions {
            assert_eq!(
                prediction.is_correct,
                Some(prediction.predicted_choice == Choice::A)
            );
        }
        assert_eq!(room.phase, RoomPhase::Scoring);
    }

    #[test]
    fn answer_applies_once() {
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        for id in predictors(&room) {
            submit_prediction(&mut room, id, Choice::A).unwrap();
        }
        close_predictions(&mut room);
        submit_answer(&mut room, answerer, Choice::A).unwrap();
        assert_eq!(
            submit_answer(&mut room, answerer, Choice::B).unwrap_err(),
            EngineError::AnswerAlreadyGiven
        );
    }

    #[test]
    fn non_answerer_cannot_answer() {
        let mut room = playing_room();
        let impostor = predictors(&room)[0];
        assert_eq!(
            submit_answer(&mut room, impostor, Choice::A).unwrap_err(),
            EngineError::NotYourTurn
        );
    }

    #[test]
    fn rotation_wraps_in_join_order() {
        let mut room = playing_room();
        let start = room.current_player_id.unwrap();
        let start_index = room.players.iter().position(|p| p.id == start).unwrap();

        let outcome = advance_or_finish(&mut room);
        let RoundOutcome::Continue {
            next_round,
            next_player_id,
        } = outcome
        else {
            panic!("expected the game to continue");
        };
        assert_eq!(next_round, 2);
        assert_eq!(next_player_id, room.players[(start_index + 1) % 4].id);
    }

    #[test]
    fn full_game_finishes_after_total_rounds() {
        // Scenario: 12 completed rounds with 4 players; everyone predicts A
        // and every answerer answers A, so all predictors gain each round.
        let mut room = waiting_room(&["Ava", "Ben", "Cy", "Dee"]);
        let host = room.host_id;
        start_game(&mut room, host).unwrap();

        loop {
            begin_round(&mut room, Uuid::new_v4()).unwrap();
            let answerer = room.current_player_id.unwrap();
            for id in predictors(&room) {
                submit_prediction(&mut room, id, Choice::A).unwrap();
            }
            close_predictions(&mut room);
            submit_answer(&mut room, answerer, Choice::A).unwrap();
            if advance_or_finish(&mut room) == RoundOutcome::GameComplete {
                break;
            }
        }

        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.phase, RoomPhase::FinalScores);
        assert_eq!(room.rounds.len(), 12);
        // Each player answered 3 times and predicted 9 times, all correct.
        for player in &room.players {
            assert_eq!(player.score, 90);
        }
        let top = &room.leaderboard[0];
        assert_eq!(top.score, 90);
        assert_eq!(top.correct_predictions, 9);

        show_winner(&mut room);
        assert_eq!(room.phase, RoomPhase::WinnerAnimation);
        complete_game(&mut room);
        assert_eq!(room.phase, RoomPhase::Finished);
    }

    #[test]
    fn leaderboard_sorted_and_idempotent() {
        let mut room = playing_room();
        let answerer = room.current_player_id.unwrap();
        let guessers = predictors(&room);
        submit_prediction(&mut room, guessers[0], Choice::B).unwrap();
        submit_prediction(&mut room, guessers[1], Choice::B).unwrap();
        submit_prediction(&mut room, guessers[2], Choice::A).unwrap();
        close_predictions(&mut room);
        submit_answer(&mut room, answerer, Choice::B).unwrap();

        let first = compute_leaderboard(&room);
        let second = compute_leaderboard(&room);
        assert_eq!(first.len(), room.players.len());
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.player_id, b.player_id);
            assert_eq!(a.score, b.score);
        }
        // Ties keep join order: the answerer and the wrong guesser are both
        // at 0, and the earlier joiner ranks first among them.
        let zeros: Vec<Uuid> = first
            .iter()
            .filter(|e| e.score == 0)
            .map(|e| e.player_id)
            .collect();
        let join_positions: Vec<usize> = zeros
            .iter()
            .map(|id| room.players.iter().position(|p| p.id == *id).unwrap())
            .collect();
        assert!(join_positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn leaving_waiting_room_reassigns_host_then_deletes() {
        let mut room = waiting_room(&["Ava", "Ben"]);
        let host = room.host_id;
        let other = room.players[1].id;

        let outcome = remove_player(&mut room, host).unwrap();
        assert_eq!(
            outcome,
            RemovalOutcome::Removed {
                new_host_id: Some(other)
            }
        );
        assert_eq!(room.host_id, other);

        assert_eq!(
            remove_player(&mut room, other).unwrap(),
            RemovalOutcome::DeleteRoom
        );
    }

    #[test]
    fn leaving_mid_game_keeps_slot_and_score() {
        let mut room = playing_room();
        let guesser = predictors(&room)[0];
        assert_eq!(
            remove_player(&mut room, guesser).unwrap(),
            RemovalOutcome::Detached
        );
        let player = room.player(guesser).unwrap();
        assert!(!player.is_connected);
        assert_eq!(room.players.len(), 4);
    }
}
