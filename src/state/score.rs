//! Final guess and point awards
//!
//! Results go out as soon as the game ends, but points are only written to the
//! player records after `score_reveal_delay_seconds`, followed by a room update.
//! The award job carries the room generation it was scheduled in and does
//! nothing once the room has been reset or deleted.

use super::{require_player, vote::tabulate, AppState, RoomSlot, ScheduledTask};
use crate::broadcast::Outbox;
use crate::error::{GameError, GameResult};
use crate::protocol::{GameResults, PointAward, ServerMessage, Winners};
use crate::types::*;
use std::time::Duration;

/// Points for each side of a finished game
pub fn award_for(winners: Winners) -> PointAward {
    match winners {
        Winners::Impostor => PointAward {
            impostor_points: 2,
            detective_points: 0,
        },
        Winners::Detectives => PointAward {
            impostor_points: 0,
            detective_points: 2,
        },
        Winners::Tie => PointAward {
            impostor_points: 1,
            detective_points: 1,
        },
    }
}

/// Case- and whitespace-insensitive comparison against the secret word
pub fn is_correct_guess(guess: &str, secret_word: &str) -> bool {
    let guess = guess.trim();
    !guess.is_empty() && guess.to_lowercase() == secret_word.trim().to_lowercase()
}

fn apply_points(room: &mut Room, winners: Winners) {
    let award = award_for(winners);
    for player in room.players.iter_mut() {
        player.points += if player.is_impostor {
            award.impostor_points
        } else {
            award.detective_points
        };
    }
}

impl AppState {
    /// The caught impostor names the secret word
    pub async fn submit_final_guess(
        &self,
        code: &str,
        player_id: &str,
        guess: &str,
    ) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        let player = require_player(&slot.room, player_id)?;
        if slot.room.game_state != GameState::FinalGuess {
            return Err(GameError::WrongPhase("No final guess is pending"));
        }
        if !player.is_impostor {
            return Err(GameError::NotImpostor);
        }

        let mut out = Outbox::new();
        self.resolve_final_guess(slot, guess, &mut out);
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }

    fn resolve_final_guess(&self, slot: &mut RoomSlot, guess: &str, out: &mut Outbox) {
        if slot.room.game_state != GameState::FinalGuess {
            return;
        }

        let secret = slot.room.secret_word.clone().unwrap_or_default();
        let correct = is_correct_guess(guess, &secret);
        let winners = if correct {
            Winners::Tie
        } else {
            Winners::Detectives
        };
        tracing::info!(
            "Final guess in room {}: {:?} ({})",
            slot.room.code,
            guess.trim(),
            if correct { "correct" } else { "wrong" }
        );

        self.finish_game(
            slot,
            Some(guess.trim().to_string()),
            Some(correct),
            winners,
            out,
        );
    }

    /// Mark the game finished, publish the outcome and schedule the points
    pub(super) fn finish_game(
        &self,
        slot: &mut RoomSlot,
        impostor_guess: Option<String>,
        correct_guess: Option<bool>,
        winners: Winners,
        out: &mut Outbox,
    ) {
        slot.clear_timer();
        slot.final_guess_timeout = None;
        slot.room.game_state = GameState::Finished;

        let voting = match slot.last_results.clone() {
            Some(results) => results,
            None => tabulate(&slot.room),
        };
        let results = GameResults {
            voting,
            impostor_guess,
            correct_guess,
            game_ended: true,
            winners,
            points: award_for(winners),
        };
        tracing::info!("Game over in room {}: {:?} win", slot.room.code, winners);
        out.to_room(&slot.room, ServerMessage::GameResults(results));

        self.schedule_score_award(slot, winners);
    }

    /// Submit an empty guess for an impostor who never answers
    pub(super) fn schedule_final_guess_timeout(&self, slot: &mut RoomSlot) {
        let id = self.next_task_id();
        let generation = slot.generation;
        let code = slot.room.code.clone();
        let delay = Duration::from_secs(u64::from(
            self.config.final_guess_seconds + self.config.final_guess_grace_seconds,
        ));
        let state = self.clone();

        let task = ScheduledTask::spawn(id, async move {
            tokio::time::sleep(delay).await;

            let mut rooms = state.rooms.write().await;
            let Some(slot) = rooms.get_mut(&code) else {
                return;
            };
            if slot.generation != generation
                || slot.final_guess_timeout.as_ref().map(|t| t.id()) != Some(id)
            {
                return;
            }
            if let Some(task) = slot.final_guess_timeout.take() {
                task.complete();
            }

            tracing::warn!("No final guess in room {}, submitting an empty one", code);
            let mut out = Outbox::new();
            state.resolve_final_guess(slot, "", &mut out);
            out.room_update(&slot.room);
            state.dispatch(out).await;
        });
        slot.final_guess_timeout = Some(task);
    }

    fn schedule_score_award(&self, slot: &mut RoomSlot, winners: Winners) {
        let id = self.next_task_id();
        let generation = slot.generation;
        let code = slot.room.code.clone();
        let delay = Duration::from_secs(u64::from(self.config.score_reveal_delay_seconds));
        let state = self.clone();

        let task = ScheduledTask::spawn(id, async move {
            tokio::time::sleep(delay).await;

            let mut rooms = state.rooms.write().await;
            let Some(slot) = rooms.get_mut(&code) else {
                return;
            };
            if slot.generation != generation
                || slot.score_award.as_ref().map(|t| t.id()) != Some(id)
            {
                tracing::debug!("Skipping stale score award for room {}", code);
                return;
            }
            if let Some(task) = slot.score_award.take() {
                task.complete();
            }

            apply_points(&mut slot.room, winners);
            tracing::info!("Points awarded in room {} ({:?})", code, winners);

            let mut out = Outbox::new();
            out.room_update(&slot.room);
            state.dispatch(out).await;
        });
        slot.score_award = Some(task);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::ServerMessage;

    /// Start a game and jump straight to elimination voting
    async fn in_voting(state: &AppState, n: usize) -> (Vec<PlayerId>, PlayerId) {
        let (ids, impostor) = started_game(state, "ROOM", n).await;
        with_slot(state, "ROOM", |slot| {
            let mut out = Outbox::new();
            state.enter_voting(slot, &mut out);
        })
        .await;
        (ids, impostor)
    }

    async fn everyone_votes_for(state: &AppState, ids: &[PlayerId], suspect: &str) {
        for id in ids {
            state.submit_vote("ROOM", id, suspect).await.unwrap();
        }
    }

    fn points(room: &Room) -> Vec<(PlayerId, u32)> {
        room.players.iter().map(|p| (p.id.clone(), p.points)).collect()
    }

    #[test]
    fn test_guess_comparison() {
        assert!(is_correct_guess("  pIzZa ", "Pizza"));
        assert!(!is_correct_guess("pasta", "Pizza"));
        assert!(!is_correct_guess("", "Pizza"));
        assert!(!is_correct_guess("   ", ""));
    }

    #[test]
    fn test_award_table() {
        assert_eq!(award_for(Winners::Impostor).impostor_points, 2);
        assert_eq!(award_for(Winners::Impostor).detective_points, 0);
        assert_eq!(award_for(Winners::Detectives).detective_points, 2);
        assert_eq!(award_for(Winners::Tie).impostor_points, 1);
        assert_eq!(award_for(Winners::Tie).detective_points, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_impostor_survives() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 4).await;
        let innocent = ids.iter().find(|id| **id != impostor).unwrap().clone();

        everyone_votes_for(&state, &ids, &innocent).await;

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Finished);
        assert!(room.players.iter().all(|p| p.points == 0));

        tokio::time::sleep(Duration::from_secs(36)).await;

        let room = state.get_room("ROOM").await.unwrap();
        for (id, pts) in points(&room) {
            assert_eq!(pts, if id == impostor { 2 } else { 0 });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_caught_impostor_correct_guess_is_a_tie() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 5).await;

        everyone_votes_for(&state, &ids, &impostor).await;
        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::FinalGuess);
        assert_eq!(room.game_phase, GamePhase::Voting);
        assert!(!state.has_active_timer("ROOM").await);
        assert!(with_slot(&state, "ROOM", |slot| slot.has_final_guess_timeout()).await);

        state
            .submit_final_guess("ROOM", &impostor, "  PIZZA ")
            .await
            .unwrap();
        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Finished);
        assert!(!with_slot(&state, "ROOM", |slot| slot.has_final_guess_timeout()).await);
        assert!(room.players.iter().all(|p| p.points == 0));

        tokio::time::sleep(Duration::from_secs(36)).await;

        let room = state.get_room("ROOM").await.unwrap();
        assert!(room.players.iter().all(|p| p.points == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caught_impostor_wrong_guess() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 4).await;
        everyone_votes_for(&state, &ids, &impostor).await;

        state
            .submit_final_guess("ROOM", &impostor, "pasta")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(36)).await;

        let room = state.get_room("ROOM").await.unwrap();
        for (id, pts) in points(&room) {
            assert_eq!(pts, if id == impostor { 0 } else { 2 });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_guess_authorization() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 3).await;
        let detective = ids.iter().find(|id| **id != impostor).unwrap().clone();

        assert_eq!(
            state.submit_final_guess("ROOM", &impostor, "pizza").await,
            Err(GameError::WrongPhase("No final guess is pending"))
        );

        everyone_votes_for(&state, &ids, &impostor).await;
        assert_eq!(
            state.submit_final_guess("ROOM", &detective, "pizza").await,
            Err(GameError::NotImpostor)
        );
        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::FinalGuess);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_impostor_times_out() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 4).await;
        everyone_votes_for(&state, &ids, &impostor).await;

        tokio::time::sleep(Duration::from_secs(34)).await;
        assert_eq!(
            state.get_room("ROOM").await.unwrap().game_state,
            GameState::FinalGuess
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            state.get_room("ROOM").await.unwrap().game_state,
            GameState::Finished
        );

        tokio::time::sleep(Duration::from_secs(36)).await;
        let room = state.get_room("ROOM").await.unwrap();
        for (id, pts) in points(&room) {
            assert_eq!(pts, if id == impostor { 0 } else { 2 });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_arrive_before_points() {
        let state = fixed_state();
        let mut players = connected_players(&state, "ROOM", 3).await;
        let ids: Vec<PlayerId> = players.iter().map(|(id, _)| id.clone()).collect();
        state.start_game("ROOM", &ids[0]).await.unwrap();
        let impostor = state.get_room("ROOM").await.unwrap().impostor().unwrap().id.clone();
        let innocent = ids.iter().find(|id| **id != impostor).unwrap().clone();
        with_slot(&state, "ROOM", |slot| {
            let mut out = Outbox::new();
            state.enter_voting(slot, &mut out);
        })
        .await;
        everyone_votes_for(&state, &ids, &innocent).await;

        let watcher = &mut players[0].1;
        let messages = drain(watcher);
        let results = messages
            .iter()
            .find_map(|m| match m {
                ServerMessage::GameResults(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(results.winners, Winners::Impostor);
        assert_eq!(results.points.impostor_points, 2);
        assert!(results.game_ended);
        assert!(results.impostor_guess.is_none());
        match messages.last() {
            Some(ServerMessage::RoomUpdate(room)) => {
                assert!(room.players.iter().all(|p| p.points == 0))
            }
            other => panic!("Expected RoomUpdate, got {:?}", other),
        }

        tokio::time::sleep(Duration::from_secs(36)).await;
        let later = drain(watcher);
        assert_eq!(later.len(), 1);
        match &later[0] {
            ServerMessage::RoomUpdate(room) => {
                assert_eq!(room.player(&impostor).unwrap().points, 2);
            }
            other => panic!("Expected RoomUpdate, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_again_suppresses_pending_award() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 3).await;
        let innocent = ids.iter().find(|id| **id != impostor).unwrap().clone();
        everyone_votes_for(&state, &ids, &innocent).await;
        assert!(with_slot(&state, "ROOM", |slot| slot.has_pending_score_award()).await);

        state.play_again("ROOM", &ids[0]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Waiting);
        assert!(room.players.iter().all(|p| p.points == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_points_survive_reset_and_restart() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 3).await;
        let innocent = ids.iter().find(|id| **id != impostor).unwrap().clone();
        everyone_votes_for(&state, &ids, &innocent).await;
        tokio::time::sleep(Duration::from_secs(36)).await;

        let before = points(&state.get_room("ROOM").await.unwrap());
        state.play_again("ROOM", &ids[0]).await.unwrap();
        state.start_game("ROOM", &ids[0]).await.unwrap();

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Playing);
        assert_eq!(room.game_phase, GamePhase::Writing);
        assert_eq!(room.current_round, 1);
        assert_eq!(room.phase_time_left, 76);
        assert_eq!(room.players.iter().filter(|p| p.is_impostor).count(), 1);
        assert_eq!(points(&room), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_room_gets_no_award() {
        let state = fixed_state();
        let (ids, impostor) = in_voting(&state, 3).await;
        let innocent = ids.iter().find(|id| **id != impostor).unwrap().clone();
        everyone_votes_for(&state, &ids, &innocent).await;

        state.delete_room("ROOM").await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(state.get_room("ROOM").await.is_none());
    }
}
