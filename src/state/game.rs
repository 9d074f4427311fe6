//! Phase engine
//!
//! Every transition runs with the room's slot borrowed mutably from under the
//! rooms write lock. Transitions check the phase they expect on entry, so the
//! early-advance path and the timer path can both call them and only the first
//! one has an effect.

use super::{require_player, AppState, PhaseExpiry, RoomSlot};
use crate::broadcast::Outbox;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;

impl AppState {
    /// Host starts a game from the lobby
    pub async fn start_game(&self, code: &str, player_id: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        let player = require_player(&slot.room, player_id)?;
        if !player.is_host {
            return Err(GameError::NotHost("start the game"));
        }
        if slot.room.game_state != GameState::Waiting {
            return Err(GameError::WrongPhase("Game has already started"));
        }
        if slot.room.players.len() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                required: self.config.min_players,
            });
        }

        let mut out = Outbox::new();
        self.begin_game(slot, &mut out);
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }

    fn begin_game(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        slot.cancel_all();
        slot.generation += 1;
        slot.last_results = None;

        let pair = self.words.random_word(&slot.room.selected_categories);
        let impostor_index = rand::rng().random_range(0..slot.room.players.len());

        let room = &mut slot.room;
        for (i, player) in room.players.iter_mut().enumerate() {
            player.is_impostor = i == impostor_index;
        }
        room.secret_word = Some(pair.word.clone());
        room.category = Some(pair.category.clone());
        room.game_state = GameState::Playing;
        room.game_phase = GamePhase::Writing;
        room.current_round = 1;
        room.clues.clear();
        room.current_round_clues.clear();
        room.votes.clear();
        room.next_round_votes.clear();
        room.ready_to_vote_votes.clear();

        tracing::info!(
            "Game started in room {} with {} players (generation {})",
            room.code,
            room.players.len(),
            slot.generation
        );

        for player in &slot.room.players {
            let role = if player.is_impostor {
                ServerMessage::RoleAssignment {
                    is_impostor: true,
                    category: Some(pair.category.clone()),
                    word: None,
                }
            } else {
                ServerMessage::RoleAssignment {
                    is_impostor: false,
                    category: None,
                    word: Some(pair.word.clone()),
                }
            };
            out.to_player(&player.id, role);
        }

        let duration = self.phase_duration(GamePhase::Writing, true);
        self.start_phase_timer(slot, duration, PhaseExpiry::AdvanceToDecision, out);
    }

    /// Record (or replace) a player's clue for the current round
    pub async fn submit_clue(&self, code: &str, player_id: &str, clue: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        require_player(&slot.room, player_id)?;
        if slot.room.game_state != GameState::Playing || slot.room.game_phase != GamePhase::Writing
        {
            return Err(GameError::WrongPhase("Clues can only be submitted while writing"));
        }

        let clue = clue.trim();
        if clue.is_empty() {
            return Err(GameError::InvalidInput("Clue cannot be empty".to_string()));
        }
        if clue.chars().count() > self.config.max_clue_chars {
            return Err(GameError::InvalidInput(format!(
                "Clue is longer than {} characters",
                self.config.max_clue_chars
            )));
        }

        slot.room
            .current_round_clues
            .insert(player_id.to_string(), clue.to_string());
        tracing::debug!(
            "Clue from {} in room {} ({}/{})",
            player_id,
            code,
            slot.room.current_round_clues.len(),
            slot.room.players.len()
        );

        let mut out = Outbox::new();
        self.check_all_clues_submitted(slot, &mut out);
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }

    pub(super) fn check_all_clues_submitted(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        let room = &slot.room;
        let all_in = !room.players.is_empty()
            && room
                .players
                .iter()
                .all(|p| room.current_round_clues.contains_key(&p.id));

        if all_in {
            tracing::info!("All clues in for room {}, advancing early", room.code);
            self.enter_decision(slot, out);
        }
    }

    /// Close the writing phase: backfill missing clues, archive the round and
    /// move on to the decision phase (or straight to voting after the last round)
    fn enter_decision(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        if slot.room.game_state != GameState::Playing || slot.room.game_phase != GamePhase::Writing
        {
            return;
        }
        slot.clear_timer();

        let room = &mut slot.room;
        let round = room.current_round;
        let archived: Vec<Clue> = room
            .players
            .iter()
            .map(|p| Clue {
                player_id: p.id.clone(),
                player_name: p.name.clone(),
                clue: room
                    .current_round_clues
                    .get(&p.id)
                    .cloned()
                    .unwrap_or_default(),
                round,
            })
            .collect();
        room.clues.extend(archived.iter().cloned());
        room.current_round_clues.clear();
        room.next_round_votes.clear();
        room.ready_to_vote_votes.clear();

        if room.current_round >= room.max_rounds {
            tracing::info!("Room {} finished round {}, going to the vote", room.code, round);
            self.enter_voting(slot, out);
            return;
        }

        room.game_phase = GamePhase::Decision;
        tracing::info!("Room {} entered decision after round {}", room.code, round);
        out.to_room(
            room,
            ServerMessage::RoundComplete {
                round,
                clues: archived,
            },
        );

        let duration = self.phase_duration(GamePhase::Decision, false);
        self.start_phase_timer(slot, duration, PhaseExpiry::AdvanceToNextRound, out);
    }

    pub(super) fn advance_to_next_round(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        if slot.room.game_state != GameState::Playing
            || slot.room.game_phase != GamePhase::Decision
        {
            return;
        }
        slot.clear_timer();

        let room = &mut slot.room;
        room.current_round += 1;
        room.game_phase = GamePhase::Writing;
        room.next_round_votes.clear();
        room.ready_to_vote_votes.clear();
        tracing::info!("Room {} starts round {}", room.code, room.current_round);

        let duration = self.phase_duration(GamePhase::Writing, false);
        self.start_phase_timer(slot, duration, PhaseExpiry::AdvanceToDecision, out);
    }

    pub(super) fn enter_voting(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        if slot.room.game_state != GameState::Playing {
            return;
        }
        slot.clear_timer();

        let room = &mut slot.room;
        room.game_state = GameState::Voting;
        room.game_phase = GamePhase::Voting;
        room.votes.clear();
        tracing::info!("Room {} entered elimination voting", room.code);
        out.to_room(room, ServerMessage::VotingPhase);

        let duration = self.phase_duration(GamePhase::Voting, false);
        self.start_phase_timer(slot, duration, PhaseExpiry::TallyVotes, out);
    }

    /// Countdown reached zero without an early advance
    pub(super) fn on_phase_expired(&self, slot: &mut RoomSlot, expiry: PhaseExpiry, out: &mut Outbox) {
        match expiry {
            PhaseExpiry::AdvanceToDecision => self.enter_decision(slot, out),
            PhaseExpiry::AdvanceToNextRound => self.advance_to_next_round(slot, out),
            PhaseExpiry::TallyVotes => self.resolve_voting(slot, out),
        }
    }

    /// A player left mid-game; the remaining players may now satisfy an
    /// early-advance condition
    pub(super) fn recheck_after_departure(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        match (slot.room.game_state, slot.room.game_phase) {
            (GameState::Playing, GamePhase::Writing) => self.check_all_clues_submitted(slot, out),
            (GameState::Playing, GamePhase::Decision) => self.check_decision_votes(slot, out),
            (GameState::Voting, _) => self.check_all_votes_submitted(slot, out),
            _ => {}
        }
    }

    /// Host sends a finished room back to the lobby
    pub async fn play_again(&self, code: &str, player_id: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        let player = require_player(&slot.room, player_id)?;
        if !player.is_host {
            return Err(GameError::NotHost("start a new game"));
        }
        if slot.room.game_state != GameState::Finished {
            return Err(GameError::WrongPhase("Game is not finished yet"));
        }

        if slot.has_pending_score_award() {
            tracing::warn!("Room {} reset before points were awarded", code);
        }
        slot.reset_for_new_game();
        tracing::info!("Room {} back in the lobby", code);

        let mut out = Outbox::new();
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }
}
