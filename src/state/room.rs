use super::{AppState, RoomSlot};
use crate::broadcast::Outbox;
use crate::error::{GameError, GameResult};
use crate::types::*;
use crate::words::DEFAULT_CATEGORY;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

impl RoomSlot {
    /// Return the room to the lobby. Players, their points and the category
    /// selection survive; everything about the last game is dropped, including
    /// pending timers and score awards.
    pub fn reset_for_new_game(&mut self) {
        self.cancel_all();
        self.generation += 1;
        self.last_results = None;

        let room = &mut self.room;
        room.game_state = GameState::Waiting;
        room.game_phase = GamePhase::Waiting;
        room.current_round = 0;
        room.phase_time_left = 0;
        room.secret_word = None;
        room.category = None;
        room.clues.clear();
        room.current_round_clues.clear();
        room.votes.clear();
        room.next_round_votes.clear();
        room.ready_to_vote_votes.clear();

        for player in room.players.iter_mut() {
            player.is_impostor = false;
        }
    }
}

impl AppState {
    pub(super) fn new_room(&self, code: &str) -> Room {
        let selected_categories = if self.words.has_category(DEFAULT_CATEGORY) {
            vec![DEFAULT_CATEGORY.to_string()]
        } else {
            Vec::new()
        };

        Room {
            code: code.to_string(),
            players: Vec::new(),
            game_state: GameState::Waiting,
            game_phase: GamePhase::Waiting,
            current_round: 0,
            max_rounds: self.config.max_rounds,
            phase_time_left: 0,
            secret_word: None,
            category: None,
            clues: Vec::new(),
            current_round_clues: IndexMap::new(),
            votes: IndexMap::new(),
            next_round_votes: IndexSet::new(),
            ready_to_vote_votes: IndexSet::new(),
            selected_categories,
            available_groups: self.words.groups().to_vec(),
        }
    }

    fn ensure_room<'a>(
        &self,
        rooms: &'a mut HashMap<RoomCode, RoomSlot>,
        code: &str,
    ) -> &'a mut RoomSlot {
        rooms.entry(code.to_string()).or_insert_with(|| {
            tracing::info!("Created room {}", code);
            RoomSlot::new(self.new_room(code))
        })
    }

    /// Create a room, or return the existing one with that code
    pub async fn create_room(&self, code: &str) -> Room {
        let mut rooms = self.rooms.write().await;
        self.ensure_room(&mut rooms, code).room.clone()
    }

    /// Snapshot of a room
    pub async fn get_room(&self, code: &str) -> Option<Room> {
        self.rooms.read().await.get(code).map(|s| s.room.clone())
    }

    /// Remove a room and cancel everything scheduled for it
    pub async fn delete_room(&self, code: &str) -> bool {
        let removed = self.rooms.write().await.remove(code).is_some();
        if removed {
            tracing::info!("Deleted room {}", code);
        }
        removed
    }

    /// Code of the room a player currently sits in
    pub async fn room_of(&self, player_id: &str) -> Option<RoomCode> {
        let rooms = self.rooms.read().await;
        find_room_of(&rooms, player_id)
    }

    /// Join (or create) a room. Joining twice is harmless; joining a different
    /// room leaves the previous one first.
    pub async fn join_room(&self, code: &str, player_id: &str, name: &str) -> Room {
        let mut rooms = self.rooms.write().await;
        let mut out = Outbox::new();

        if let Some(previous) = find_room_of(&rooms, player_id) {
            if previous != code {
                tracing::info!("{} switches from room {} to {}", player_id, previous, code);
                self.remove_player(&mut rooms, &previous, player_id, &mut out);
            }
        }

        let slot = self.ensure_room(&mut rooms, code);
        if slot.room.player(player_id).is_none() {
            let is_host = slot.room.players.is_empty();
            slot.room.players.push(Player {
                id: player_id.to_string(),
                name: name.to_string(),
                is_host,
                is_impostor: false,
                points: 0,
            });
            tracing::info!(
                "{} joined room {} as {}",
                name,
                code,
                if is_host { "host" } else { "player" }
            );
        }

        out.room_update(&slot.room);
        let room = slot.room.clone();
        self.dispatch(out).await;
        room
    }

    /// Explicitly leave a room
    pub async fn leave_room(&self, code: &str, player_id: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get(code).ok_or(GameError::RoomNotFound)?;
        super::require_player(&slot.room, player_id)?;

        let mut out = Outbox::new();
        self.remove_player(&mut rooms, code, player_id, &mut out);
        self.dispatch(out).await;
        Ok(())
    }

    /// Connection went away: drop the player from whichever room holds it
    pub async fn disconnect(&self, player_id: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(code) = find_room_of(&rooms, player_id) else {
            return;
        };

        let mut out = Outbox::new();
        self.remove_player(&mut rooms, &code, player_id, &mut out);
        self.dispatch(out).await;
    }

    /// Remove a player, tear the room down when it empties, otherwise keep
    /// the host invariant and re-check the early-advance conditions. A game
    /// that loses its impostor goes back to the lobby.
    fn remove_player(
        &self,
        rooms: &mut HashMap<RoomCode, RoomSlot>,
        code: &str,
        player_id: &str,
        out: &mut Outbox,
    ) {
        let (now_empty, impostor_left) = {
            let Some(slot) = rooms.get_mut(code) else {
                return;
            };
            let Some(index) = slot.room.players.iter().position(|p| p.id == player_id) else {
                return;
            };
            let removed = slot.room.players.remove(index);
            tracing::info!("{} left room {}", removed.name, code);
            (
                slot.room.players.is_empty(),
                removed.is_impostor && slot.room.game_in_progress(),
            )
        };

        if now_empty {
            rooms.remove(code);
            tracing::info!("Room {} is empty, deleted", code);
            return;
        }

        let Some(slot) = rooms.get_mut(code) else {
            return;
        };
        let room = &mut slot.room;
        room.current_round_clues.shift_remove(player_id);
        room.next_round_votes.shift_remove(player_id);
        room.ready_to_vote_votes.shift_remove(player_id);
        room.votes.shift_remove(player_id);
        room.votes.retain(|_, suspect| suspect.as_str() != player_id);

        if room.host().is_none() {
            if let Some(first) = room.players.first_mut() {
                first.is_host = true;
                tracing::info!("{} is the new host of room {}", first.name, code);
            }
        }

        if impostor_left {
            tracing::warn!("Impostor left room {} mid-game, back to the lobby", code);
            slot.reset_for_new_game();
        } else {
            self.recheck_after_departure(slot, out);
        }
        out.room_update(&slot.room);
    }

    /// Host chooses which categories the next secret word is drawn from
    pub async fn update_categories(
        &self,
        code: &str,
        player_id: &str,
        category_ids: Vec<CategoryId>,
    ) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        let player = super::require_player(&slot.room, player_id)?;
        if !player.is_host {
            return Err(GameError::NotHost("change categories"));
        }
        if slot.room.game_in_progress() {
            return Err(GameError::WrongPhase(
                "Cannot change categories while a game is running",
            ));
        }
        if category_ids.is_empty() {
            return Err(GameError::InvalidInput(
                "Select at least one category".to_string(),
            ));
        }
        if let Some(unknown) = category_ids.iter().find(|id| !self.words.has_category(id)) {
            return Err(GameError::InvalidInput(format!(
                "Unknown category: {}",
                unknown
            )));
        }

        tracing::info!("Room {} categories set to {:?}", code, category_ids);
        slot.room.selected_categories = category_ids;

        let mut out = Outbox::new();
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }
}

fn find_room_of(rooms: &HashMap<RoomCode, RoomSlot>, player_id: &str) -> Option<RoomCode> {
    rooms
        .iter()
        .find(|(_, slot)| slot.room.player(player_id).is_some())
        .map(|(code, _)| code.clone())
}
