mod game;
mod room;
mod score;
mod timer;
mod vote;

pub use score::{award_for, is_correct_guess};
pub use timer::{PhaseExpiry, ScheduledTask};
pub use vote::{tabulate, DecisionChoice};

use crate::protocol::{ServerMessage, VotingResults};
use crate::types::*;
use crate::words::{WordBank, WordSupply};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// A room together with the tasks that act on it.
///
/// Tasks are owned by the slot: replacing or dropping a handle aborts the task,
/// so deleting a room tears down its timers.
pub struct RoomSlot {
    pub room: Room,
    timer: Option<timer::PhaseTimer>,
    final_guess_timeout: Option<ScheduledTask>,
    score_award: Option<ScheduledTask>,
    /// Bumped whenever a game starts or the room is reset; deferred jobs
    /// carry the generation they were scheduled in
    generation: u64,
    /// Tabulation of the last elimination vote, reused for the final results
    last_results: Option<VotingResults>,
}

impl RoomSlot {
    fn new(room: Room) -> Self {
        Self {
            room,
            timer: None,
            final_guess_timeout: None,
            score_award: None,
            generation: 0,
            last_results: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if a phase countdown is running
    pub fn has_active_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn has_pending_score_award(&self) -> bool {
        self.score_award.is_some()
    }

    pub fn has_final_guess_timeout(&self) -> bool {
        self.final_guess_timeout.is_some()
    }

    /// Cancel the phase timer and every deferred job
    fn cancel_all(&mut self) {
        self.timer = None;
        self.final_guess_timeout = None;
        self.score_award = None;
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, RoomSlot>>>,
    /// Outbound channel of every open connection
    pub connections: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>>,
    pub words: Arc<dyn WordSupply>,
    pub config: GameConfig,
    next_task_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_words(Arc::new(WordBank::new()))
    }

    pub fn with_words(words: Arc<dyn WordSupply>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
            words,
            config: GameConfig::default(),
            next_task_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_task_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a player in the room or fail with `PlayerNotFound`
fn require_player<'a>(room: &'a Room, id: &str) -> crate::error::GameResult<&'a Player> {
    room.player(id).ok_or(crate::error::GameError::PlayerNotFound)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::WordPair;

    /// Always hands out the same word
    pub struct FixedWord(pub &'static str, pub &'static str);

    impl WordSupply for FixedWord {
        fn random_word(&self, _category_ids: &[CategoryId]) -> WordPair {
            WordPair {
                word: self.0.to_string(),
                category: self.1.to_string(),
            }
        }

        fn groups(&self) -> &[CategoryGroup] {
            &[]
        }
    }

    pub fn fixed_state() -> AppState {
        AppState::with_words(Arc::new(FixedWord("Pizza", "Italian food")))
    }

    /// Create a room with `n` joined players ("p1".."pN"); p1 is host
    pub async fn room_with_players(state: &AppState, code: &str, n: usize) -> Vec<PlayerId> {
        let mut ids = Vec::new();
        for i in 1..=n {
            let id = format!("p{}", i);
            state.join_room(code, &id, &format!("Player {}", i)).await;
            ids.push(id);
        }
        ids
    }

    /// Join `n` real connections to a room; the first one is host
    pub async fn connected_players(
        state: &AppState,
        code: &str,
        n: usize,
    ) -> Vec<(PlayerId, mpsc::UnboundedReceiver<ServerMessage>)> {
        let mut players = Vec::new();
        for i in 1..=n {
            let (id, rx) = state.open_connection().await;
            state.join_room(code, &id, &format!("Player {}", i)).await;
            players.push((id, rx));
        }
        players
    }

    /// Everything queued for a connection so far
    pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Hand the impostor role to a chosen player
    pub async fn assign_impostor(state: &AppState, code: &str, impostor: &str) {
        with_slot(state, code, |slot| {
            for player in slot.room.players.iter_mut() {
                player.is_impostor = player.id == impostor;
            }
        })
        .await;
    }

    /// Run a closure against the live slot of a room
    pub async fn with_slot<R>(state: &AppState, code: &str, f: impl FnOnce(&mut RoomSlot) -> R) -> R {
        let mut rooms = state.rooms.write().await;
        f(rooms.get_mut(code).expect("room exists"))
    }

    /// Start a game in a room with `n` players and return the impostor id
    pub async fn started_game(state: &AppState, code: &str, n: usize) -> (Vec<PlayerId>, PlayerId) {
        let ids = room_with_players(state, code, n).await;
        state.start_game(code, &ids[0]).await.unwrap();
        let room = state.get_room(code).await.unwrap();
        let impostor = room.impostor().unwrap().id.clone();
        (ids, impostor)
    }
}
