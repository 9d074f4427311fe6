//! Phase countdowns and deferred jobs
//!
//! Each room owns at most one [`PhaseTimer`]. Starting a timer replaces the
//! previous handle, and dropping a handle aborts its task. A task that wakes up
//! after its handle was replaced notices the id mismatch and exits without
//! touching the room.

use super::{AppState, RoomSlot};
use crate::broadcast::Outbox;
use crate::protocol::ServerMessage;
use crate::types::GamePhase;
use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant};

/// What happens when a phase countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseExpiry {
    /// Writing ran out: backfill empty clues and move on
    AdvanceToDecision,
    /// Nobody reached a majority in the decision phase
    AdvanceToNextRound,
    /// Elimination voting ran out: tally whatever votes exist
    TallyVotes,
}

/// Handle to a spawned task. Dropping it aborts the task.
#[derive(Debug)]
pub struct ScheduledTask {
    id: u64,
    abort: Option<AbortHandle>,
}

impl ScheduledTask {
    pub fn spawn<F>(id: u64, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        Self {
            id,
            abort: Some(handle.abort_handle()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Release the handle without aborting. The task calls this on itself
    /// right before it runs its completion logic.
    pub fn complete(mut self) {
        self.abort = None;
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
    }
}

/// The active countdown of a room
#[derive(Debug)]
pub(super) struct PhaseTimer {
    task: ScheduledTask,
    expiry: PhaseExpiry,
}

impl RoomSlot {
    /// Whether `task_id` is still the room's active countdown
    fn owns_timer(&self, task_id: u64) -> bool {
        self.timer.as_ref().map(|t| t.task.id()) == Some(task_id)
    }

    pub fn timer_expiry(&self) -> Option<PhaseExpiry> {
        self.timer.as_ref().map(|t| t.expiry)
    }

    /// Cancel the active countdown, if any
    pub(super) fn clear_timer(&mut self) {
        self.timer = None;
    }
}

impl AppState {
    /// Countdown length for a phase. Only the first writing phase of a game
    /// gets the intro buffer.
    pub fn phase_duration(&self, phase: GamePhase, first_round: bool) -> u32 {
        match phase {
            GamePhase::Writing if first_round => {
                self.config.writing_seconds + self.config.intro_buffer_seconds
            }
            GamePhase::Writing => self.config.writing_seconds,
            GamePhase::Decision => self.config.decision_seconds,
            GamePhase::Voting => self.config.voting_seconds,
            GamePhase::Waiting => 0,
        }
    }

    /// Replace the room's countdown with a fresh one and emit the first tick
    pub(super) fn start_phase_timer(
        &self,
        slot: &mut RoomSlot,
        duration: u32,
        expiry: PhaseExpiry,
        out: &mut Outbox,
    ) {
        slot.clear_timer();

        slot.room.phase_time_left = duration;
        out.to_room(
            &slot.room,
            ServerMessage::TimerUpdate {
                time_left: duration,
                phase: slot.room.game_phase,
            },
        );

        let id = self.next_task_id();
        let state = self.clone();
        let code = slot.room.code.clone();
        tracing::debug!(
            "Starting {:?} timer for room {}: {}s (task {})",
            slot.room.game_phase,
            code,
            duration,
            id
        );

        let task = ScheduledTask::spawn(id, async move {
            state.run_phase_timer(code, id).await;
        });
        slot.timer = Some(PhaseTimer { task, expiry });
    }

    async fn run_phase_timer(&self, code: String, task_id: u64) {
        let period = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;

            let mut rooms = self.rooms.write().await;
            let Some(slot) = rooms.get_mut(&code) else {
                return;
            };
            if !slot.owns_timer(task_id) {
                tracing::warn!("Stale timer {} for room {} exiting", task_id, code);
                return;
            }

            let mut out = Outbox::new();
            slot.room.phase_time_left = slot.room.phase_time_left.saturating_sub(1);
            out.to_room(
                &slot.room,
                ServerMessage::TimerUpdate {
                    time_left: slot.room.phase_time_left,
                    phase: slot.room.game_phase,
                },
            );

            if slot.room.phase_time_left == 0 {
                let Some(timer) = slot.timer.take() else {
                    return;
                };
                let expiry = timer.expiry;
                timer.task.complete();

                tracing::info!("Timer expired in room {}: {:?}", code, expiry);
                self.on_phase_expired(slot, expiry, &mut out);
                out.room_update(&slot.room);
                self.dispatch(out).await;
                return;
            }

            self.dispatch(out).await;
        }
    }

    /// Cancel the active countdown of a room. No-op if there is none.
    pub async fn clear_timer(&self, code: &str) {
        if let Some(slot) = self.rooms.write().await.get_mut(code) {
            slot.clear_timer();
        }
    }

    /// Seconds left in the room's current phase
    pub async fn remaining_time(&self, code: &str) -> u32 {
        self.rooms
            .read()
            .await
            .get(code)
            .map(|s| s.room.phase_time_left)
            .unwrap_or(0)
    }

    pub async fn has_active_timer(&self, code: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(code)
            .map(|s| s.has_active_timer())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::types::GameState;

    #[test]
    fn test_phase_durations() {
        let state = AppState::new();
        assert_eq!(state.phase_duration(GamePhase::Writing, true), 76);
        assert_eq!(state.phase_duration(GamePhase::Writing, false), 60);
        assert_eq!(state.phase_duration(GamePhase::Decision, false), 120);
        assert_eq!(state.phase_duration(GamePhase::Voting, false), 180);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_timer_is_idempotent() {
        let state = fixed_state();
        room_with_players(&state, "ROOM", 3).await;

        assert!(!state.has_active_timer("ROOM").await);
        state.clear_timer("ROOM").await;
        state.clear_timer("ROOM").await;
        state.clear_timer("NOPE").await;

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Waiting);
        assert_eq!(room.phase_time_left, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_down_once_per_second() {
        let state = fixed_state();
        started_game(&state, "ROOM", 3).await;
        assert_eq!(state.remaining_time("ROOM").await, 76);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(state.remaining_time("ROOM").await, 66);
        assert!(state.has_active_timer("ROOM").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_sent_immediately() {
        let state = fixed_state();
        let ids = room_with_players(&state, "ROOM", 3).await;
        let (conn, mut rx) = state.open_connection().await;
        state.join_room("ROOM", &conn, "Watcher").await;
        while rx.try_recv().is_ok() {}

        state.start_game("ROOM", &ids[0]).await.unwrap();

        let mut saw_tick = false;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::TimerUpdate { time_left, phase } = msg {
                assert_eq!(time_left, 76);
                assert_eq!(phase, GamePhase::Writing);
                saw_tick = true;
            }
        }
        assert!(saw_tick);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_timer_never_fires() {
        let state = fixed_state();
        started_game(&state, "ROOM", 3).await;
        state.clear_timer("ROOM").await;

        tokio::time::sleep(Duration::from_secs(200)).await;

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_phase, GamePhase::Writing);
        assert_eq!(room.current_round, 1);
        assert_eq!(room.phase_time_left, 76);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_room_stops_timer() {
        let state = fixed_state();
        started_game(&state, "ROOM", 3).await;
        assert!(state.delete_room("ROOM").await);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert!(state.get_room("ROOM").await.is_none());
    }
}
