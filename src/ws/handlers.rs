//! WebSocket message dispatch
//!
//! Inbound commands are validated here and handed to the room engine. The
//! sender's connection id doubles as its player id. Successful commands
//! produce no direct reply: their effects reach the client through the
//! broadcasts the engine queues. Rejections are answered privately.

use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::RoomCode;
use std::sync::Arc;

/// Upper bound for room codes
pub const MAX_ROOM_CODE_CHARS: usize = 12;

/// Handle a client message and return an optional private reply
pub async fn handle_message(
    msg: ClientMessage,
    conn: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match dispatch(msg, conn, state).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Rejected command from {}: {}", conn, e);
            Some(e.into())
        }
    }
}

async fn dispatch(msg: ClientMessage, conn: &str, state: &Arc<AppState>) -> GameResult<()> {
    let code = normalize_room_code(msg.room_code())?;

    match msg {
        ClientMessage::JoinRoom { player_name, .. } => {
            handle_join_room(state, conn, &player_name, &code).await
        }
        ClientMessage::StartGame { .. } => state.start_game(&code, conn).await,
        ClientMessage::SubmitClue { clue, .. } => state.submit_clue(&code, conn, &clue).await,
        ClientMessage::VoteNextRound { .. } => state.vote_next_round(&code, conn).await,
        ClientMessage::VoteReadyToVote { .. } => state.vote_ready_to_vote(&code, conn).await,
        ClientMessage::SubmitVote {
            suspected_impostor_id,
            ..
        } => state.submit_vote(&code, conn, &suspected_impostor_id).await,
        ClientMessage::SubmitFinalGuess { guess, .. } => {
            state.submit_final_guess(&code, conn, &guess).await
        }
        ClientMessage::PlayAgain { .. } => state.play_again(&code, conn).await,
        ClientMessage::UpdateCategories { category_ids, .. } => {
            state.update_categories(&code, conn, category_ids).await
        }
        ClientMessage::LeaveRoom { .. } => state.leave_room(&code, conn).await,
    }
}

async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &str,
    player_name: &str,
    code: &str,
) -> GameResult<()> {
    let name = player_name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidInput("Player name is required".to_string()));
    }
    if name.chars().count() > state.config.max_name_chars {
        return Err(GameError::InvalidInput(format!(
            "Player name is longer than {} characters",
            state.config.max_name_chars
        )));
    }

    tracing::info!("{} wants to join room {} as {}", conn, code, name);
    state.join_room(code, conn, name).await;
    Ok(())
}

/// Trim a room code and check its length
pub fn normalize_room_code(code: &str) -> GameResult<RoomCode> {
    let code = code.trim();
    if code.is_empty() {
        return Err(GameError::InvalidInput("Room code is required".to_string()));
    }
    if code.chars().count() > MAX_ROOM_CODE_CHARS {
        return Err(GameError::InvalidInput(format!(
            "Room code is longer than {} characters",
            MAX_ROOM_CODE_CHARS
        )));
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameState;

    fn join(name: &str, code: &str) -> ClientMessage {
        ClientMessage::JoinRoom {
            player_name: name.to_string(),
            room_code: code.to_string(),
        }
    }

    fn error_code(reply: Option<ServerMessage>) -> String {
        match reply {
            Some(ServerMessage::Error { code, .. }) => code,
            other => panic!("Expected Error message, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_room_code() {
        assert_eq!(normalize_room_code("  AB12 ").unwrap(), "AB12");
        assert!(normalize_room_code("   ").is_err());
        assert!(normalize_room_code("ABCDEFGHIJKLM").is_err());
    }

    #[tokio::test]
    async fn test_join_creates_room_and_trims_name() {
        let state = Arc::new(AppState::new());

        let reply = handle_message(join("  Alice ", " ROOM "), "c1", &state).await;
        assert!(reply.is_none());

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.players[0].name, "Alice");
        assert!(room.players[0].is_host);
    }

    #[tokio::test]
    async fn test_join_rejects_bad_names() {
        let state = Arc::new(AppState::new());

        let reply = handle_message(join("   ", "ROOM"), "c1", &state).await;
        assert_eq!(error_code(reply), "INVALID_INPUT");

        let long = "x".repeat(25);
        let reply = handle_message(join(&long, "ROOM"), "c1", &state).await;
        assert_eq!(error_code(reply), "INVALID_INPUT");

        assert!(state.get_room("ROOM").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_room_is_rejected() {
        let state = Arc::new(AppState::new());

        let reply = handle_message(
            ClientMessage::StartGame {
                room_code: "NOPE".to_string(),
            },
            "c1",
            &state,
        )
        .await;
        assert_eq!(error_code(reply), "ROOM_NOT_FOUND");
        assert_eq!(state.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_start_game_requires_host() {
        let state = Arc::new(AppState::new());
        for (conn, name) in [("c1", "A"), ("c2", "B"), ("c3", "C")] {
            handle_message(join(name, "ROOM"), conn, &state).await;
        }

        let reply = handle_message(
            ClientMessage::StartGame {
                room_code: "ROOM".to_string(),
            },
            "c2",
            &state,
        )
        .await;
        assert_eq!(error_code(reply), "UNAUTHORIZED");

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.game_state, GameState::Waiting);
    }

    #[tokio::test]
    async fn test_stranger_cannot_act_in_room() {
        let state = Arc::new(AppState::new());
        handle_message(join("A", "ROOM"), "c1", &state).await;

        let reply = handle_message(
            ClientMessage::SubmitClue {
                clue: "hello".to_string(),
                room_code: "ROOM".to_string(),
            },
            "stranger",
            &state,
        )
        .await;
        assert_eq!(error_code(reply), "PLAYER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_leave_room_keeps_other_players() {
        let state = Arc::new(AppState::new());
        handle_message(join("A", "ROOM"), "c1", &state).await;
        handle_message(join("B", "ROOM"), "c2", &state).await;

        let reply = handle_message(
            ClientMessage::LeaveRoom {
                room_code: "ROOM".to_string(),
            },
            "c1",
            &state,
        )
        .await;
        assert!(reply.is_none());

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].is_host);
    }

    #[tokio::test]
    async fn test_every_command_checks_room_code() {
        let state = Arc::new(AppState::new());
        handle_message(join("A", "ROOM"), "c1", &state).await;

        let blank = || "   ".to_string();
        let commands = vec![
            join("B", &blank()),
            ClientMessage::StartGame { room_code: blank() },
            ClientMessage::SubmitClue {
                clue: "hello".to_string(),
                room_code: blank(),
            },
            ClientMessage::VoteNextRound { room_code: blank() },
            ClientMessage::VoteReadyToVote { room_code: blank() },
            ClientMessage::SubmitVote {
                suspected_impostor_id: "c1".to_string(),
                room_code: blank(),
            },
            ClientMessage::SubmitFinalGuess {
                guess: "pizza".to_string(),
                room_code: blank(),
            },
            ClientMessage::PlayAgain { room_code: blank() },
            ClientMessage::UpdateCategories {
                room_code: "X".repeat(MAX_ROOM_CODE_CHARS + 1),
                category_ids: vec!["food".to_string()],
            },
            ClientMessage::LeaveRoom { room_code: blank() },
        ];
        for command in commands {
            let reply = handle_message(command, "c1", &state).await;
            assert_eq!(error_code(reply), "INVALID_INPUT");
        }

        let room = state.get_room("ROOM").await.unwrap();
        assert_eq!(room.players.len(), 1);
    }
}
