use crate::types::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Wire protocol version announced in the welcome message
pub const PROTOCOL_VERSION: &str = "1.0";

/// Commands sent by clients. The sender is the connection the frame arrived on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        player_name: String,
        room_code: RoomCode,
    },
    StartGame {
        room_code: RoomCode,
    },
    SubmitClue {
        clue: String,
        room_code: RoomCode,
    },
    VoteNextRound {
        room_code: RoomCode,
    },
    VoteReadyToVote {
        room_code: RoomCode,
    },
    SubmitVote {
        suspected_impostor_id: PlayerId,
        room_code: RoomCode,
    },
    SubmitFinalGuess {
        guess: String,
        room_code: RoomCode,
    },
    PlayAgain {
        room_code: RoomCode,
    },
    /// Host picks the word categories for the next game
    UpdateCategories {
        room_code: RoomCode,
        category_ids: Vec<CategoryId>,
    },
    /// Leave without closing the connection
    LeaveRoom {
        room_code: RoomCode,
    },
}

impl ClientMessage {
    /// Room the command is addressed to
    pub fn room_code(&self) -> &str {
        match self {
            ClientMessage::JoinRoom { room_code, .. }
            | ClientMessage::StartGame { room_code }
            | ClientMessage::SubmitClue { room_code, .. }
            | ClientMessage::VoteNextRound { room_code }
            | ClientMessage::VoteReadyToVote { room_code }
            | ClientMessage::SubmitVote { room_code, .. }
            | ClientMessage::SubmitFinalGuess { room_code, .. }
            | ClientMessage::PlayAgain { room_code }
            | ClientMessage::UpdateCategories { room_code, .. }
            | ClientMessage::LeaveRoom { room_code } => room_code,
        }
    }
}

/// Events pushed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Private: first frame on every connection
    Welcome {
        connection_id: ConnectionId,
        protocol: String,
    },
    /// Full room snapshot
    RoomUpdate(Room),
    /// Private: who you are this game
    RoleAssignment {
        is_impostor: bool,
        category: Option<String>,
        word: Option<String>,
    },
    TimerUpdate {
        time_left: u32,
        phase: GamePhase,
    },
    RoundComplete {
        round: u32,
        clues: Vec<Clue>,
    },
    VotingPhase,
    VotingResults(VotingResults),
    /// Private: sent to a caught impostor
    FinalGuessPrompt {
        secret_word: String,
        time_limit: u32,
    },
    GameResults(GameResults),
    /// Private: a rejected command
    Error {
        code: String,
        message: String,
    },
}

/// Public reference to a player inside results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VotedPlayer {
    pub id: PlayerId,
    pub name: String,
    pub is_impostor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImpostorInfo {
    pub id: PlayerId,
    pub name: String,
}

/// Tabulation of the elimination vote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VotingResults {
    /// suspect -> number of votes, in order of first vote received
    pub vote_counts: IndexMap<PlayerId, u32>,
    /// suspect -> names of the players who voted for them
    pub voter_names: IndexMap<PlayerId, Vec<String>>,
    pub most_voted_player: Option<VotedPlayer>,
    pub impostor: Option<ImpostorInfo>,
    pub impostor_caught: bool,
    pub secret_word: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winners {
    Impostor,
    Detectives,
    Tie,
}

/// Points each side receives once the reveal delay has elapsed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PointAward {
    pub impostor_points: u32,
    pub detective_points: u32,
}

/// Final outcome of a game. Carries the narrative only: player records are
/// updated later with a separate room update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameResults {
    #[serde(flatten)]
    pub voting: VotingResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impostor_guess: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_guess: Option<bool>,
    pub game_ended: bool,
    pub winners: Winners,
    pub points: PointAward,
}
