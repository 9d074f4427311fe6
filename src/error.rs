use crate::protocol::ServerMessage;

/// Result type for room commands
pub type GameResult<T> = Result<T, GameError>;

/// Reasons a command is rejected. Every rejection leaves the room untouched
/// and is reported privately to the sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Player not found in room")]
    PlayerNotFound,

    #[error("Suspected player not found in room")]
    SuspectNotFound,

    #[error("Cannot start game: not enough players (need at least {required})")]
    NotEnoughPlayers { required: usize },

    #[error("{0}")]
    WrongPhase(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("Only the impostor can submit a final guess")]
    NotImpostor,
}

impl GameError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound => "ROOM_NOT_FOUND",
            GameError::PlayerNotFound => "PLAYER_NOT_FOUND",
            GameError::SuspectNotFound => "SUSPECT_NOT_FOUND",
            GameError::NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            GameError::WrongPhase(_) => "WRONG_PHASE",
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::NotHost(_) => "UNAUTHORIZED",
            GameError::NotImpostor => "UNAUTHORIZED",
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(err: GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
