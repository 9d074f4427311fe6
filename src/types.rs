use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type ConnectionId = String;
pub type CategoryId = String;

/// Coarse lifecycle of a room
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    Waiting,
    Playing,
    Voting,
    FinalGuess,
    Finished,
}

/// Sub-phase while a game is running
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Waiting,
    Writing,
    Decision,
    Voting,
}

/// Fixed game rules. Not runtime-configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub writing_seconds: u32,
    pub decision_seconds: u32,
    pub voting_seconds: u32,
    pub final_guess_seconds: u32,
    /// Extra wait after the final-guess window before an empty guess is submitted
    pub final_guess_grace_seconds: u32,
    /// Added to the first writing phase of a game to cover the client intro sequence
    pub intro_buffer_seconds: u32,
    /// Delay between the results broadcast and the points being applied
    pub score_reveal_delay_seconds: u32,
    pub max_rounds: u32,
    pub min_players: usize,
    pub max_clue_chars: usize,
    pub max_name_chars: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            writing_seconds: 60,
            decision_seconds: 120,
            voting_seconds: 180,
            final_guess_seconds: 30,
            final_guess_grace_seconds: 5,
            intro_buffer_seconds: 16,
            score_reveal_delay_seconds: 35,
            max_rounds: 5,
            min_players: 3,
            max_clue_chars: 100,
            max_name_chars: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_impostor: bool,
    /// Accumulated across every game played in the room
    pub points: u32,
}

/// One archived clue from a finished writing phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clue {
    pub player_id: PlayerId,
    pub player_name: String,
    pub clue: String,
    pub round: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    /// Join order
    pub players: Vec<Player>,
    pub game_state: GameState,
    pub game_phase: GamePhase,
    pub current_round: u32,
    pub max_rounds: u32,
    pub phase_time_left: u32,
    pub secret_word: Option<String>,
    pub category: Option<String>,
    pub clues: Vec<Clue>,
    pub current_round_clues: IndexMap<PlayerId, String>,
    /// voter -> suspected impostor, in first-vote order
    pub votes: IndexMap<PlayerId, PlayerId>,
    pub next_round_votes: IndexSet<PlayerId>,
    pub ready_to_vote_votes: IndexSet<PlayerId>,
    pub selected_categories: Vec<CategoryId>,
    pub available_groups: Vec<CategoryGroup>,
}

impl Room {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn impostor(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_impostor)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    /// True while a game is between `startGame` and `finished`
    pub fn game_in_progress(&self) -> bool {
        matches!(
            self.game_state,
            GameState::Playing | GameState::Voting | GameState::FinalGuess
        )
    }
}

/// A secret word together with the hint shown to the impostor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordPair {
    pub word: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub words: Vec<WordPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<WordCategory>,
}
