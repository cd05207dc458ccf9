use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{RoomCode, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_code: RoomCode,
    pub host_id: UserId,
    pub players: Vec<Player>,
    pub settings: RoomSettings,
    pub status: RoomStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<u32>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: String, // ISO 8601 string
}

impl Room {
    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn has_player(&self, user_id: &str) -> bool {
        self.player(user_id).is_some()
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// Every non-host player is ready. The host's own ready flag is ignored.
    pub fn all_players_ready(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.is_ready || p.user_id == self.host_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub is_connected: bool,
    /// Reset for every player whenever a new question is delivered.
    #[serde(default)]
    pub has_answered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomSettings {
    pub category: String,
    pub difficulty: Difficulty,
    pub number_of_questions: u32,
    pub time_per_question: u32,
}

impl RoomSettings {
    /// Rough wall-clock length of a game in whole minutes, rounded up.
    pub fn estimated_minutes(&self) -> u32 {
        (self.number_of_questions * self.time_per_question).div_ceil(60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoomStatus {
    Waiting,  // Lobby, players joining and readying up
    Playing,  // Questions are being delivered
    Finished, // Results available
}

/// One player's answer to one question. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Answer {
    pub question_index: u32,
    pub selected_answer: String,
    pub is_correct: bool,
    pub time_to_answer: f64,
    pub points_earned: i32,
}
