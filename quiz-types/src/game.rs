use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{RoomSettings, UserId};

/// The single live question. Superseded by the next question or cleared at game end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Question {
    pub question_number: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub question: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    pub time_limit: u32, // seconds
}

/// Final per-player outcome, produced once when a game ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameResult {
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    pub final_score: i32,
    #[serde(default)]
    pub accuracy: f64, // percentage
    #[serde(default)]
    pub average_time_to_answer: f64,
    #[serde(default)]
    pub fastest_answer: f64,
    pub rank: u32, // 1 = winner
}

/// A finished game as returned by the history and results endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub room_id: String,
    pub players: Vec<GameResult>,
    #[serde(default)]
    pub winner: UserId,
    pub settings: RoomSettings,
    #[serde(default)]
    pub finished_at: String,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub total_games: u32,
    #[serde(default)]
    pub total_wins: u32,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub avg_accuracy: f64,
    #[serde(default)]
    pub avg_time_to_answer: f64,
}

/// New running score for one player, as pushed by `game:scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerScore {
    pub user_id: UserId,
    pub score: i32,
}

/// Stage of the room view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Phase {
    Waiting,
    Countdown,
    Playing,
    Results,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Phase::Waiting => "waiting",
            Phase::Countdown => "countdown",
            Phase::Playing => "playing",
            Phase::Results => "results",
        };
        f.write_str(label)
    }
}
