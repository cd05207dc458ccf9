use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>, // ISO 8601 string
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStats {
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longest_streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfect_games: Option<u32>,
}

/// Partial update of [`UserStats`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStatsPatch {
    pub games_played: Option<u32>,
    pub wins: Option<u32>,
    pub total_points: Option<i64>,
    pub win_rate: Option<f64>,
    pub highest_score: Option<i32>,
    pub longest_streak: Option<u32>,
    pub perfect_games: Option<u32>,
}

impl UserStats {
    pub fn apply(&mut self, patch: &UserStatsPatch) {
        if let Some(v) = patch.games_played {
            self.games_played = v;
        }
        if let Some(v) = patch.wins {
            self.wins = v;
        }
        if let Some(v) = patch.total_points {
            self.total_points = v;
        }
        if let Some(v) = patch.win_rate {
            self.win_rate = v;
        }
        if let Some(v) = patch.highest_score {
            self.highest_score = Some(v);
        }
        if let Some(v) = patch.longest_streak {
            self.longest_streak = Some(v);
        }
        if let Some(v) = patch.perfect_games {
            self.perfect_games = Some(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    #[serde(default)]
    pub requires_verification: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationKind {
    GameInvite,
    Achievement,
    Leaderboard,
    System,
    FriendRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Achievement {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: UserId,
    pub achievement_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub unlocked_at: String,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AchievementProgress {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rarity: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<String>,
    #[serde(default)]
    pub can_unlock: bool,
}

/// One row of the achievement-count leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AchievementLeader {
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub achievement_count: u32,
}
