use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    Achievement, AchievementLeader, AchievementProgress, Difficulty, GameRecord, LeaderboardEntry, Notification, Room, User, UserStats,
};

/// Envelope wrapping every REST response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Body of a failed request; only the message is surfaced to callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement of an action that returns no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub message: Option<String>,
}

// Request bodies

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateRoomRequest {
    pub category: String,
    pub difficulty: Difficulty,
    pub number_of_questions: u32,
    pub time_per_question: u32,
    pub is_public: bool,
}

/// Partial settings change sent by the host; absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_questions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

// Response payloads (the `data` member of the envelope)

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPayload {
    pub room: Room,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomsPayload {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsPayload {
    #[serde(default)]
    pub stats: UserStats,
}

/// Result of an avatar upload; the backend returns the new URL, the user, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarPayload {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GamesPayload {
    #[serde(default)]
    pub games: Vec<GameRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GamePayload {
    pub game: GameRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardPayload {
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPayload {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCountPayload {
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AchievementsPayload {
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub progress: f64,
}

/// Shared shape of the progress and available-achievements endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementProgressPayload {
    #[serde(default)]
    pub achievements: Vec<AchievementProgress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AchievementLeaderboardPayload {
    #[serde(default)]
    pub leaderboard: Vec<AchievementLeader>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_data() {
        let json = r#"{"success": true, "message": "Left room"}"#;
        let envelope: ApiResponse<RoomPayload> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Left room"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_settings_update_omits_absent_fields() {
        let update = SettingsUpdate {
            number_of_questions: Some(12),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"numberOfQuestions": 12}));
    }
}
