use reqwest::Method;

use super::{ApiClient, ApiError};
use quiz_types::{
    AchievementLeader, AchievementLeaderboardPayload, AchievementProgress,
    AchievementProgressPayload, AchievementsPayload,
};

impl ApiClient {
    pub async fn achievements(&self) -> Result<AchievementsPayload, ApiError> {
        self.get("/achievements").await
    }

    pub async fn achievement_progress(&self) -> Result<Vec<AchievementProgress>, ApiError> {
        let payload: AchievementProgressPayload = self.get("/achievements/progress").await?;
        Ok(payload.achievements)
    }

    pub async fn available_achievements(&self) -> Result<Vec<AchievementProgress>, ApiError> {
        let payload: AchievementProgressPayload = self.get("/achievements/available").await?;
        Ok(payload.achievements)
    }

    pub async fn achievement_leaderboard(
        &self,
        limit: u32,
    ) -> Result<Vec<AchievementLeader>, ApiError> {
        let payload: AchievementLeaderboardPayload = self
            .fetch(
                self.request(Method::GET, "/achievements/leaderboard")
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(payload.leaderboard)
    }
}
