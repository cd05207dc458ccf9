use reqwest::Method;

use super::{ApiClient, ApiError};
use quiz_types::{
    GamePayload, GameRecord, GamesPayload, LeaderboardEntry, LeaderboardPayload,
    SubmitAnswerRequest,
};

impl ApiClient {
    pub async fn start_game(&self, code: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::POST, &format!("/games/{}/start", code)))
            .await
    }

    pub async fn submit_answer(&self, code: &str, answer: &str) -> Result<Option<String>, ApiError> {
        let body = SubmitAnswerRequest {
            answer: answer.to_string(),
        };
        self.acknowledge(
            self.request(Method::POST, &format!("/games/{}/answer", code))
                .json(&body),
        )
        .await
    }

    pub async fn game_results(&self, game_id: &str) -> Result<GameRecord, ApiError> {
        let payload: GamePayload = self.get(&format!("/games/{}/results", game_id)).await?;
        Ok(payload.game)
    }

    pub async fn game_history(&self, limit: u32) -> Result<Vec<GameRecord>, ApiError> {
        let payload: GamesPayload = self
            .fetch(
                self.request(Method::GET, "/games/history")
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(payload.games)
    }

    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let payload: LeaderboardPayload = self
            .fetch(
                self.request(Method::GET, "/games/leaderboard")
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(payload.leaderboard)
    }
}
