use reqwest::Method;

use super::{ApiClient, ApiError};
use quiz_types::{NotificationsPayload, UnreadCountPayload};

impl ApiClient {
    pub async fn notifications(&self, unread_only: bool) -> Result<NotificationsPayload, ApiError> {
        self.fetch(
            self.request(Method::GET, "/notifications")
                .query(&[("unreadOnly", unread_only)]),
        )
        .await
    }

    pub async fn unread_count(&self) -> Result<u32, ApiError> {
        let payload: UnreadCountPayload = self.get("/notifications/unread-count").await?;
        Ok(payload.count)
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::PUT, &format!("/notifications/{}/read", id)))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::PUT, "/notifications/read-all"))
            .await
    }

    pub async fn delete_notification(&self, id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::DELETE, &format!("/notifications/{}", id)))
            .await
    }

    pub async fn delete_all_notifications(&self) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::DELETE, "/notifications"))
            .await
    }
}
