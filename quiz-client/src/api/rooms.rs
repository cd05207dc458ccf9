use reqwest::Method;

use super::{ApiClient, ApiError};
use quiz_types::{CreateRoomRequest, Room, RoomFilters, RoomPayload, RoomsPayload, SettingsUpdate};

impl ApiClient {
    pub async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room, ApiError> {
        let payload: RoomPayload = self.post_json("/rooms", request).await?;
        Ok(payload.room)
    }

    pub async fn list_rooms(&self, filters: &RoomFilters) -> Result<Vec<Room>, ApiError> {
        let payload: RoomsPayload = self
            .fetch(self.request(Method::GET, "/rooms").query(filters))
            .await?;
        Ok(payload.rooms)
    }

    pub async fn get_room(&self, code: &str) -> Result<Room, ApiError> {
        let payload: RoomPayload = self.get(&format!("/rooms/{}", code)).await?;
        Ok(payload.room)
    }

    pub async fn join_room(&self, code: &str) -> Result<Room, ApiError> {
        let payload: RoomPayload = self
            .fetch(self.request(Method::POST, &format!("/rooms/{}/join", code)))
            .await?;
        Ok(payload.room)
    }

    pub async fn leave_room(&self, code: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::POST, &format!("/rooms/{}/leave", code)))
            .await
    }

    pub async fn toggle_ready(&self, code: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::POST, &format!("/rooms/{}/ready", code)))
            .await
    }

    pub async fn update_settings(
        &self,
        code: &str,
        update: &SettingsUpdate,
    ) -> Result<Room, ApiError> {
        let payload: RoomPayload = self
            .fetch(
                self.request(Method::PUT, &format!("/rooms/{}/settings", code))
                    .json(update),
            )
            .await?;
        Ok(payload.room)
    }

    pub async fn delete_room(&self, code: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::DELETE, &format!("/rooms/{}", code)))
            .await
    }
}
