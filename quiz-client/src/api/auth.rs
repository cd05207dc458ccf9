use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use super::{ApiClient, ApiError};
use quiz_types::{
    AuthResponse, AvatarPayload, ChangePasswordRequest, LoginRequest, ProfileUpdate,
    RegisterRequest, ResetPasswordRequest, StatsPayload, User, UserPayload, UserStats,
};

impl ApiClient {
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/register", request).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/login", request).await
    }

    pub async fn verify_email(&self, otp: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            self.request(Method::POST, "/auth/verify-email")
                .json(&json!({ "otp": otp })),
        )
        .await
    }

    pub async fn resend_verification(&self) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::POST, "/auth/resend-verification"))
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            self.request(Method::POST, "/auth/forgot-password")
                .json(&json!({ "email": email })),
        )
        .await
    }

    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(
            self.request(Method::POST, "/auth/reset-password")
                .json(request),
        )
        .await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let payload: UserPayload = self.get("/auth/me").await?;
        Ok(payload.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let payload: UserPayload = self
            .fetch(self.request(Method::PUT, "/auth/profile").json(update))
            .await?;
        Ok(payload.user)
    }

    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        let payload: StatsPayload = self.get("/auth/stats").await?;
        Ok(payload.stats)
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(self.request(Method::PUT, "/auth/password").json(request))
            .await
    }

    /// Multipart upload under the `avatar` field.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<AvatarPayload, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new().part("avatar", part);

        let envelope = self
            .send::<AvatarPayload>(self.request(Method::POST, "/auth/avatar").multipart(form))
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }
}
