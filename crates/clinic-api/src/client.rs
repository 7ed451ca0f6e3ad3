//! HTTP client for the clinic appointments API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;
use tracing::instrument;
use url::Url;

use crate::error::ApiError;
use crate::gateway::AppointmentApi;
use crate::types::{Appointment, Client, CreateAppointmentRequest, PatchAppointmentRequest};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// reqwest-backed implementation of [`AppointmentApi`].
#[derive(Debug, Clone)]
pub struct ClinicClient {
    client: Arc<reqwest::Client>,
    base_url: String,
    token: Option<String>,
}

impl ClinicClient {
    /// Create a client for `base_url` with the default request timeout.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client whose every request fails with `ApiError::Timeout`
    /// once `timeout` elapses.
    pub fn with_timeout(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).context("Invalid API base URL")?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build from the `[api]` section of the dashboard config.
    pub fn from_config(config: &clinic_core::ApiConfig) -> Result<Self> {
        Self::with_timeout(
            &config.base_url,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build request with auth headers
    fn build_request(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => req.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    /// Decode a 2xx body or map the status onto an `ApiError`.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::Decode(format!("JSON parse error: {}", e)))
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status, &text);
        tracing::warn!("API request failed: {}", err);
        err
    }
}

#[async_trait]
impl AppointmentApi for ClinicClient {
    #[instrument(skip(self), level = "info")]
    async fn list_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        let response = self
            .build_request(self.client.get(self.url("/appointments")))
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, request), level = "info")]
    async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        let response = self
            .build_request(self.client.post(self.url("/appointments")))
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, request), level = "info")]
    async fn patch_appointment(
        &self,
        id: i64,
        request: &PatchAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        let response = self
            .build_request(self.client.patch(self.url(&format!("/appointments/{}", id))))
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self), level = "info")]
    async fn delete_appointment(&self, id: i64) -> Result<(), ApiError> {
        let response = self
            .build_request(self.client.delete(self.url(&format!("/appointments/{}", id))))
            .send()
            .await?;

        // 204 with an empty body
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    #[instrument(skip(self), level = "info")]
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        let response = self
            .build_request(self.client.get(self.url("/clients")))
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(ClinicClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ClinicClient::new("http://localhost:8000/api/", None).unwrap();
        assert_eq!(client.url("/appointments"), "http://localhost:8000/api/appointments");
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/clients"))
            .and(header("Authorization", "Bearer test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "Hina M."}
            ])))
            .mount(&mock_server)
            .await;

        let client =
            ClinicClient::new(&mock_server.uri(), Some("test_token".to_string())).unwrap();
        let clients = client.list_clients().await.unwrap();

        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Hina M.");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appointments"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client =
            ClinicClient::with_timeout(&mock_server.uri(), None, Duration::from_millis(50))
                .unwrap();
        let result = client.list_appointments().await;

        assert_eq!(result, Err(ApiError::Timeout));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = ClinicClient::new(&mock_server.uri(), None).unwrap();
        let result = client.list_appointments().await;

        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
