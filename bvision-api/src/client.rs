//! Shared HTTP client with bearer-token handling

use crate::services::{
    DeviceService, GroupService, PermissionService, RecordingService, RoleService, SiteService,
    UserService, WebRtcService,
};
use bvision_core::{BVisionError, UserToken};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest response body quoted in an [`BVisionError::Api`] message
const MAX_ERROR_BODY: usize = 512;

/// REST client for the BVision backend.
///
/// Cheap to clone; all clones share the HTTP connection pool and the
/// signed-in user's token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

#[derive(Debug)]
struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<UserToken>>,
}

impl ApiClient {
    /// Create a client for an absolute base URL such as `https://hub.example.com/api`
    pub fn new(base_url: impl Into<String>) -> Result<Self, BVisionError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BVisionError::Initialization {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Self::with_http_client(base_url, http)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, BVisionError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BVisionError::InvalidConfiguration {
                field: "api_base_url".to_string(),
                reason: format!("{base_url:?} is not an absolute http(s) URL"),
            });
        }
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Full URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Store the tokens returned by sign-in
    pub fn set_token(&self, token: UserToken) {
        *self.inner.token.write() = Some(token);
    }

    /// Forget the stored tokens
    pub fn clear_token(&self) {
        *self.inner.token.write() = None;
    }

    /// Current access token, if signed in
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .as_ref()
            .and_then(|t| t.access_token.clone())
    }

    /// Current refresh token, if signed in
    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
    }

    /// Device endpoints
    pub fn devices(&self) -> DeviceService {
        DeviceService::new(self.clone())
    }

    /// Site endpoints
    pub fn sites(&self) -> SiteService {
        SiteService::new(self.clone())
    }

    /// Group endpoints
    pub fn groups(&self) -> GroupService {
        GroupService::new(self.clone())
    }

    /// Role endpoints
    pub fn roles(&self) -> RoleService {
        RoleService::new(self.clone())
    }

    /// Permission endpoints
    pub fn permissions(&self) -> PermissionService {
        PermissionService::new(self.clone())
    }

    /// User and auth endpoints
    pub fn users(&self) -> UserService {
        UserService::new(self.clone())
    }

    /// Recording endpoints
    pub fn recordings(&self) -> RecordingService {
        RecordingService::new(self.clone())
    }

    /// Signaling message relay endpoint
    pub fn webrtc(&self) -> WebRtcService {
        WebRtcService::new(self.clone())
    }

    /// GET a JSON resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BVisionError> {
        let url = self.url(path);
        let request = self.request(Method::GET, &url);
        self.send_json(request, &url).await
    }

    /// GET a JSON resource with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BVisionError> {
        let url = self.url(path);
        let request = self.request(Method::GET, &url).query(query);
        self.send_json(request, &url).await
    }

    /// GET that ignores the response body
    pub async fn get_empty(&self, path: &str) -> Result<(), BVisionError> {
        let url = self.url(path);
        let request = self.request(Method::GET, &url);
        self.send(request, &url).await.map(|_| ())
    }

    /// POST a JSON body
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BVisionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let request = self.request(Method::POST, &url).json(body);
        self.send_json(request, &url).await
    }

    /// PATCH a JSON body
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, BVisionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let request = self.request(Method::PATCH, &url).json(body);
        self.send_json(request, &url).await
    }

    /// DELETE a resource
    pub async fn delete(&self, path: &str) -> Result<(), BVisionError> {
        let url = self.url(path);
        let request = self.request(Method::DELETE, &url);
        self.send(request, &url).await.map(|_| ())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.inner.http.request(method, url);
        if let Some(token) = self.access_token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<String, BVisionError> {
        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            BVisionError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BVisionError::Http {
            url: url.to_string(),
            reason: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let mut message = if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            };
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            warn!("{} answered {}", url, status);
            return Err(BVisionError::Api {
                status: status.as_u16(),
                url: url.to_string(),
                message,
            });
        }

        debug!("{} answered {} ({} bytes)", url, status, body.len());
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, BVisionError> {
        let body = self.send(request, url).await?;
        serde_json::from_str(&body).map_err(|e| BVisionError::InvalidMessage {
            message: format!("response from {}", url),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("https://hub.example.com/api/").unwrap();
        assert_eq!(client.base_url(), "https://hub.example.com/api");
        assert_eq!(client.url("/devices"), "https://hub.example.com/api/devices");
        assert_eq!(client.url("devices/7"), "https://hub.example.com/api/devices/7");
    }

    #[test]
    fn test_relative_base_rejected() {
        let err = ApiClient::new("/api").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_token_shared_between_clones() {
        let client = ApiClient::new("http://localhost:8080/api").unwrap();
        let clone = client.clone();
        client.set_token(UserToken {
            access_token: Some("at-1".to_string()),
            refresh_token: None,
        });
        assert_eq!(clone.access_token().as_deref(), Some("at-1"));
        clone.clear_token();
        assert!(client.access_token().is_none());
    }
}
