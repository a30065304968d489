use super::item_path;
use crate::client::ApiClient;
use bvision_core::{BVisionError, SignInReq, SignInRes, SignUpReq, User, UserPayload, UserToken};
use serde::Serialize;
use tracing::{info, warn};

/// User collection path
pub const USERS_PATH: &str = "/users";
/// Sign-in path
pub const AUTH_SIGNIN_PATH: &str = "/auth/signin";
/// Sign-up path
pub const AUTH_SIGNUP_PATH: &str = "/auth/signup";
/// Logout path
pub const AUTH_LOGOUT_PATH: &str = "/auth/logout";
/// Token refresh path
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshReq<'a> {
    refresh_token: &'a str,
}

/// `/users` and `/auth` endpoints
#[derive(Debug, Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Sign in and keep the issued token for later calls
    pub async fn sign_in(&self, req: &SignInReq) -> Result<SignInRes, BVisionError> {
        let res: SignInRes = self.client.post(AUTH_SIGNIN_PATH, req).await?;
        self.client.set_token(res.token.clone());
        info!("Signed in as {}", res.user.username);
        Ok(res)
    }

    /// Register and keep the issued token for later calls
    pub async fn sign_up(&self, req: &SignUpReq) -> Result<SignInRes, BVisionError> {
        let res: SignInRes = self.client.post(AUTH_SIGNUP_PATH, req).await?;
        self.client.set_token(res.token.clone());
        info!("Signed up as {}", res.user.username);
        Ok(res)
    }

    /// End the session. The local token is dropped even when the call fails.
    pub async fn logout(&self) -> Result<(), BVisionError> {
        let result = self.client.get_empty(AUTH_LOGOUT_PATH).await;
        self.client.clear_token();
        if let Err(e) = &result {
            warn!("Logout request failed: {}", e);
        }
        result
    }

    /// Exchange the refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<UserToken, BVisionError> {
        let token: UserToken = self
            .client
            .post(AUTH_REFRESH_PATH, &RefreshReq { refresh_token })
            .await?;
        self.client.set_token(token.clone());
        Ok(token)
    }

    /// All users
    pub async fn list(&self) -> Result<Vec<User>, BVisionError> {
        self.client.get(USERS_PATH).await
    }

    /// One user by identifier
    pub async fn get(&self, id: &str) -> Result<User, BVisionError> {
        self.client.get(&item_path(USERS_PATH, id)).await
    }

    /// Create a user
    pub async fn create(&self, body: &UserPayload) -> Result<User, BVisionError> {
        self.client.post(USERS_PATH, body).await
    }

    /// Update a user; an absent password keeps the current one
    pub async fn update(&self, id: &str, body: &UserPayload) -> Result<User, BVisionError> {
        self.client.patch(&item_path(USERS_PATH, id), body).await
    }

    /// Delete a user
    pub async fn delete(&self, id: &str) -> Result<(), BVisionError> {
        self.client.delete(&item_path(USERS_PATH, id)).await
    }
}
