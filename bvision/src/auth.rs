//! Signed-in session and role / permission checks

use bvision_api::ApiClient;
use bvision_core::{BVisionError, SignInReq, SignUpReq, UserInfo};
use parking_lot::RwLock;
use std::sync::Arc;

/// What [`AuthCheck`] compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthBasis {
    /// The user's role code
    Role,
    /// The permission codes granted by the user's role
    #[default]
    Permission,
}

/// Role or permission check over a snapshot of the signed-in user
#[derive(Debug, Clone)]
pub struct AuthCheck {
    basis: AuthBasis,
    signed_in: bool,
    role_code: Option<String>,
    permission_codes: Vec<String>,
}

impl AuthCheck {
    /// Check for `user`, who is only considered when `signed_in`
    pub fn new(basis: AuthBasis, signed_in: bool, user: Option<&UserInfo>) -> Self {
        let role = user.and_then(|u| u.role.as_ref());
        Self {
            basis,
            signed_in,
            role_code: role.map(|r| r.code.clone()),
            permission_codes: role
                .and_then(|r| r.permissions.as_ref())
                .map(|perms| perms.iter().map(|p| p.code.clone()).collect())
                .unwrap_or_default(),
        }
    }

    /// Whether the user has `item`. Always false without a token.
    pub fn check(&self, item: &str) -> bool {
        if !self.signed_in {
            return false;
        }
        match self.basis {
            AuthBasis::Role => self.role_code.as_deref() == Some(item),
            AuthBasis::Permission => self.permission_codes.iter().any(|code| code == item),
        }
    }

    /// Whether the user has at least one of `items`; an empty list passes
    pub fn check_any(&self, items: &[&str]) -> bool {
        items.is_empty() || items.iter().any(|item| self.check(item))
    }

    /// Whether the user has every one of `items`; an empty list passes
    pub fn check_all(&self, items: &[&str]) -> bool {
        items.iter().all(|item| self.check(item))
    }
}

/// Sign-in state shared by the dashboard
#[derive(Debug, Clone)]
pub struct AuthSession {
    client: ApiClient,
    user: Arc<RwLock<Option<UserInfo>>>,
}

impl AuthSession {
    /// Session over `client`; the token is stored on the client
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: Arc::new(RwLock::new(None)),
        }
    }

    /// Sign in and remember the user
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<UserInfo, BVisionError> {
        let res = self
            .client
            .users()
            .sign_in(&SignInReq {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        *self.user.write() = Some(res.user.clone());
        Ok(res.user)
    }

    /// Register and sign in
    pub async fn sign_up(&self, req: &SignUpReq) -> Result<UserInfo, BVisionError> {
        let res = self.client.users().sign_up(req).await?;
        *self.user.write() = Some(res.user.clone());
        Ok(res.user)
    }

    /// Renew the token pair with the stored refresh token
    pub async fn refresh(&self) -> Result<(), BVisionError> {
        let refresh_token = self
            .client
            .refresh_token()
            .ok_or(BVisionError::Unauthenticated)?;
        self.client.users().refresh(&refresh_token).await?;
        Ok(())
    }

    /// Sign out. Local state is cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), BVisionError> {
        *self.user.write() = None;
        self.client.users().logout().await
    }

    /// Whether an access token is held
    pub fn is_signed_in(&self) -> bool {
        self.client.access_token().is_some()
    }

    /// Signed-in user
    pub fn user(&self) -> Option<UserInfo> {
        self.user.read().clone()
    }

    /// Role or permission check for the current user
    pub fn auth_check(&self, basis: AuthBasis) -> AuthCheck {
        let user = self.user.read();
        AuthCheck::new(basis, self.is_signed_in(), user.as_ref())
    }

    /// The REST client this session signs
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvision_core::{Permission, Role};

    fn operator() -> UserInfo {
        UserInfo {
            id: "u-1".to_string(),
            username: "ops".to_string(),
            email: "ops@example.com".to_string(),
            role: Some(Role {
                id: "r-1".to_string(),
                name: "Operator".to_string(),
                code: "operator".to_string(),
                permissions: Some(vec![
                    Permission {
                        code: "device.view".to_string(),
                        ..Default::default()
                    },
                    Permission {
                        code: "recording.view".to_string(),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_permission_checks() {
        let check = AuthCheck::new(AuthBasis::Permission, true, Some(&operator()));
        assert!(check.check("device.view"));
        assert!(!check.check("user.create"));
        assert!(check.check_any(&["user.create", "recording.view"]));
        assert!(!check.check_all(&["user.create", "recording.view"]));
        assert!(check.check_all(&["device.view", "recording.view"]));
    }

    #[test]
    fn test_role_checks() {
        let check = AuthCheck::new(AuthBasis::Role, true, Some(&operator()));
        assert!(check.check("operator"));
        assert!(!check.check("admin"));
        assert!(check.check_any(&["admin", "operator"]));
    }

    #[test]
    fn test_empty_lists_pass() {
        let check = AuthCheck::new(AuthBasis::Permission, false, None);
        assert!(check.check_any(&[]));
        assert!(check.check_all(&[]));
    }

    #[test]
    fn test_no_token_fails() {
        let check = AuthCheck::new(AuthBasis::Permission, false, Some(&operator()));
        assert!(!check.check("device.view"));
        assert!(!check.check_any(&["device.view"]));
        assert!(!check.check_all(&["device.view"]));
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let session = AuthSession::new(ApiClient::new("http://127.0.0.1:9/api").unwrap());
        assert!(!session.is_signed_in());
        let err = session.refresh().await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }
}
