//! Client for the banking auth service (`/api/auth`).

use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Credential, RefreshError, TokenRefresher};
use crate::api::ApiError;
use crate::transport::Transport;

const LOGIN_PATH: &str = "/api/auth/login";
const REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    message: Option<String>,
    token: Option<String>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn describe(body: &str) -> String {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        parsed
            .error
            .or(parsed.message)
            .unwrap_or_else(|| body.trim().to_string())
    }
}

/// Talks to the login and refresh endpoints directly, outside the
/// intercepted request path, so a failing refresh can never queue
/// behind itself.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: Url,
}

impl AuthClient {
    pub fn new(transport: &Transport) -> Self {
        Self {
            client: transport.client().clone(),
            base_url: transport.base_url().clone(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    /// Authenticate a staff user. The server answers with an access token in
    /// the body and sets the refresh cookie on the transport's jar.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let response = self
            .client
            .post(self.url(LOGIN_PATH)?)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_server_error() {
            return Err(ApiError::from_status(status, &body));
        }

        let login: LoginResponse = serde_json::from_str(&body).map_err(|_| {
            if status.is_success() {
                ApiError::Decode(format!("login response: {}", body))
            } else {
                ApiError::LoginRejected(ErrorBody::describe(&body))
            }
        })?;

        match login.token.filter(|t| !t.is_empty()) {
            Some(token) if status.is_success() && login.success => {
                info!(username = username, "Login succeeded");
                Ok(Credential::new(token))
            }
            _ => Err(ApiError::LoginRejected(
                login
                    .message
                    .unwrap_or_else(|| format!("login failed with status {}", status)),
            )),
        }
    }

    async fn request_refresh(&self) -> Result<Credential, RefreshError> {
        let url = self
            .url(REFRESH_PATH)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: ErrorBody::describe(&body),
            });
        }

        let refreshed: RefreshResponse =
            serde_json::from_str(&body).map_err(|_| RefreshError::MissingToken)?;
        debug!("Refresh endpoint issued a new access token");
        refreshed
            .access_token
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or(RefreshError::MissingToken)
    }
}

impl TokenRefresher for AuthClient {
    fn refresh(&self) -> BoxFuture<'_, Result<Credential, RefreshError>> {
        Box::pin(self.request_refresh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_error_field() {
        assert_eq!(
            ErrorBody::describe(r#"{"error":"Refresh token missing"}"#),
            "Refresh token missing"
        );
        assert_eq!(
            ErrorBody::describe(r#"{"message":"Invalid username or password","token":null}"#),
            "Invalid username or password"
        );
        assert_eq!(ErrorBody::describe("  Forbidden \n"), "Forbidden");
    }

    #[test]
    fn test_login_response_shape() {
        let parsed: LoginResponse = serde_json::from_str(
            r#"{"message":"Login successful","token":"abc.def.ghi","success":true}"#,
        )
        .unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.token.as_deref(), Some("abc.def.ghi"));
    }
}
