//! Identity resolution: maps an `Authorization: Bearer <token>` header to
//! the principal a request runs as.
//!
//! Resolution never fails a request. An absent, malformed or rejected token
//! yields [`Principal::Anonymous`]; the caller decides what that permits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use reqwest::Client;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::user::Identity;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token rejected with status {0}")]
    Rejected(u16),
}

/// The caller on whose behalf a request executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User(Identity),
    /// Trusted backend credential with unrestricted access.
    Service,
}

impl Principal {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Principal::User(identity) => Some(identity),
            Principal::Anonymous | Principal::Service => None,
        }
    }
}

/// Turns a bearer token into an identity. Carried in `AppState` as
/// `Arc<dyn IdentityResolver>`.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Extracts a non-empty bearer token from the request headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the principal for a request.
///
/// A token equal to the configured service key maps to [`Principal::Service`];
/// any other token is sent to the identity resolver.
pub async fn resolve_principal(
    resolver: &dyn IdentityResolver,
    service_role_key: Option<&str>,
    token: Option<&str>,
) -> Principal {
    let Some(token) = token else {
        return Principal::Anonymous;
    };

    if service_role_key.is_some_and(|key| is_service_key(key, token)) {
        return Principal::Service;
    }

    match resolver.resolve(token).await {
        Ok(identity) => Principal::User(identity),
        Err(e) => {
            debug!("Bearer token did not resolve to a user, treating as anonymous: {e}");
            Principal::Anonymous
        }
    }
}

/// Constant-time comparison of the presented token against the service key.
fn is_service_key(key: &str, token: &str) -> bool {
    key.as_bytes().ct_eq(token.as_bytes()).into()
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
}

/// Resolves tokens against an auth server's `GET {base}/user` endpoint.
#[derive(Clone)]
pub struct HttpIdentityResolver {
    client: Client,
    user_url: Option<String>,
    api_key: Option<String>,
}

impl HttpIdentityResolver {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build identity HTTP client")?;
        Ok(Self {
            client,
            user_url: base_url.map(|base| format!("{}/user", base.trim_end_matches('/'))),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        let url = self.user_url.as_deref().ok_or(IdentityError::NotConfigured)?;

        let mut request = self.client.get(url).bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let user: UserResponse = response.json().await?;
        Ok(Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        })
    }
}
