use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 10;

/// Application configuration loaded from environment variables.
/// Only `DATABASE_URL` is required; every collaborator is optional and
/// degrades to its offline behaviour when unset.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the prediction service. `None` means every complaint
    /// receives the fallback classification.
    pub inference_url: Option<String>,
    pub inference_timeout: Duration,
    pub identity_url: Option<String>,
    pub identity_api_key: Option<String>,
    /// Bearer credential that grants unrestricted access to all complaints.
    pub service_role_key: Option<String>,
    pub notify_url: Option<String>,
    pub notify_api_key: Option<String>,
    pub notify_recipient: Option<String>,
    pub notify_sender: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[redacted]")
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field("inference_url", &self.inference_url)
            .field("inference_timeout", &self.inference_timeout)
            .field("identity_url", &self.identity_url)
            .field("identity_api_key", &redact(&self.identity_api_key))
            .field("service_role_key", &redact(&self.service_role_key))
            .field("notify_url", &self.notify_url)
            .field("notify_api_key", &redact(&self.notify_api_key))
            .field("notify_recipient", &self.notify_recipient)
            .field("notify_sender", &self.notify_sender)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[redacted]")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timeout_secs = match optional_env("INFERENCE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("INFERENCE_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_INFERENCE_TIMEOUT_SECS,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            inference_url: optional_env("INFERENCE_URL"),
            inference_timeout: Duration::from_secs(timeout_secs),
            identity_url: optional_env("IDENTITY_URL"),
            identity_api_key: optional_env("IDENTITY_API_KEY"),
            service_role_key: optional_env("SERVICE_ROLE_KEY"),
            notify_url: optional_env("NOTIFY_URL"),
            notify_api_key: optional_env("NOTIFY_API_KEY"),
            notify_recipient: optional_env("NOTIFY_RECIPIENT"),
            notify_sender: optional_env("NOTIFY_SENDER")
                .unwrap_or_else(|| "complaints@localhost".to_string()),
        })
    }

    /// Configuration with every collaborator disabled. Used by tests.
    #[cfg(test)]
    pub fn offline() -> Self {
        Config {
            database_url: "postgres://localhost/complaints_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            inference_url: None,
            inference_timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            identity_url: None,
            identity_api_key: None,
            service_role_key: None,
            notify_url: None,
            notify_api_key: None,
            notify_recipient: None,
            notify_sender: "complaints@localhost".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
