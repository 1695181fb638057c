//! Optional remote verification service.
//!
//! An account server may hold a copy of the master-password
//! verification hash.  The core never depends on it: every call can
//! fail, and every caller degrades to local-only (offline) behavior
//! when it does.  Only the verification hash ever crosses the wire,
//! never the password itself.
//!
//! The HTTP client is behind the `remote-check` feature so fully
//! offline builds carry no HTTP stack at all.

use async_trait::async_trait;

use crate::errors::Result;

/// Client for the server-side master password record.
#[async_trait]
pub trait RemoteVerifier: Send + Sync {
    /// Whether a master password record exists server-side.
    async fn master_password_exists(&self) -> Result<bool>;

    /// Create or update the server-side verification hash.
    async fn update_master_password(&self, password_hash: &str) -> Result<()>;
}

#[cfg(feature = "remote-check")]
pub use http::HttpRemoteVerifier;

#[cfg(feature = "remote-check")]
mod http {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::errors::{CredVaultError, Result};

    use super::RemoteVerifier;

    /// HTTP client for the `/api/master_password` endpoint.
    pub struct HttpRemoteVerifier {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpRemoteVerifier {
        pub fn new(base_url: impl Into<String>) -> Self {
            let base_url = base_url.into();
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }
        }

        fn endpoint(&self) -> String {
            format!("{}/api/master_password", self.base_url)
        }
    }

    #[async_trait]
    impl RemoteVerifier for HttpRemoteVerifier {
        async fn master_password_exists(&self) -> Result<bool> {
            let response = self
                .client
                .get(self.endpoint())
                .send()
                .await
                .map_err(|e| CredVaultError::RemoteUnavailable(e.to_string()))?;

            if !response.status().is_success() {
                return Err(CredVaultError::RemoteUnavailable(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| CredVaultError::RemoteUnavailable(e.to_string()))?;

            Ok(body.get("exists").and_then(Value::as_bool).unwrap_or(false))
        }

        async fn update_master_password(&self, password_hash: &str) -> Result<()> {
            let response = self
                .client
                .post(self.endpoint())
                .json(&json!({"user": {"master_password_hash": password_hash}}))
                .send()
                .await
                .map_err(|e| CredVaultError::RemoteUnavailable(e.to_string()))?;

            if !response.status().is_success() {
                return Err(CredVaultError::RemoteUnavailable(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            Ok(())
        }
    }
}
