//! Message dispatch for the background context.
//!
//! The router is the single entry point through which every other
//! execution context reaches the vault: validate the envelope, decode
//! the typed request, run exactly one handler, and answer with a
//! `{success, ...}` object.  Nothing ever throws across the context
//! boundary; handler failures come back as `{success: false, error}`.
//!
//! Protocol violations (bad envelope shape, unknown type, types the
//! background does not own) close the channel with no response at all.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{CredVaultError, Result};
use crate::vault::VaultManager;

use super::types::{Message, MessageType, Request};

/// Routes validated messages onto `VaultManager` operations.
#[derive(Clone)]
pub struct MessageRouter {
    manager: Arc<VaultManager>,
}

impl MessageRouter {
    pub fn new(manager: Arc<VaultManager>) -> Self {
        Self { manager }
    }

    /// Handle one raw inbound message.
    ///
    /// Returns `None` when the message is rejected before dispatch or
    /// is not addressed to the background context; otherwise `Some`
    /// structured response.
    pub async fn dispatch(&self, raw: &Value) -> Option<Value> {
        let message = match Message::parse(raw) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "rejected message before dispatch");
                return None;
            }
        };

        debug!(kind = %message.kind, "received message");

        let request = match Request::from_message(&message) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(kind = %message.kind, "message not addressed to the background context");
                return None;
            }
            // Known type, malformed payload: answer with a structured
            // failure rather than dropping the channel.
            Err(error) => return Some(failure(&error)),
        };

        Some(match self.handle(request).await {
            Ok(response) => response,
            Err(error) => failure(&error),
        })
    }

    /// Exactly one handler per request type, mapped 1:1 onto a vault
    /// manager (or crypto) operation.
    async fn handle(&self, request: Request) -> Result<Value> {
        match request {
            Request::GetPassword { domain } => {
                let passwords = self.manager.passwords_for_domain(&domain).await?;
                Ok(json!({
                    "success": true,
                    "count": passwords.len(),
                    "passwords": passwords,
                }))
            }

            Request::SavePassword(draft) => {
                let credential = self.manager.add_password(draft).await?;
                Ok(json!({
                    "success": true,
                    "password": credential,
                }))
            }

            Request::LockVault => {
                self.manager.lock().await?;
                Ok(json!({
                    "success": true,
                    "message": "Vault locked successfully.",
                }))
            }

            Request::UnlockVault { master_password } => {
                self.manager.unlock(&master_password).await?;
                Ok(json!({
                    "success": true,
                    "message": "Vault unlocked successfully.",
                }))
            }

            Request::SyncVault => {
                let exists = self.manager.sync_with_remote().await?;
                Ok(json!({
                    "success": true,
                    "exists": exists,
                }))
            }

            Request::HashPassword { password } => {
                let (hash, salt) = self.manager.hash_password(&password).await?;
                Ok(json!({
                    "success": true,
                    "hash": hash,
                    "salt": BASE64.encode(salt),
                }))
            }

            Request::VerifyPassword { password } => {
                let valid = self.manager.verify_password(&password).await?;
                Ok(json!({
                    "success": true,
                    "valid": valid,
                }))
            }

            Request::AutoFillRequest { domain } => {
                // All credentials go back; the content script picks the
                // best match for its page.
                let credentials = self.manager.search_passwords("").await?;
                debug!(
                    count = credentials.len(),
                    %domain,
                    "providing credentials for auto-fill"
                );
                Ok(json!({
                    "success": true,
                    "credentials": credentials,
                    "domain": domain,
                }))
            }
        }
    }
}

fn failure(error: &CredVaultError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Transport seam and client side
// ---------------------------------------------------------------------------

/// Delivery mechanism between execution contexts.
///
/// The host platform supplies the real transport (a browser extension
/// would bridge its runtime messaging API); `LocalTransport` wires a
/// client straight into a router for tests and single-process hosts.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Deliver a message and wait for the structured response.
    async fn deliver(&self, message: Message) -> Result<Value>;
}

/// In-process transport delivering straight into a router.
pub struct LocalTransport {
    router: MessageRouter,
}

impl LocalTransport {
    pub fn new(router: MessageRouter) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MessageTransport for LocalTransport {
    async fn deliver(&self, message: Message) -> Result<Value> {
        let raw = serde_json::to_value(&message)
            .map_err(|e| CredVaultError::Serialization(format!("message: {e}")))?;

        match self.router.dispatch(&raw).await {
            Some(response) => Ok(response),
            None => Err(CredVaultError::InvalidMessage(
                "message was not handled".into(),
            )),
        }
    }
}

/// Client side of the protocol: builds the envelope and awaits the
/// structured response.  Using `MessageType` makes an invalid type
/// unrepresentable before the message ever leaves the sender.
pub struct MessageClient {
    transport: Arc<dyn MessageTransport>,
}

impl MessageClient {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self { transport }
    }

    /// Send a typed message and await the response.
    pub async fn send(&self, kind: MessageType, payload: Value) -> Result<Value> {
        let message = Message::new(kind, payload);
        debug!(kind = %message.kind, "sending message");
        self.transport.deliver(message).await
    }
}
