//! Integration tests for the inter-context message protocol.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use credvault::config::Settings;
use credvault::errors::{CredVaultError, Result};
use credvault::message::{LocalTransport, MessageClient, MessageRouter, MessageType};
use credvault::remote::RemoteVerifier;
use credvault::session::SessionManager;
use credvault::storage::{MemoryStore, SecureStore};
use credvault::vault::VaultManager;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_settings() -> Settings {
    Settings {
        argon2_memory_kib: 8_192,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Settings::default()
    }
}

fn build_manager(remote: Option<Arc<dyn RemoteVerifier>>) -> Arc<VaultManager> {
    let settings = fast_settings();
    VaultManager::with_remote(
        SecureStore::new(Arc::new(MemoryStore::new())),
        SessionManager::new(
            Arc::new(MemoryStore::new()),
            settings.session_max_age_minutes,
        ),
        settings,
        remote,
    )
}

fn client_for(manager: Arc<VaultManager>) -> MessageClient {
    MessageClient::new(Arc::new(LocalTransport::new(MessageRouter::new(manager))))
}

/// A remote that always answers.
struct ReachableRemote;

#[async_trait]
impl RemoteVerifier for ReachableRemote {
    async fn master_password_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn update_master_password(&self, _password_hash: &str) -> Result<()> {
        Ok(())
    }
}

/// A remote that is always down.
struct DeadRemote;

#[async_trait]
impl RemoteVerifier for DeadRemote {
    async fn master_password_exists(&self) -> Result<bool> {
        Err(CredVaultError::RemoteUnavailable("connection refused".into()))
    }

    async fn update_master_password(&self, _password_hash: &str) -> Result<()> {
        Err(CredVaultError::RemoteUnavailable("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// Protocol validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_type_never_reaches_a_handler_or_mutates_state() {
    let manager = build_manager(None);
    let router = MessageRouter::new(manager.clone());

    manager.unlock("Sup3r$ecret!").await.expect("unlock");

    let raw = json!({
        "type": "NOT_A_REAL_TYPE",
        "payload": {"masterPassword": "anything"},
        "timestamp": 0
    });
    assert!(router.dispatch(&raw).await.is_none());

    // No state change: still unlocked, still empty.
    assert!(!manager.is_locked().await);
    assert!(manager
        .search_passwords("")
        .await
        .expect("search")
        .is_empty());
}

#[tokio::test]
async fn every_response_has_a_success_flag() {
    let manager = build_manager(None);
    let client = client_for(manager);

    let responses = [
        client
            .send(MessageType::GetPassword, json!({"domain": "x.com"}))
            .await
            .expect("get"),
        client
            .send(
                MessageType::UnlockVault,
                json!({"masterPassword": "Sup3r$ecret!"}),
            )
            .await
            .expect("unlock"),
        client
            .send(MessageType::LockVault, json!({}))
            .await
            .expect("lock"),
    ];

    for response in responses {
        assert!(response["success"].is_boolean(), "response: {response}");
    }
}

// ---------------------------------------------------------------------------
// Vault operations over the protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_flow_over_the_message_channel() {
    let manager = build_manager(None);
    let client = client_for(manager);

    // Locked: both read paths answer with a VaultLocked-class failure,
    // so the caller can prompt for unlock instead of crashing.
    let response = client
        .send(MessageType::GetPassword, json!({"domain": "github.com"}))
        .await
        .expect("get while locked");
    assert_eq!(response["success"], false);

    let response = client
        .send(MessageType::AutoFillRequest, json!({"domain": "github.com"}))
        .await
        .expect("autofill while locked");
    assert_eq!(response["success"], false);

    // Unlock and save.
    let response = client
        .send(
            MessageType::UnlockVault,
            json!({"masterPassword": "Sup3r$ecret!"}),
        )
        .await
        .expect("unlock");
    assert_eq!(response["success"], true);

    let response = client
        .send(
            MessageType::SavePassword,
            json!({"domain": "github.com", "username": "a@b.com", "password": "x"}),
        )
        .await
        .expect("save");
    assert_eq!(response["success"], true);
    let id = response["password"]["id"].as_str().expect("id").to_string();

    // Domain lookup finds it.
    let response = client
        .send(MessageType::GetPassword, json!({"domain": "github.com"}))
        .await
        .expect("get");
    assert_eq!(response["success"], true);
    assert_eq!(response["count"], 1);
    assert_eq!(response["passwords"][0]["id"], id.as_str());

    // Auto-fill hands back the full credential set plus the domain.
    let response = client
        .send(MessageType::AutoFillRequest, json!({"domain": "github.com"}))
        .await
        .expect("autofill");
    assert_eq!(response["success"], true);
    assert_eq!(response["domain"], "github.com");
    assert_eq!(response["credentials"].as_array().expect("array").len(), 1);

    // Lock over the channel.
    let response = client
        .send(MessageType::LockVault, json!({}))
        .await
        .expect("lock");
    assert_eq!(response["success"], true);
}

#[tokio::test]
async fn save_without_required_fields_is_a_validation_failure() {
    let manager = build_manager(None);
    let client = client_for(manager);

    client
        .send(
            MessageType::UnlockVault,
            json!({"masterPassword": "Sup3r$ecret!"}),
        )
        .await
        .expect("unlock");

    let response = client
        .send(MessageType::SavePassword, json!({"username": "a@b.com"}))
        .await
        .expect("save");
    assert_eq!(response["success"], false);
    assert!(response["error"].as_str().expect("error").contains("domain"));
}

#[tokio::test]
async fn wrong_master_password_is_a_structured_failure() {
    let manager = build_manager(None);
    manager.unlock("Sup3r$ecret!").await.expect("create vault");
    manager.lock().await.expect("lock");

    let client = client_for(manager);
    let response = client
        .send(MessageType::UnlockVault, json!({"masterPassword": "wrong"}))
        .await
        .expect("unlock attempt");
    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "Invalid master password");
}

// ---------------------------------------------------------------------------
// Master password operations over the protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hash_and_verify_over_the_channel() {
    let manager = build_manager(None);
    manager.initialize("Sup3r$ecret!").await.expect("initialize");

    let client = client_for(manager);

    let response = client
        .send(MessageType::HashPassword, json!({"password": "Sup3r$ecret!"}))
        .await
        .expect("hash");
    assert_eq!(response["success"], true);
    assert!(response["hash"].is_string());
    assert!(response["salt"].is_string());

    let response = client
        .send(
            MessageType::VerifyPassword,
            json!({"password": "Sup3r$ecret!"}),
        )
        .await
        .expect("verify");
    assert_eq!(response["success"], true);
    assert_eq!(response["valid"], true);

    let response = client
        .send(MessageType::VerifyPassword, json!({"password": "wrong"}))
        .await
        .expect("verify wrong");
    assert_eq!(response["success"], true);
    assert_eq!(response["valid"], false);
}

// ---------------------------------------------------------------------------
// Remote degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dead_remote_degrades_to_offline_setup() {
    let manager = build_manager(Some(Arc::new(DeadRemote)));

    // Setup succeeds locally even though the remote push failed.
    manager.initialize("Sup3r$ecret!").await.expect("initialize");
    assert!(!manager.is_locked().await);
    assert!(manager.verify_password("Sup3r$ecret!").await.expect("verify"));
}

#[tokio::test]
async fn sync_reports_remote_availability() {
    let reachable = build_manager(Some(Arc::new(ReachableRemote)));
    let client = client_for(reachable);
    let response = client
        .send(MessageType::SyncVault, json!({}))
        .await
        .expect("sync");
    assert_eq!(response["success"], true);
    assert_eq!(response["exists"], true);

    let dead = build_manager(Some(Arc::new(DeadRemote)));
    let client = client_for(dead);
    let response = client
        .send(MessageType::SyncVault, json!({}))
        .await
        .expect("sync");
    assert_eq!(response["success"], false);

    let offline = build_manager(None);
    let client = client_for(offline);
    let response = client
        .send(MessageType::SyncVault, json!({}))
        .await
        .expect("sync");
    assert_eq!(response["success"], false);
}
