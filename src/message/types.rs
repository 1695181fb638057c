//! Message envelope and the closed message-type enum.
//!
//! Every inter-context message is `{type, payload, timestamp}` on the
//! wire.  The type string must belong to `MessageType` or the message
//! is rejected before any handler can see it; payloads are decoded into
//! the typed `Request` sum type at the router boundary, so handlers
//! never touch loose JSON.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CredVaultError, Result};
use crate::vault::CredentialDraft;

/// The closed set of message types.
///
/// Wire names are SCREAMING_SNAKE_CASE.  The last three are addressed
/// to content scripts; the background router declines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Password operations
    GetPassword,
    SavePassword,

    // Vault operations
    LockVault,
    UnlockVault,
    SyncVault,

    // Master password operations
    HashPassword,
    VerifyPassword,

    // Auto-fill operations
    AutoFillRequest,
    AutoFillResponse,
    AutoFillTrigger,
    FormDetected,
}

impl MessageType {
    /// Parse a wire type string, rejecting anything outside the enum.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "GET_PASSWORD" => Ok(Self::GetPassword),
            "SAVE_PASSWORD" => Ok(Self::SavePassword),
            "LOCK_VAULT" => Ok(Self::LockVault),
            "UNLOCK_VAULT" => Ok(Self::UnlockVault),
            "SYNC_VAULT" => Ok(Self::SyncVault),
            "HASH_PASSWORD" => Ok(Self::HashPassword),
            "VERIFY_PASSWORD" => Ok(Self::VerifyPassword),
            "AUTO_FILL_REQUEST" => Ok(Self::AutoFillRequest),
            "AUTO_FILL_RESPONSE" => Ok(Self::AutoFillResponse),
            "AUTO_FILL_TRIGGER" => Ok(Self::AutoFillTrigger),
            "FORM_DETECTED" => Ok(Self::FormDetected),
            other => Err(CredVaultError::UnknownMessageType(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetPassword => "GET_PASSWORD",
            Self::SavePassword => "SAVE_PASSWORD",
            Self::LockVault => "LOCK_VAULT",
            Self::UnlockVault => "UNLOCK_VAULT",
            Self::SyncVault => "SYNC_VAULT",
            Self::HashPassword => "HASH_PASSWORD",
            Self::VerifyPassword => "VERIFY_PASSWORD",
            Self::AutoFillRequest => "AUTO_FILL_REQUEST",
            Self::AutoFillResponse => "AUTO_FILL_RESPONSE",
            Self::AutoFillTrigger => "AUTO_FILL_TRIGGER",
            Self::FormDetected => "FORM_DETECTED",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standardized message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,

    #[serde(default = "empty_payload")]
    pub payload: Value,

    /// Epoch milliseconds at construction time.
    pub timestamp: i64,
}

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Message {
    /// Build an envelope with the current timestamp.
    pub fn new(kind: MessageType, payload: Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Validate a raw inbound envelope.
    ///
    /// The type string is checked against the closed enum here, before
    /// dispatch; a message that fails this never reaches a handler.
    pub fn parse(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CredVaultError::InvalidMessage("message is not an object".into()))?;

        let type_str = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CredVaultError::InvalidMessage("missing 'type' field".into()))?;

        let kind = MessageType::parse(type_str)?;

        let payload = obj.get("payload").cloned().unwrap_or_else(empty_payload);

        let timestamp = obj
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        Ok(Self {
            kind,
            payload,
            timestamp,
        })
    }
}

/// A background request with its payload decoded.
///
/// One variant per message type the background context handles; the
/// loose JSON payload is validated here, at the boundary, exactly once.
#[derive(Debug, Clone)]
pub enum Request {
    GetPassword { domain: String },
    SavePassword(CredentialDraft),
    LockVault,
    UnlockVault { master_password: String },
    SyncVault,
    HashPassword { password: String },
    VerifyPassword { password: String },
    AutoFillRequest { domain: String },
}

impl Request {
    /// Decode the typed payload for a background message.
    ///
    /// Returns `Ok(None)` for types addressed to other contexts (the
    /// router declines those with no response).
    pub fn from_message(message: &Message) -> Result<Option<Self>> {
        let request = match message.kind {
            MessageType::GetPassword => Self::GetPassword {
                domain: string_field(&message.payload, "domain")?,
            },
            MessageType::SavePassword => {
                let draft: CredentialDraft = serde_json::from_value(message.payload.clone())
                    .map_err(|e| {
                        CredVaultError::InvalidMessage(format!("SAVE_PASSWORD payload: {e}"))
                    })?;
                Self::SavePassword(draft)
            }
            MessageType::LockVault => Self::LockVault,
            MessageType::UnlockVault => Self::UnlockVault {
                master_password: string_field(&message.payload, "masterPassword")?,
            },
            MessageType::SyncVault => Self::SyncVault,
            MessageType::HashPassword => Self::HashPassword {
                password: string_field(&message.payload, "password")?,
            },
            MessageType::VerifyPassword => Self::VerifyPassword {
                password: string_field(&message.payload, "password")?,
            },
            MessageType::AutoFillRequest => Self::AutoFillRequest {
                domain: string_field(&message.payload, "domain")?,
            },
            MessageType::AutoFillResponse
            | MessageType::AutoFillTrigger
            | MessageType::FormDetected => return Ok(None),
        };

        Ok(Some(request))
    }
}

fn string_field(payload: &Value, field: &str) -> Result<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CredVaultError::InvalidMessage(format!("missing or non-string field '{field}'"))
        })
}
