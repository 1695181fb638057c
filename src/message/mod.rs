//! Typed inter-context message protocol.
//!
//! Isolated execution contexts (popup, content scripts) never hold a
//! reference to the vault; they talk to the background context through
//! this protocol.  `types` defines the closed message enum and the
//! envelope, `router` the background dispatch and the client side.

pub mod router;
pub mod types;

pub use router::{LocalTransport, MessageClient, MessageRouter, MessageTransport};
pub use types::{Message, MessageType, Request};
