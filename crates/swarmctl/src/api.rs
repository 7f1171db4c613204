//! The shape of the node query API consumed by poll predicates.
//!
//! The core never implements this surface; it defines the contract so
//! callers can express predicates ("a pubsub peer has appeared", "a
//! message has arrived") over whatever client reaches the running node.
//! Peer identifiers and message payloads stay opaque: the core reasons
//! about existence and count, never structure.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inbox::Inbox;

/// Opaque identifier of a swarm peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A peer as reported by the node: an identifier plus zero or more
/// transport addresses, both opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    #[serde(default)]
    pub addrs: Vec<String>,
}

/// Query surface of a running node's API.
pub trait NodeApi {
    /// Error type for all queries.
    type Error: Error + Send + Sync + 'static;

    /// Peers the node is currently connected to at the swarm level.
    fn connected_peers(&self) -> Result<Vec<PeerInfo>, Self::Error>;

    /// Peers currently known to participate in `topic`.
    fn peers(&self, topic: &str) -> Result<Vec<PeerId>, Self::Error>;

    /// Subscribes to `topic`, delivering payloads into `inbox`.
    fn subscribe(&self, topic: &str, inbox: Inbox) -> Result<(), Self::Error>;

    /// Publishes `payload` to `topic`.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;
}
