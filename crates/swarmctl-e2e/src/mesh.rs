//! In-memory swarm fixture.
//!
//! A [`Mesh`] stands in for the network; a [`MeshNode`] stands in for one
//! external node process, backed by a real repository directory so the
//! lifecycle manager's marker handling is exercised against actual files.
//! The fixture reproduces the failure modes the manager is built around:
//! a marker left behind by a crashed node makes the next start fail
//! connection-refused, and stopping a node drops its subscriptions so a
//! flush cycle observably discards inherited state.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::debug;

use swarmctl::{ControllerError, Inbox, NodeApi, NodeController, PeerId, PeerInfo};
use swarmctl_config::{NodeConfig, RepoPaths, RepoPathsError};

const MESH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::mesh");

/// Shared broker connecting every [`MeshNode`] created against it.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    state: Arc<Mutex<MeshState>>,
}

#[derive(Debug, Default)]
struct MeshState {
    live: HashMap<PeerId, Vec<String>>,
    subscriptions: HashMap<String, Vec<(PeerId, Inbox)>>,
}

impl Mesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MeshState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn join(&self, peer: &PeerId, addrs: &[String]) {
        self.lock().live.insert(peer.clone(), addrs.to_vec());
    }

    fn leave(&self, peer: &PeerId) {
        let mut state = self.lock();
        state.live.remove(peer);
        for subscribers in state.subscriptions.values_mut() {
            subscribers.retain(|(id, _)| id != peer);
        }
    }

    fn is_live(&self, peer: &PeerId) -> bool {
        self.lock().live.contains_key(peer)
    }

    fn connected_peers(&self, asking: &PeerId) -> Vec<PeerInfo> {
        self.lock()
            .live
            .iter()
            .filter(|(id, _)| *id != asking)
            .map(|(id, addrs)| PeerInfo {
                id: id.clone(),
                addrs: addrs.clone(),
            })
            .collect()
    }

    fn subscribe(&self, peer: &PeerId, topic: &str, inbox: Inbox) {
        self.lock()
            .subscriptions
            .entry(topic.to_owned())
            .or_default()
            .push((peer.clone(), inbox));
    }

    fn topic_peers(&self, topic: &str, asking: &PeerId) -> Vec<PeerId> {
        let state = self.lock();
        state
            .subscriptions
            .get(topic)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|(id, _)| id != asking && state.live.contains_key(id))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish(&self, from: &PeerId, topic: &str, payload: &[u8]) -> usize {
        let state = self.lock();
        let mut delivered = 0;
        if let Some(subscribers) = state.subscriptions.get(topic) {
            for (id, inbox) in subscribers {
                if id != from && state.live.contains_key(id) {
                    inbox.deliver(payload.to_vec());
                    delivered += 1;
                }
            }
        }
        debug!(target: MESH_TARGET, topic, delivered, "published payload");
        delivered
    }
}

/// One fake node: a controller and API handle over a shared [`Mesh`].
///
/// Clones share identity and repository, so a clone can serve as the API
/// handle while the original is owned by a lifecycle manager.
#[derive(Debug, Clone)]
pub struct MeshNode {
    mesh: Mesh,
    peer_id: PeerId,
    paths: RepoPaths,
    marker: String,
    swarm_addrs: Vec<String>,
}

impl MeshNode {
    /// Builds a node with the given peer identifier, preparing its
    /// repository directory.
    pub fn new(mesh: &Mesh, id: &str, config: &NodeConfig) -> Result<Self, MeshError> {
        let paths = RepoPaths::from_config(config)?;
        Ok(Self {
            mesh: mesh.clone(),
            peer_id: PeerId::from(id),
            paths,
            marker: config.api.to_string(),
            swarm_addrs: config.swarm_addrs.clone(),
        })
    }

    /// This node's peer identifier.
    #[must_use]
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Simulates an external kill: the node vanishes from the mesh while
    /// its liveness marker stays on disk.
    pub fn crash(&self) {
        self.mesh.leave(&self.peer_id);
    }

    fn ensure_live(&self) -> Result<(), MeshError> {
        if self.mesh.is_live(&self.peer_id) {
            Ok(())
        } else {
            Err(MeshError::NotRunning {
                peer: self.peer_id.clone(),
            })
        }
    }
}

impl NodeController for MeshNode {
    type Error = MeshError;

    fn init(&mut self) -> Result<(), MeshError> {
        if self.paths.config_path().exists() {
            return Ok(());
        }
        fs::write(self.paths.config_path(), b"{}\n").map_err(|source| MeshError::Io {
            path: self.paths.config_path().to_path_buf(),
            source,
        })
    }

    fn start(&mut self) -> Result<(), MeshError> {
        if self.paths.api_path().exists() {
            if self.mesh.is_live(&self.peer_id) {
                // A running node already owns the marker; attach to it.
                return Ok(());
            }
            return Err(MeshError::Refused {
                path: self.paths.api_path().to_path_buf(),
            });
        }
        fs::write(self.paths.api_path(), &self.marker).map_err(|source| MeshError::Io {
            path: self.paths.api_path().to_path_buf(),
            source,
        })?;
        self.mesh.join(&self.peer_id, &self.swarm_addrs);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MeshError> {
        self.mesh.leave(&self.peer_id);
        match fs::remove_file(self.paths.api_path()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MeshError::Io {
                path: self.paths.api_path().to_path_buf(),
                source,
            }),
        }
    }
}

impl NodeApi for MeshNode {
    type Error = MeshError;

    fn connected_peers(&self) -> Result<Vec<PeerInfo>, MeshError> {
        self.ensure_live()?;
        Ok(self.mesh.connected_peers(&self.peer_id))
    }

    fn peers(&self, topic: &str) -> Result<Vec<PeerId>, MeshError> {
        self.ensure_live()?;
        Ok(self.mesh.topic_peers(topic, &self.peer_id))
    }

    fn subscribe(&self, topic: &str, inbox: Inbox) -> Result<(), MeshError> {
        self.ensure_live()?;
        self.mesh.subscribe(&self.peer_id, topic, inbox);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), MeshError> {
        self.ensure_live()?;
        self.mesh.publish(&self.peer_id, topic, payload);
        Ok(())
    }
}

/// Errors raised by the fixture.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The repository directory could not be prepared.
    #[error(transparent)]
    Repo(#[from] RepoPathsError),
    /// The liveness marker points at a node nothing answers for.
    #[error("connection refused: liveness marker '{path}' points at a dead node")]
    Refused { path: PathBuf },
    /// An API call reached a node that is not running.
    #[error("node '{peer}' is not running")]
    NotRunning { peer: PeerId },
    /// A repository file operation failed.
    #[error("failed to touch repository file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ControllerError for MeshError {
    fn is_connection_refused(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node(mesh: &Mesh, id: &str, dir: &TempDir) -> MeshNode {
        let config = NodeConfig::for_repo(dir.path().to_str().expect("utf8 path"));
        MeshNode::new(mesh, id, &config).expect("build node")
    }

    #[test]
    fn starting_writes_the_marker_and_joins_the_mesh() {
        let mesh = Mesh::new();
        let dir = TempDir::new().expect("temp dir");
        let mut node = node(&mesh, "peer-a", &dir);
        node.start().expect("start node");
        assert!(dir.path().join("api").exists());
        assert!(mesh.is_live(node.peer_id()));
    }

    #[test]
    fn a_crashed_node_leaves_a_stale_marker_behind() {
        let mesh = Mesh::new();
        let dir = TempDir::new().expect("temp dir");
        let mut node = node(&mesh, "peer-a", &dir);
        node.start().expect("start node");
        node.crash();
        assert!(dir.path().join("api").exists());
        let error = node.start().expect_err("stale marker refuses the start");
        assert!(error.is_connection_refused());
    }

    #[test]
    fn stopping_drops_subscriptions_and_the_marker() {
        let mesh = Mesh::new();
        let dir_a = TempDir::new().expect("temp dir");
        let dir_b = TempDir::new().expect("temp dir");
        let mut a = node(&mesh, "peer-a", &dir_a);
        let mut b = node(&mesh, "peer-b", &dir_b);
        a.start().expect("start a");
        b.start().expect("start b");
        a.subscribe("updates", Inbox::new()).expect("subscribe a");
        assert_eq!(b.peers("updates").expect("peers"), vec![a.peer_id().clone()]);
        a.stop().expect("stop a");
        assert!(b.peers("updates").expect("peers").is_empty());
        assert!(!dir_a.path().join("api").exists());
    }

    #[test]
    fn publish_reaches_every_other_subscriber() {
        let mesh = Mesh::new();
        let dir_a = TempDir::new().expect("temp dir");
        let dir_b = TempDir::new().expect("temp dir");
        let mut a = node(&mesh, "peer-a", &dir_a);
        let mut b = node(&mesh, "peer-b", &dir_b);
        a.start().expect("start a");
        b.start().expect("start b");
        let inbox_a = Inbox::new();
        let inbox_b = Inbox::new();
        a.subscribe("updates", inbox_a.clone()).expect("subscribe a");
        b.subscribe("updates", inbox_b.clone()).expect("subscribe b");
        b.publish("updates", b"ping").expect("publish");
        // Delivery excludes the publisher.
        assert_eq!(inbox_a.take(), Some(b"ping".to_vec()));
        assert!(!inbox_b.has_message());
    }

    #[test]
    fn connected_peers_lists_other_live_nodes_with_their_addresses() {
        let mesh = Mesh::new();
        let dir_a = TempDir::new().expect("temp dir");
        let dir_b = TempDir::new().expect("temp dir");
        let mut a = node(&mesh, "peer-a", &dir_a);
        let mut b = node(&mesh, "peer-b", &dir_b);
        a.start().expect("start a");
        b.start().expect("start b");
        let peers = a.connected_peers().expect("connected peers");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, b.peer_id().clone());
        assert!(!peers[0].addrs.is_empty());
    }

    #[test]
    fn api_calls_fail_when_the_node_is_down() {
        let mesh = Mesh::new();
        let dir = TempDir::new().expect("temp dir");
        let node = node(&mesh, "peer-a", &dir);
        let error = node.peers("updates").expect_err("node never started");
        assert!(matches!(error, MeshError::NotRunning { .. }));
    }
}
