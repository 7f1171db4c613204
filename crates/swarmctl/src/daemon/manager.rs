//! The attach-or-start-fresh lifecycle manager.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use swarmctl_config::{NodeConfig, RepoPaths};

use super::DAEMON_TARGET;
use super::error::{InitError, StartError};
use crate::controller::{ControllerError, NodeController};

/// Manages the lifecycle of one external node process.
///
/// Owns a [`NodeController`] plus the path of the node's liveness marker,
/// and makes `start` robust against three real-world conditions: a clean
/// cold start, a previous process that is still alive and reachable, and a
/// previous process that died uncleanly leaving a marker that falsely
/// claims a live API endpoint.
///
/// The manager never touches repository contents except the single marker
/// file, and only when recovering from a detected stale state. Operations
/// on one manager are a strict sequential protocol: create, start, use,
/// stop.
#[derive(Debug)]
pub struct NodeDaemon<C> {
    controller: C,
    api_marker: PathBuf,
    attached_to_existing: bool,
}

impl<C: NodeController> NodeDaemon<C> {
    /// Builds a manager for the configured repository and initialises the
    /// repository through the controller.
    ///
    /// Repository initialisation is idempotent: an already-initialised
    /// repository is accepted as-is.
    pub fn create(config: &NodeConfig, mut controller: C) -> Result<Self, InitError<C::Error>> {
        let paths = RepoPaths::from_config(config)?;
        controller
            .init()
            .map_err(|source| InitError::Controller { source })?;
        Ok(Self {
            controller,
            api_marker: paths.api_path().to_path_buf(),
            attached_to_existing: false,
        })
    }

    /// Brings the node to a running, reachable state.
    ///
    /// A start attempt refused at the API endpoint is taken to mean the
    /// previous process was killed externally and left a stale marker
    /// behind: the marker is deleted and the start retried exactly once.
    /// When the marker pre-existed and no recovery was needed, the manager
    /// instead attached to an already-running process and performs a flush
    /// cycle (stop, then start again) to discard any connections or
    /// subscriptions the prior owner left attached.
    ///
    /// On success [`Self::attached_to_existing`] reports whether a flush
    /// cycle occurred.
    pub fn start(&mut self) -> Result<(), StartError<C::Error>> {
        let mut attached = self.api_marker.exists();

        if let Err(error) = self.controller.start() {
            if !error.is_connection_refused() {
                self.attached_to_existing = false;
                return Err(StartError::Controller { source: error });
            }
            warn!(
                target: DAEMON_TARGET,
                marker = %self.api_marker.display(),
                "node was probably killed externally; removing stale marker and starting fresh"
            );
            self.remove_marker()?;
            attached = false;
            if let Err(source) = self.controller.start() {
                self.attached_to_existing = false;
                return Err(StartError::Controller { source });
            }
        }

        if attached {
            warn!(
                target: DAEMON_TARGET,
                "attached to an already-running node; restarting it to flush inherited state"
            );
            if let Err(error) = self.controller.stop() {
                warn!(
                    target: DAEMON_TARGET,
                    error = %error,
                    "stop before flush restart failed; attempting the restart anyway"
                );
            }
            if let Err(source) = self.controller.start() {
                self.attached_to_existing = false;
                return Err(StartError::Controller { source });
            }
        }

        self.attached_to_existing = attached;
        info!(
            target: DAEMON_TARGET,
            attached,
            "node running"
        );
        Ok(())
    }

    /// Stops the node, best-effort.
    ///
    /// Safe on an already-stopped handle and after a failed start; a
    /// controller failure is logged and swallowed, so the caller learns
    /// only that the call returned.
    pub fn stop(&mut self) {
        if let Err(error) = self.controller.stop() {
            warn!(
                target: DAEMON_TARGET,
                error = %error,
                "node stop failed; continuing"
            );
        }
    }

    /// Whether the last successful start attached to an already-running
    /// process (and therefore performed a flush cycle).
    #[must_use]
    pub fn attached_to_existing(&self) -> bool {
        self.attached_to_existing
    }

    /// Path of the liveness marker this manager watches.
    #[must_use]
    pub fn api_marker(&self) -> &Path {
        self.api_marker.as_path()
    }

    /// Shared access to the underlying controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Consumes the manager, returning the controller.
    pub fn into_controller(self) -> C {
        self.controller
    }

    fn remove_marker(&self) -> Result<(), StartError<C::Error>> {
        match fs::remove_file(&self.api_marker) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StartError::RemoveMarker {
                path: self.api_marker.clone(),
                source,
            }),
        }
    }
}
