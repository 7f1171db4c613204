//! Fatal errors surfaced by the lifecycle manager.
//!
//! Stop failures are deliberately absent: stopping is best-effort and its
//! errors are logged, never propagated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use swarmctl_config::RepoPathsError;

use crate::controller::ControllerError;

/// The node repository could not be prepared. Fatal at construction; never
/// retried.
#[derive(Debug, Error)]
pub enum InitError<E: ControllerError> {
    /// The repository directory itself was unusable.
    #[error(transparent)]
    Repo(#[from] RepoPathsError),
    /// The controller rejected the repository contents.
    #[error("node repository initialisation failed: {source}")]
    Controller {
        #[source]
        source: E,
    },
}

/// The node could not be brought to a running state, even after the single
/// stale-recovery retry. Fatal to the calling scenario.
#[derive(Debug, Error)]
pub enum StartError<E: ControllerError> {
    /// The controller's final start attempt failed.
    #[error("node failed to start: {source}")]
    Controller {
        #[source]
        source: E,
    },
    /// The stale liveness marker could not be deleted during recovery.
    #[error("failed to remove stale liveness marker '{path}': {source}")]
    RemoveMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
