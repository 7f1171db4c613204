//! Derives the on-disk artefact paths inside a node repository.
//!
//! The supervising process and the node agree on only two files: the `api`
//! liveness marker the node writes while running, and the `config` file its
//! one-time initialisation produces. Everything else in the repository is
//! the node's own business and is never inspected.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::NodeConfig;

/// Names of the repository artefacts shared with the node process.
const API_MARKER_FILE: &str = "api";
const REPO_CONFIG_FILE: &str = "config";

/// Canonical artefact paths for one node repository.
#[derive(Debug, Clone)]
pub struct RepoPaths {
    repo_dir: PathBuf,
    api_path: PathBuf,
    config_path: PathBuf,
}

impl RepoPaths {
    /// Derives repository paths, creating the repository directory itself
    /// when missing. Succeeds whether or not the directory already existed.
    pub fn from_config(config: &NodeConfig) -> Result<Self, RepoPathsError> {
        let repo_dir = config.repo_dir.as_std_path().to_path_buf();
        fs::create_dir_all(&repo_dir).map_err(|source| RepoPathsError::RepoDirectory {
            path: repo_dir.clone(),
            source,
        })?;
        Ok(Self {
            api_path: repo_dir.join(API_MARKER_FILE),
            config_path: repo_dir.join(REPO_CONFIG_FILE),
            repo_dir,
        })
    }

    /// The repository directory.
    #[must_use]
    pub fn repo_dir(&self) -> &Path {
        self.repo_dir.as_path()
    }

    /// The `api` liveness marker the node writes while running.
    #[must_use]
    pub fn api_path(&self) -> &Path {
        self.api_path.as_path()
    }

    /// The node configuration file written by repository initialisation.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        self.config_path.as_path()
    }
}

/// Errors raised while deriving repository paths.
#[derive(Debug, Error)]
pub enum RepoPathsError {
    /// Creating the repository directory failed.
    #[error("failed to prepare repository directory '{path}': {source}")]
    RepoDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
