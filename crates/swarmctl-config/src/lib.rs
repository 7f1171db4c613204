//! Shared configuration for swarm node supervision.
//!
//! Describes everything a lifecycle manager needs to know about one node:
//! where its repository lives, which addresses it listens on, and how the
//! supervising process should log. The node's own repository contents stay
//! opaque; only the artefact paths derived here are ever touched.

mod defaults;
mod endpoint;
mod logging;
mod repo;

pub use defaults::{
    DEFAULT_API_PORT, DEFAULT_GATEWAY_PORT, DEFAULT_LOG_FILTER, default_repo_dir,
    default_swarm_addrs,
};
pub use endpoint::{ApiEndpoint, EndpointParseError};
pub use logging::{LogConfig, LogFormat};
pub use repo::{RepoPaths, RepoPathsError};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Configuration for a single supervised swarm node.
///
/// Two nodes taking part in the same trial must be given disjoint
/// repository directories and non-overlapping addresses; nothing here is
/// process-wide shared state.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// Repository directory owned by the node process.
    pub repo_dir: Utf8PathBuf,
    /// Endpoint the node's control API listens on.
    pub api: ApiEndpoint,
    /// Endpoint the node's gateway listens on.
    pub gateway: ApiEndpoint,
    /// Swarm listen addresses, passed through to the node verbatim.
    pub swarm_addrs: Vec<String>,
    /// Bootstrap peer addresses; an empty list is permitted and means the
    /// node starts with no prior peers.
    pub bootstrap: Vec<String>,
    /// Logging options for the supervising process.
    pub log: LogConfig,
}

impl NodeConfig {
    /// Builds a configuration rooted at the given repository directory,
    /// keeping every other option at its default.
    #[must_use]
    pub fn for_repo(repo_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            api: ApiEndpoint::tcp("127.0.0.1", DEFAULT_API_PORT),
            gateway: ApiEndpoint::tcp("127.0.0.1", DEFAULT_GATEWAY_PORT),
            swarm_addrs: default_swarm_addrs(),
            bootstrap: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_repo_overrides_only_the_repository() {
        let config = NodeConfig::for_repo("/tmp/swarm-test");
        assert_eq!(config.repo_dir, Utf8PathBuf::from("/tmp/swarm-test"));
        assert_eq!(config.api, ApiEndpoint::tcp("127.0.0.1", DEFAULT_API_PORT));
        assert!(config.bootstrap.is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = NodeConfig::for_repo("/tmp/swarm-test");
        let encoded = serde_json::to_string(&config).expect("serialise config");
        let decoded: NodeConfig = serde_json::from_str(&encoded).expect("parse config");
        assert_eq!(decoded, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let decoded: NodeConfig =
            serde_json::from_str(r#"{"repo_dir": "/srv/node-a"}"#).expect("parse partial config");
        assert_eq!(decoded.repo_dir, Utf8PathBuf::from("/srv/node-a"));
        assert_eq!(decoded.gateway, NodeConfig::default().gateway);
    }
}
