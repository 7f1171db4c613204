//! Default values shared by the configuration surface.

use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Default TCP port for the node's control API.
pub const DEFAULT_API_PORT: u16 = 9301;

/// Default TCP port for the node's gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 9302;

/// Default log filter expression for the supervising process.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default swarm listen addresses, passed to the node verbatim.
pub fn default_swarm_addrs() -> Vec<String> {
    vec!["/ip4/0.0.0.0/tcp/9300".to_owned()]
}

/// Computes the default repository directory for a node.
///
/// Prefers the user runtime directory; falls back to a uid-namespaced
/// location under the system temporary directory.
#[must_use]
pub fn default_repo_dir() -> Utf8PathBuf {
    default_repo_dir_inner()
}

#[cfg(unix)]
fn default_repo_dir_inner() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };
    base.push("swarmctl");
    if apply_namespace {
        base.push(format!("uid-{}", unsafe { geteuid() }));
    }
    base.push("repo");
    base
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(not(unix))]
fn default_repo_dir_inner() -> Utf8PathBuf {
    let mut base =
        Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("."));
    base.push("swarmctl");
    base.push("repo");
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_repo_dir_ends_with_the_project_namespace() {
        let dir = default_repo_dir();
        assert!(dir.as_str().contains("swarmctl"));
        assert!(dir.as_str().ends_with("repo"));
    }
}
