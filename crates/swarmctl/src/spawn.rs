//! Process-backed controller that drives a real node binary.
//!
//! Mirrors the behaviour the lifecycle manager expects from a node
//! controller: attach when the repository's liveness marker points at a
//! live API, refuse when the marker is stale, and otherwise spawn the
//! binary and poll until the node becomes reachable.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use swarmctl_config::{ApiEndpoint, NodeConfig, RepoPaths, RepoPathsError};

use crate::controller::{ControllerError, NodeController};
use crate::converge::{self, Convergence};
use crate::probe::{self, ProbeError};

/// Environment variable overriding the node binary location.
pub const BIN_ENV_VAR: &str = "SWARMD_BIN";

const DEFAULT_BINARY: &str = "swarmd";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

const SPAWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::spawn");

/// Controls a node process spawned from the `swarmd` binary.
#[derive(Debug)]
pub struct BinaryController {
    binary: OsString,
    config: NodeConfig,
    paths: RepoPaths,
    child: Option<Child>,
}

impl BinaryController {
    /// Builds a controller for the configured repository.
    ///
    /// The binary is resolved from the explicit override, then the
    /// `SWARMD_BIN` environment variable, then the default binary name.
    pub fn new(config: &NodeConfig, binary_override: Option<&OsStr>) -> Result<Self, SpawnError> {
        let paths = RepoPaths::from_config(config)?;
        Ok(Self {
            binary: resolve_binary(binary_override),
            config: config.clone(),
            paths,
            child: None,
        })
    }

    fn run_init(&self) -> Result<(), SpawnError> {
        let status = Command::new(&self.binary)
            .arg("init")
            .arg("--repo")
            .arg(self.paths.repo_dir())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| SpawnError::Launch {
                binary: self.binary.clone(),
                source,
            })?;
        if !status.success() {
            return Err(SpawnError::InitFailed {
                exit_status: status.code(),
            });
        }
        Ok(())
    }

    fn spawn_daemon(&self) -> Result<Child, SpawnError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("daemon")
            .arg("--repo")
            .arg(self.paths.repo_dir())
            .arg("--api")
            .arg(self.config.api.to_string())
            .arg("--gateway")
            .arg(self.config.gateway.to_string());
        for addr in &self.config.swarm_addrs {
            command.arg("--swarm").arg(addr);
        }
        for peer in &self.config.bootstrap {
            command.arg("--bootstrap").arg(peer);
        }
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        command.spawn().map_err(|source| SpawnError::Launch {
            binary: self.binary.clone(),
            source,
        })
    }

    fn wait_for_api(&self, child: &mut Child) -> Result<Convergence, SpawnError> {
        converge::wait_for(STARTUP_TIMEOUT, POLL_INTERVAL, || {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| SpawnError::Monitor { source })?
            {
                return Err(SpawnError::Exited {
                    exit_status: status.code(),
                });
            }
            Ok(self.paths.api_path().exists() && probe::endpoint_is_reachable(&self.config.api)?)
        })
    }

    fn stop_child(&self, mut child: Child) -> Result<(), SpawnError> {
        let pid = child.id();
        signal_term(&mut child, pid)?;
        let outcome = converge::wait_for(SHUTDOWN_TIMEOUT, POLL_INTERVAL, || {
            Ok::<_, SpawnError>(
                !self.paths.api_path().exists()
                    && !probe::endpoint_is_reachable(&self.config.api)?,
            )
        })?;
        match outcome {
            Convergence::Converged { .. } => {
                if let Err(error) = child.wait() {
                    warn!(target: SPAWN_TARGET, pid, error = %error, "failed to reap node process");
                }
                info!(target: SPAWN_TARGET, pid, "node stopped");
                Ok(())
            }
            Convergence::TimedOut { elapsed } => {
                warn!(target: SPAWN_TARGET, pid, "node ignored the termination signal; killing it");
                if let Err(error) = child.kill() {
                    warn!(target: SPAWN_TARGET, pid, error = %error, "failed to kill node process");
                }
                if let Err(error) = child.wait() {
                    warn!(target: SPAWN_TARGET, pid, error = %error, "failed to reap node process");
                }
                Err(SpawnError::ShutdownTimeout { elapsed })
            }
        }
    }
}

impl NodeController for BinaryController {
    type Error = SpawnError;

    /// Idempotent: a repository that already carries a `config` file is
    /// accepted without running the binary again.
    fn init(&mut self) -> Result<(), SpawnError> {
        if self.paths.config_path().exists() {
            debug!(
                target: SPAWN_TARGET,
                repo = %self.paths.repo_dir().display(),
                "repository already initialised"
            );
            return Ok(());
        }
        self.run_init()
    }

    fn start(&mut self) -> Result<(), SpawnError> {
        if self.paths.api_path().exists() {
            if probe::endpoint_is_reachable(&self.config.api)? {
                info!(
                    target: SPAWN_TARGET,
                    api = %self.config.api,
                    "attached to an already-running node"
                );
                self.child = None;
                return Ok(());
            }
            return Err(SpawnError::Refused {
                endpoint: self.config.api.clone(),
            });
        }
        let mut child = self.spawn_daemon()?;
        match self.wait_for_api(&mut child)? {
            Convergence::Converged { .. } => {
                info!(
                    target: SPAWN_TARGET,
                    pid = child.id(),
                    api = %self.config.api,
                    "node reachable"
                );
                self.child = Some(child);
                Ok(())
            }
            Convergence::TimedOut { elapsed } => {
                if let Err(error) = child.kill() {
                    warn!(target: SPAWN_TARGET, error = %error, "failed to kill unready node");
                }
                if let Err(error) = child.wait() {
                    warn!(target: SPAWN_TARGET, error = %error, "failed to reap unready node");
                }
                Err(SpawnError::StartupTimeout {
                    endpoint: self.config.api.clone(),
                    elapsed,
                })
            }
        }
    }

    fn stop(&mut self) -> Result<(), SpawnError> {
        match self.child.take() {
            Some(child) => self.stop_child(child),
            None => {
                if probe::endpoint_is_reachable(&self.config.api)? {
                    Err(SpawnError::StopUnowned {
                        endpoint: self.config.api.clone(),
                    })
                } else {
                    // Nothing running and nothing owned: stop is a no-op.
                    Ok(())
                }
            }
        }
    }
}

fn resolve_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(BIN_ENV_VAR))
        .unwrap_or_else(|| OsString::from(DEFAULT_BINARY))
}

#[cfg(unix)]
fn signal_term(_child: &mut Child, pid: u32) -> Result<(), SpawnError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        // ESRCH means the process is already gone, which is what we want.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(SpawnError::Signal {
            pid,
            source: io::Error::from_raw_os_error(errno as i32),
        }),
    }
}

#[cfg(not(unix))]
fn signal_term(child: &mut Child, pid: u32) -> Result<(), SpawnError> {
    child.kill().map_err(|source| SpawnError::Signal { pid, source })
}

/// Errors surfaced while driving the node binary.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The repository directory could not be prepared.
    #[error(transparent)]
    Repo(#[from] RepoPathsError),
    /// The binary could not be executed at all.
    #[error("failed to launch node binary '{binary:?}': {source}")]
    Launch {
        binary: OsString,
        #[source]
        source: io::Error,
    },
    /// Repository initialisation ran but reported failure.
    #[error("node repository initialisation exited with status {exit_status:?}")]
    InitFailed { exit_status: Option<i32> },
    /// The liveness marker exists but nothing answers on the API
    /// endpoint; the marker is stale.
    #[error("connection refused probing node api at {endpoint}")]
    Refused { endpoint: ApiEndpoint },
    /// The spawned node exited before becoming reachable.
    #[error("node exited before becoming reachable (status: {exit_status:?})")]
    Exited { exit_status: Option<i32> },
    /// Watching the spawned process failed.
    #[error("failed to monitor node launch: {source}")]
    Monitor {
        #[source]
        source: io::Error,
    },
    /// The node did not become reachable within the startup budget.
    #[error("timed out after {elapsed:?} waiting for node api at {endpoint}")]
    StartupTimeout {
        endpoint: ApiEndpoint,
        elapsed: Duration,
    },
    /// The node did not shut down within the budget; its repository may
    /// retain a stale liveness marker.
    #[error("node shutdown did not complete within {elapsed:?}")]
    ShutdownTimeout { elapsed: Duration },
    /// This controller did not spawn the node it was asked to stop.
    #[error("refusing to stop a node this controller did not spawn (api {endpoint} still reachable)")]
    StopUnowned { endpoint: ApiEndpoint },
    /// Signal delivery failed.
    #[error("failed to signal node pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },
    /// An endpoint probe failed to produce an answer.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl ControllerError for SpawnError {
    fn is_connection_refused(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}
