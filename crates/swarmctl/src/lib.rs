//! Supervision of external swarm node daemons.
//!
//! The crate covers two tightly coupled concerns:
//!
//! - [`daemon`] manages the lifecycle of one node process through the
//!   [`controller::NodeController`] contract, recovering from stale on-disk
//!   state left behind by unclean shutdowns.
//! - [`converge`] decides, within a bounded wall-clock budget, whether an
//!   eventually-consistent condition (a peer appearing, a message arriving)
//!   becomes observably true.
//!
//! The node's own networking and pubsub implementation stays external; the
//! crate only defines the contracts it consumes ([`api`]) and a
//! process-spawning controller ([`spawn`]) for driving a real node binary.

pub mod api;
pub mod controller;
pub mod converge;
pub mod daemon;
pub mod inbox;
pub mod probe;
pub mod spawn;
pub mod telemetry;

pub use api::{NodeApi, PeerId, PeerInfo};
pub use controller::{ControllerError, NodeController};
pub use converge::{Convergence, wait_for, wait_until};
pub use daemon::{InitError, NodeDaemon, StartError};
pub use inbox::Inbox;
pub use probe::{ProbeError, endpoint_is_reachable};
pub use spawn::{BinaryController, SpawnError};
