//! The contract a controllable node process must satisfy.
//!
//! The lifecycle manager never talks to a node directly; it drives an
//! implementation of [`NodeController`] and reasons about failures only
//! through the [`ControllerError`] classification.

use std::error::Error;

/// Error surface of a [`NodeController`] implementation.
///
/// The single classification the lifecycle manager depends on is
/// "connection refused": a start attempt that failed because a recorded
/// API endpoint had nothing listening behind it. That class, and only that
/// class, triggers stale-marker recovery.
pub trait ControllerError: Error + Send + Sync + 'static {
    /// Whether this error means a probe of the node's API endpoint was
    /// refused (no process listening).
    fn is_connection_refused(&self) -> bool;
}

/// Handle to a controllable node process.
///
/// Implementations own the mechanics of bringing a node up and down; the
/// lifecycle manager sequences the calls and supplies the stale-state
/// recovery policy on top.
pub trait NodeController {
    /// Error type for all operations.
    type Error: ControllerError;

    /// Prepares the node's repository. Must be idempotent: calling it on
    /// an already-initialised repository succeeds and changes nothing.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Brings the node to a running, API-reachable state, or attaches to
    /// one that is already running. Returns only once the node is
    /// reachable. A failure caused by a stale liveness marker must report
    /// `true` from [`ControllerError::is_connection_refused`].
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stops the node. Callers at the lifecycle-manager layer treat
    /// failures as non-fatal.
    fn stop(&mut self) -> Result<(), Self::Error>;
}
