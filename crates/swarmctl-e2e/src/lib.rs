//! End-to-end acceptance layer for swarm node supervision.
//!
//! Provides the [`mesh`] fixture: an in-memory broker plus fake nodes that
//! reproduce the observable behaviour of a real swarm daemon (liveness
//! marker on disk, attach/refuse semantics, topic membership, payload
//! delivery) without any networking. The acceptance tests in `tests/`
//! drive two lifecycle managers against the fixture exactly the way a
//! scenario runner would drive real nodes.

pub mod mesh;

pub use mesh::{Mesh, MeshError, MeshNode};
