//! Lifecycle recovery properties, driven end to end over the mesh fixture.

use tempfile::TempDir;

use swarmctl::{Inbox, NodeApi, NodeController, NodeDaemon};
use swarmctl_config::NodeConfig;
use swarmctl_e2e::{Mesh, MeshNode};

fn repo_config(dir: &TempDir) -> NodeConfig {
    NodeConfig::for_repo(dir.path().to_str().expect("utf8 path"))
}

#[test]
fn repository_initialisation_is_idempotent() {
    let mesh = Mesh::new();
    let dir = TempDir::new().expect("temp dir");
    let config = repo_config(&dir);
    let mut node = MeshNode::new(&mesh, "peer-a", &config).expect("build node");
    node.init().expect("first init");
    node.init().expect("second init");
    // Creating a manager initialises again through the controller; an
    // already-initialised repository must still be accepted.
    let daemon = NodeDaemon::create(&config, node.clone()).expect("create over initialised repo");
    drop(daemon);
    NodeDaemon::create(&config, node).expect("create a second time");
}

#[test]
fn stale_marker_recovery_starts_a_fresh_node() {
    let mesh = Mesh::new();
    let dir = TempDir::new().expect("temp dir");
    let config = repo_config(&dir);

    // A previous run that was killed externally: marker on disk, no node.
    let prior = MeshNode::new(&mesh, "peer-a", &config).expect("build prior node");
    let mut prior_controller = prior.clone();
    prior_controller.init().expect("init prior");
    prior_controller.start().expect("start prior");
    prior.crash();
    assert!(dir.path().join("api").exists());

    let replacement = MeshNode::new(&mesh, "peer-a", &config).expect("build replacement");
    let mut daemon = NodeDaemon::create(&config, replacement).expect("create manager");
    daemon.start().expect("start recovers from the stale marker");
    // A fresh process took over: the marker was recreated, and no flush
    // cycle against a live prior owner happened.
    assert!(!daemon.attached_to_existing());
    assert!(dir.path().join("api").exists());
    daemon.stop();
}

#[test]
fn attaching_to_a_live_node_flushes_inherited_state() {
    let mesh = Mesh::new();
    let dir = TempDir::new().expect("temp dir");
    let observer_dir = TempDir::new().expect("observer dir");
    let config = repo_config(&dir);

    // The prior owner is still alive and holds a subscription.
    let prior = MeshNode::new(&mesh, "peer-a", &config).expect("build prior node");
    let mut prior_controller = prior.clone();
    prior_controller.init().expect("init prior");
    prior_controller.start().expect("start prior");
    prior
        .subscribe("inherited-topic", Inbox::new())
        .expect("subscribe prior");

    let mut observer = MeshNode::new(&mesh, "peer-b", &repo_config(&observer_dir))
        .expect("build observer");
    observer.start().expect("start observer");
    assert_eq!(
        observer.peers("inherited-topic").expect("peers"),
        vec![prior.peer_id().clone()]
    );

    let mut daemon = NodeDaemon::create(&config, prior.clone()).expect("create manager");
    daemon.start().expect("attach and flush");
    assert!(daemon.attached_to_existing());
    // The flush cycle discarded the subscription the prior owner left
    // attached, while the node itself came back up.
    assert!(observer.peers("inherited-topic").expect("peers").is_empty());

    // The flushed node is genuinely running: stopping it succeeds and
    // removes its marker.
    daemon.stop();
    assert!(!dir.path().join("api").exists());
}

#[test]
fn stop_before_any_start_is_harmless() {
    let mesh = Mesh::new();
    let dir = TempDir::new().expect("temp dir");
    let config = repo_config(&dir);
    let node = MeshNode::new(&mesh, "peer-a", &config).expect("build node");
    let mut daemon = NodeDaemon::create(&config, node).expect("create manager");
    daemon.stop();
    daemon.stop();
}
