//! Endpoint reachability probing.
//!
//! Used by controllers to decide whether a recorded API endpoint has a
//! live process behind it, and by poll predicates waiting for a node to
//! come up or go away.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

use swarmctl_config::ApiEndpoint;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks whether something is listening on the endpoint.
///
/// Resolves `Ok(false)` only for error classes that positively indicate
/// the absence of a listener; anything else (permission problems, probe
/// timeouts) surfaces as a [`ProbeError`] rather than being mistaken for
/// an answer.
pub fn endpoint_is_reachable(endpoint: &ApiEndpoint) -> Result<bool, ProbeError> {
    match try_connect(endpoint) {
        Ok(()) => Ok(true),
        Err(error) if indicates_no_listener(&error) => Ok(false),
        Err(source) => Err(ProbeError {
            endpoint: endpoint.to_string(),
            source,
        }),
    }
}

fn try_connect(endpoint: &ApiEndpoint) -> io::Result<()> {
    match endpoint {
        ApiEndpoint::Tcp { host, port } => {
            let address = resolve_tcp(host, *port)?;
            TcpStream::connect_timeout(&address, PROBE_TIMEOUT).map(|_| ())
        }
        ApiEndpoint::Unix { path } => connect_unix(path.as_str()),
    }
}

fn resolve_tcp(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved address"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<()> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, PROBE_TIMEOUT)
}

#[cfg(not(unix))]
fn connect_unix(_path: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unix sockets unsupported on this platform",
    ))
}

/// Whether an I/O error positively means nothing is listening.
///
/// `ConnectionReset` is excluded: a reset connection was first accepted,
/// so a listener exists.
fn indicates_no_listener(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotFound
            | io::ErrorKind::AddrNotAvailable
    )
}

/// A probe failed in a way that answers neither "listening" nor "absent".
#[derive(Debug, Error)]
#[error("failed to probe node api {endpoint}: {source}")]
pub struct ProbeError {
    endpoint: String,
    #[source]
    source: io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn probe_tracks_a_tcp_listener() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let endpoint = ApiEndpoint::tcp(addr.ip().to_string(), addr.port());
        assert!(endpoint_is_reachable(&endpoint).expect("probe bound endpoint"));
        drop(listener);
        // Allow the socket to leave TIME_WAIT before reprobing.
        thread::sleep(Duration::from_millis(50));
        assert!(!endpoint_is_reachable(&endpoint).expect("probe freed endpoint"));
    }

    #[cfg(unix)]
    #[test]
    fn probe_tracks_a_unix_listener() {
        use std::os::unix::net::UnixListener;
        use tempfile::TempDir;

        let dir = TempDir::new().expect("temp dir");
        let socket_path = dir.path().join("swarmd.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind unix listener");
        let endpoint = ApiEndpoint::unix(socket_path.to_str().expect("utf8 path"));
        assert!(endpoint_is_reachable(&endpoint).expect("probe bound socket"));
        drop(listener);
        thread::sleep(Duration::from_millis(50));
        assert!(!endpoint_is_reachable(&endpoint).expect("probe freed socket"));
    }

    #[rstest]
    #[case::refused(io::ErrorKind::ConnectionRefused, true)]
    #[case::not_found(io::ErrorKind::NotFound, true)]
    #[case::addr_not_available(io::ErrorKind::AddrNotAvailable, true)]
    #[case::reset(io::ErrorKind::ConnectionReset, false)]
    #[case::permission(io::ErrorKind::PermissionDenied, false)]
    #[case::timed_out(io::ErrorKind::TimedOut, false)]
    fn listener_absence_classification(#[case] kind: io::ErrorKind, #[case] expected: bool) {
        let error = io::Error::new(kind, "probe error");
        assert_eq!(indicates_no_listener(&error), expected);
    }
}
