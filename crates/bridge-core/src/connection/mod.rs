//! Connection utilities.
//!
//! Peers are addressed by IP literal only; there is no discovery. This
//! module parses and validates the address a user types and tunes the TCP
//! sockets both sides use.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::DEFAULT_PORT;

/// Parse a host address string into a `SocketAddr`.
///
/// Accepts formats:
/// - `IP` (e.g., `192.168.1.100`) - uses `default_port`
/// - `IP:PORT` (e.g., `192.168.1.100:5000`) - uses specified port
/// - `[IPv6]` (e.g., `[::1]`) - uses `default_port`
/// - `[IPv6]:PORT` (e.g., `[::1]:5000`) - uses specified port
///
/// # Examples
///
/// ```
/// use bridge_core::connection::parse_host_address;
///
/// let addr = parse_host_address("192.168.1.100", 12345).unwrap();
/// assert_eq!(addr.port(), 12345);
///
/// let addr = parse_host_address("192.168.1.100:5000", 12345).unwrap();
/// assert_eq!(addr.port(), 5000);
/// ```
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the host string is not an IP literal
/// with an optional non-zero port.
pub fn parse_host_address(host: &str, default_port: u16) -> Result<SocketAddr> {
    let host = host.trim();
    let invalid = || {
        Error::InvalidInput(format!(
            "Invalid host format '{host}'. Use IP or IP:PORT (e.g., 192.168.1.100 or 192.168.1.100:{DEFAULT_PORT})"
        ))
    };

    let addr = if let Ok(addr) = host.parse::<SocketAddr>() {
        addr
    } else if let Some(ip_str) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        let ip: IpAddr = ip_str.parse().map_err(|_| invalid())?;
        SocketAddr::new(ip, default_port)
    } else if let Ok(ip) = host.parse::<IpAddr>() {
        SocketAddr::new(ip, default_port)
    } else if let Some((ip_part, port_part)) = host.rsplit_once(':') {
        if ip_part.contains(':') {
            return Err(invalid());
        }
        let ip: IpAddr = ip_part.parse().map_err(|_| invalid())?;
        let port: u16 = port_part.parse().map_err(|_| {
            Error::InvalidInput(format!(
                "Invalid port '{port_part}'. Port must be a number between 1 and 65535"
            ))
        })?;
        SocketAddr::new(ip, port)
    } else {
        return Err(invalid());
    };

    validate_port(addr.port())?;
    Ok(addr)
}

/// Check that a port can be dialed.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for port 0.
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::InvalidInput(
            "Port must be a number between 1 and 65535".to_string(),
        ));
    }
    Ok(())
}

/// Configure TCP keep-alive on a socket.
///
/// Keeps long transfers from being cut by NAT or firewall idle timers and
/// lets a dead peer surface as an I/O error instead of a silent hang.
///
/// Configuration:
/// - Start probing after 10 seconds of idle time
/// - Send probes every 5 seconds
pub fn configure_tcp_keepalive(stream: &TcpStream) -> Result<()> {
    let socket_ref = SockRef::from(stream);

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(10))
        .with_interval(Duration::from_secs(5));

    socket_ref.set_tcp_keepalive(&keepalive)?;

    tracing::debug!("TCP keep-alive enabled on socket");
    Ok(())
}
