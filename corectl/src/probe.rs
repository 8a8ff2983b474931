//! Delay probing
//!
//! [`TcpProber`] measures how long a TCP handshake to the target takes. All
//! connect attempts for one probe share a single deadline, so a target with
//! several dead addresses still returns within the configured timeout. Name
//! resolution goes through the system resolver and is not covered by that
//! deadline.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::{Error, Result};

/// Default connect timeout for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Measures round-trip delay to a target.
pub trait DelayProber: Send + Sync {
    /// Probe `target` and return the measured delay.
    ///
    /// Implementations must return within their own timeout.
    fn probe(&self, target: &str) -> Result<Duration>;
}

/// Prober that times a TCP connect to the target
#[derive(Debug, Clone, Copy)]
pub struct TcpProber {
    timeout: Duration,
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl TcpProber {
    /// Create a prober with the given connect timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Get the connect timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn connect_once(addr: SocketAddr, timeout: Duration) -> io::Result<Duration> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        let started = Instant::now();
        socket.connect_timeout(&SockAddr::from(addr), timeout)?;
        Ok(started.elapsed())
    }

    /// Try each address in turn until one connects or `deadline` passes.
    fn connect_any(&self, target: &str, addrs: &[SocketAddr], deadline: Instant) -> Result<Duration> {
        let mut last_err = None;
        for &addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_err = Some(io::Error::new(io::ErrorKind::TimedOut, "connect deadline exceeded"));
                break;
            }

            match Self::connect_once(addr, remaining) {
                Ok(delay) => {
                    log::debug!("Probe {} via {}: {:?}", target, addr, delay);
                    return Ok(delay);
                }
                Err(e) => {
                    log::debug!("Probe {} via {} failed: {}", target, addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::Unreachable(match last_err {
            Some(e) => format!("{}: {}", target, e),
            None => format!("{}: no addresses resolved", target),
        }))
    }
}

impl DelayProber for TcpProber {
    fn probe(&self, target: &str) -> Result<Duration> {
        let (host, port) = parse_target(target)?;
        let addrs: Vec<SocketAddr> = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| Error::Unreachable(format!("{}: {}", target, e)))?
            .collect();

        let deadline = Instant::now() + self.timeout;
        self.connect_any(target, &addrs, deadline)
    }
}

/// Split a probe target into host and port.
///
/// Accepts `host:port`, `[v6]:port`, and URLs of the form
/// `scheme://host[:port][/path]`. `http` and `https` URLs default to ports
/// 80 and 443.
pub fn parse_target(target: &str) -> Result<(String, u16)> {
    let target = target.trim();
    let invalid = || Error::Unreachable(format!("{}: invalid probe target", target));

    let (default_port, rest) = match target.split_once("://") {
        Some((scheme, rest)) => {
            let port = match scheme.to_ascii_lowercase().as_str() {
                "http" => Some(80),
                "https" => Some(443),
                _ => None,
            };
            (port, rest)
        }
        None => (None, target),
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);
    if authority.is_empty() {
        return Err(invalid());
    }

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(invalid)?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(p.parse::<u16>().map_err(|_| invalid())?),
            None if after.is_empty() => None,
            None => return Err(invalid()),
        };
        (host, port)
    } else {
        match authority.rsplit_once(':') {
            Some((host, p)) if !host.contains(':') => {
                (host, Some(p.parse::<u16>().map_err(|_| invalid())?))
            }
            _ => (authority, None),
        }
    };

    let port = port.or(default_port).ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}
