use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// SOCKS5 endpoint, resolved once before the record loop and shared
/// read-only by every verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$").unwrap()
});

/// `localhost`, a dotted domain name, or an IPv4 literal.
pub fn host_is_valid(host: &str) -> bool {
    host == "localhost" || host.parse::<Ipv4Addr>().is_ok() || HOSTNAME_RE.is_match(host)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("proxy specification must be host:port, got {0:?}")]
    Format(String),
    #[error("invalid proxy host {0:?}")]
    Host(String),
    #[error("invalid proxy port {0:?}")]
    Port(String),
}

impl ProxyEndpoint {
    /// Parse a `host:port` specification with exactly one colon.
    ///
    /// A bad specification aborts the whole run, not just one record: a
    /// misconfigured proxy would misroute every subsequent attempt.
    pub fn parse(spec: &str) -> Result<Self, ProxyError> {
        let mut parts = spec.split(':');
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ProxyError::Format(spec.to_string()));
        };
        if !host_is_valid(host) {
            return Err(ProxyError::Host(host.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ProxyError::Port(port.to_string()))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}
