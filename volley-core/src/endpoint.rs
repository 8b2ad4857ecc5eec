use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A `tcp://host:port` address used for result streams and the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Same host, different port. Used to advertise the port a `:0` bind resolved to.
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as accepted by tokio's connect/bind helpers.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidEndpoint(s.to_string());
        let parsed = url::Url::parse(s.trim()).map_err(|_| invalid())?;
        if parsed.scheme() != "tcp" {
            return Err(invalid());
        }

        let host = match parsed.host().ok_or_else(invalid)? {
            url::Host::Domain(d) => d.to_string(),
            url::Host::Ipv4(ip) => ip.to_string(),
            url::Host::Ipv6(ip) => ip.to_string(),
        };
        let port = parsed.port().ok_or_else(invalid)?;

        Ok(Self { host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}", self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_urls() {
        let ep: Endpoint = match "tcp://127.0.0.1:7781".parse() {
            Ok(v) => v,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert_eq!(ep.host(), "127.0.0.1");
        assert_eq!(ep.port(), 7781);
        assert_eq!(ep.to_string(), "tcp://127.0.0.1:7781");

        let ep: Endpoint = match "tcp://[::1]:9000".parse() {
            Ok(v) => v,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert_eq!(ep.authority(), "[::1]:9000");
    }

    #[test]
    fn rejects_other_schemes_and_missing_ports() {
        assert!("http://127.0.0.1:80".parse::<Endpoint>().is_err());
        assert!("tcp://127.0.0.1".parse::<Endpoint>().is_err());
        assert!("127.0.0.1:80".parse::<Endpoint>().is_err());
    }
}
