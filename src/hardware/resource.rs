//! Instrument address parsing.
//!
//! Accepts the VISA style strings lab scripts already use, plus plain
//! `host:port`:
//!
//! - `TCPIP::192.168.0.1::INSTR` / `TCPIP0::192.168.0.1::inst0::INSTR`
//!   (LAN instrument, SCPI raw socket on port 5025)
//! - `TCPIP0::192.168.0.1::5025::SOCKET`
//! - `192.168.0.1:5025`

use crate::error::{FieldFoxError, FieldFoxResult};
use std::fmt;

/// Standard SCPI raw socket port on LXI instruments.
pub const SCPI_SOCKET_PORT: u16 = 5025;

/// Host and port of a SCPI socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl SocketAddress {
    /// Parse a resource string.
    ///
    /// `default_port` is used for `::INSTR` resources and bare hosts.
    pub fn parse(resource: &str, default_port: u16) -> FieldFoxResult<Self> {
        let resource = resource.trim();
        if resource.is_empty() {
            return Err(FieldFoxError::Configuration(
                "instrument resource cannot be empty".to_string(),
            ));
        }

        if resource.to_ascii_uppercase().starts_with("TCPIP") {
            return Self::parse_visa(resource, default_port);
        }
        if resource.contains("::") {
            return Err(FieldFoxError::Configuration(format!(
                "only TCPIP resources are supported, got '{}'",
                resource
            )));
        }

        match resource.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Ok(Self {
                host: host.to_string(),
                port: parse_port(resource, port)?,
            }),
            _ => Ok(Self {
                host: resource.to_string(),
                port: default_port,
            }),
        }
    }

    fn parse_visa(resource: &str, default_port: u16) -> FieldFoxResult<Self> {
        let parts: Vec<&str> = resource.split("::").collect();
        let invalid = || {
            FieldFoxError::Configuration(format!("unsupported resource string '{}'", resource))
        };

        let host = parts.get(1).filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let suffix = parts.last().map(|s| s.to_ascii_uppercase()).ok_or_else(invalid)?;

        let port = match (suffix.as_str(), parts.len()) {
            ("INSTR", 3) | ("INSTR", 4) => default_port,
            ("SOCKET", 4) => parse_port(resource, parts[2])?,
            _ => return Err(invalid()),
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

fn parse_port(resource: &str, port: &str) -> FieldFoxResult<u16> {
    port.parse().map_err(|_| {
        FieldFoxError::Configuration(format!("invalid port '{}' in resource '{}'", port, resource))
    })
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
