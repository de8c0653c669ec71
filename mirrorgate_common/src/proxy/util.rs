use std::fmt;

use thiserror::Error;

/// Path prefix every proxied route lives under.
pub const PROXY_PREFIX: &str = "/proxy";

#[derive(Error, Debug, Clone)]
pub struct InvalidOriginError(String);

impl fmt::Display for InvalidOriginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The origin must be a scheme and host with an optional port, got {:?}",
            self.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// The scheme of the origin
    scheme: Scheme,
    /// The host of the origin
    host: String,
    /// The port of the origin
    port: u16,
}

impl Origin {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host without a leading `www.`.
    pub fn bare_host(&self) -> &str {
        self.host.strip_prefix("www.").unwrap_or(&self.host)
    }

    pub fn has_default_port(&self) -> bool {
        self.port == self.scheme.default_port()
    }
}

// Default ports are left out so the result matches what browsers send in `Origin`.
impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };

        if self.has_default_port() {
            write!(f, "{}://{}", scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", scheme, self.host, self.port)
        }
    }
}

pub fn parse_origin(origin: &str) -> Result<Origin, InvalidOriginError> {
    let invalid = || InvalidOriginError(origin.to_string());

    let trimmed = origin.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut parts = trimmed.splitn(2, "://");
    let scheme = match parts.next() {
        Some("http") => Scheme::Http,
        Some("https") => Scheme::Https,
        _ => return Err(invalid()),
    };

    let mut parts = parts.next().ok_or_else(invalid)?.splitn(2, ':');
    let host = parts.next().ok_or_else(invalid)?.to_ascii_lowercase();
    if host.is_empty() || host.contains('/') || host.contains('?') {
        return Err(invalid());
    }

    let port = parts
        .next()
        .map(|port| port.parse().map_err(|_| invalid()))
        .unwrap_or_else(|| Ok(scheme.default_port()))?;

    Ok(Origin { scheme, host, port })
}

/// Strip the proxy prefix from an inbound path. The prefix alone (with or without a trailing
/// slash) maps to the origin root, which is requested as the bare origin.
pub fn upstream_path(path: &str) -> &str {
    let path = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);

    if path == "/" {
        ""
    } else {
        path
    }
}

pub fn target_url(origin: &Origin, path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{}?{}", origin, path, query),
        None => format!("{}{}", origin, path),
    }
}
