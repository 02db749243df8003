//! Page location and websocket URL derivation
//!
//! The websocket endpoint lives on the same host and port as the page. A secure
//! page (`https`) talks to a secure socket (`wss`), anything else to `ws`.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::connection::{ConnectionError, ConnectionResult};

/// Location of the page hosting the remote control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Parse a page location. Only `http` and `https` pages are accepted.
    pub fn parse(input: &str) -> ConnectionResult<Self> {
        let url = Url::parse(input)
            .map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", input, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConnectionError::UnsupportedScheme(other.to_string())),
        }

        if url.host_str().is_none() {
            return Err(ConnectionError::InvalidUrl(format!("{}: missing host", input)));
        }

        Ok(Self { url })
    }

    /// Whether the page was served over a secure scheme
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Host name of the page (IPv6 addresses keep their brackets)
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port of the page, `None` when the scheme default is used
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// Websocket URL for this page
    ///
    /// Only `host:port` survive: the path is reset to `/` and any query or
    /// fragment is dropped, e.g. `https://host:9099/page` → `wss://host:9099/`.
    pub fn websocket_url(&self) -> ConnectionResult<Url> {
        let scheme = if self.is_secure() { "wss" } else { "ws" };
        let authority = match self.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        };

        let target = format!("{}://{}/", scheme, authority);
        Url::parse(&target).map_err(|e| ConnectionError::InvalidUrl(format!("{}: {}", target, e)))
    }
}

impl FromStr for PageLocation {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insecure_page_maps_to_ws() {
        let location = PageLocation::parse("http://host:8080/").unwrap();
        let url = location.websocket_url().unwrap();
        assert_eq!(url.as_str(), "ws://host:8080/");
    }

    #[test]
    fn test_secure_page_maps_to_wss() {
        let location = PageLocation::parse("https://host:9099/page").unwrap();
        assert!(location.is_secure());

        let url = location.websocket_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("host"));
        assert_eq!(url.port(), Some(9099));
    }

    #[test]
    fn test_path_query_and_fragment_dropped() {
        let location = PageLocation::parse("http://10.0.0.5:9092/remote/index.html?x=1#top").unwrap();
        let url = location.websocket_url().unwrap();
        assert_eq!(url.as_str(), "ws://10.0.0.5:9092/");
    }

    #[test]
    fn test_default_port_stays_implicit() {
        let location = PageLocation::parse("https://example.com/").unwrap();
        assert_eq!(location.port(), None);
        assert_eq!(location.websocket_url().unwrap().as_str(), "wss://example.com/");
    }

    #[test]
    fn test_ipv6_host() {
        let location = PageLocation::parse("http://[::1]:9092/").unwrap();
        assert_eq!(location.websocket_url().unwrap().as_str(), "ws://[::1]:9092/");
    }

    #[test]
    fn test_unsupported_scheme() {
        let result = PageLocation::parse("file:///tmp/index.html");
        assert!(matches!(result, Err(ConnectionError::UnsupportedScheme(s)) if s == "file"));
    }

    #[test]
    fn test_invalid_url() {
        let result: Result<PageLocation, _> = "not a url".parse();
        assert!(matches!(result, Err(ConnectionError::InvalidUrl(_))));
    }
}
