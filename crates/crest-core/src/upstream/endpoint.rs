use http::{uri::PathAndQuery, Uri};
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

use crate::{
    config::ConfigurationError,
    upstream::{head_tracker::HeadTracker, rpc_client::BlockSource},
};

/// Outbound scheme. Each has its own transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where requests for an upstream are sent: scheme, `host[:port]` and base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    scheme: Scheme,
    authority: String,
    base_path: String,
}

impl Destination {
    /// Parses an upstream address such as `https://node.example.com/rpc`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidAddress`] if the address is not an absolute
    /// URL with a host, and [`ConfigurationError::UnsupportedScheme`] for anything other
    /// than `http` or `https`.
    pub fn parse(address: &str) -> Result<Self, ConfigurationError> {
        let url = Url::parse(address).map_err(|e| ConfigurationError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ConfigurationError::UnsupportedScheme {
                    address: address.to_string(),
                    scheme: other.to_string(),
                })
            }
        };

        let host = url.host_str().ok_or_else(|| ConfigurationError::InvalidAddress {
            address: address.to_string(),
            reason: "missing host".to_string(),
        })?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self { scheme, authority, base_path: url.path().to_string() })
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// `host[:port]`, also used as the outbound `Host` header.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Points an inbound request URI at this destination.
    ///
    /// The path becomes the cleaned join of the base path and the request path; the
    /// query string is kept as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined path or query does not form a valid URI.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri, http::Error> {
        let path = join_paths(&self.base_path, uri.path());
        let path_and_query = match uri.query() {
            Some(query) => PathAndQuery::try_from(format!("{path}?{query}"))?,
            None => PathAndQuery::try_from(path)?,
        };

        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
    }
}

/// Joins two slash-separated paths and resolves `.`/`..` segments, collapsing
/// repeated slashes and dropping any trailing slash. The result is always rooted.
fn join_paths(base: &str, request: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(request.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut joined = String::with_capacity(base.len() + request.len());
    for segment in &segments {
        joined.push('/');
        joined.push_str(segment);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

/// One configured backing node.
///
/// Immutable for the lifetime of the process apart from the head cache inside its
/// [`HeadTracker`].
pub struct Upstream {
    id: Arc<str>,
    destination: Destination,
    head: HeadTracker,
}

impl Upstream {
    /// Creates an upstream from its address, parsing the destination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if `address` is not a usable `http`/`https` URL.
    pub fn new(
        address: &str,
        source: Arc<dyn BlockSource>,
        freshness_window: Duration,
    ) -> Result<Self, ConfigurationError> {
        let destination = Destination::parse(address)?;
        Ok(Self {
            id: Arc::from(address),
            destination,
            head: HeadTracker::new(source, freshness_window),
        })
    }

    /// The address as configured. Used as the metrics and log label.
    #[must_use]
    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    #[must_use]
    pub fn head(&self) -> &HeadTracker {
        &self.head
    }
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstream")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .field("last_known_head", &self.head.last_known().map(|s| s.block_number))
            .finish_non_exhaustive()
    }
}
