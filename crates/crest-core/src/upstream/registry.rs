use reqwest::Client;
use std::{sync::Arc, time::Duration};

use crate::{
    config::ConfigurationError,
    upstream::{rpc_client::RpcClient, Upstream},
};

/// Ordered, immutable list of configured upstreams.
///
/// Order is the configuration order; it decides best-set member order and the
/// default primary for health checks.
#[derive(Debug, Clone)]
pub struct UpstreamRegistry {
    upstreams: Arc<[Arc<Upstream>]>,
}

impl UpstreamRegistry {
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyUpstreams`] if `upstreams` is empty.
    pub fn new(upstreams: Vec<Arc<Upstream>>) -> Result<Self, ConfigurationError> {
        if upstreams.is_empty() {
            return Err(ConfigurationError::EmptyUpstreams);
        }
        Ok(Self { upstreams: upstreams.into() })
    }

    /// Builds one upstream per address, each with an RPC client on the shared pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for an empty list or an unusable address.
    pub fn from_endpoints(
        endpoints: &[String],
        client: &Client,
        freshness_window: Duration,
    ) -> Result<Self, ConfigurationError> {
        let upstreams = endpoints
            .iter()
            .map(|address| {
                let rpc = Arc::new(RpcClient::new(client.clone(), address.as_str()));
                Upstream::new(address, rpc, freshness_window).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(upstreams)
    }

    #[must_use]
    pub fn all(&self) -> &[Arc<Upstream>] {
        &self.upstreams
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    /// Always false; [`UpstreamRegistry::new`] rejects an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Upstream>> {
        self.upstreams.iter().find(|u| u.id().as_ref() == id)
    }

    /// The upstream health checks are based on: `configured` if given, else the first one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownPrimary`] if `configured` names no registered upstream.
    pub fn primary(&self, configured: Option<&str>) -> Result<Arc<Upstream>, ConfigurationError> {
        match configured {
            Some(id) => self
                .get(id)
                .cloned()
                .ok_or_else(|| ConfigurationError::UnknownPrimary(id.to_string())),
            None => Ok(Arc::clone(&self.upstreams[0])),
        }
    }
}
