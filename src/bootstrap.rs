//! Bootstrap Client (A2): the `GET /ips` / `POST /keepalive` rendezvous
//! protocol.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the `GET /ips` response body.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PeerEndpoint {
    pub address: String,
    pub port: String,
}

/// Failures talking to the rendezvous service. Fatal on startup unless the
/// peer was started with `start_with_bootstrap_server`.
#[derive(Debug)]
pub enum BootstrapError {
    Unreachable(reqwest::Error),
    Serialization(reqwest::Error),
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Unreachable(error) => write!(f, "bootstrap service unreachable: {error}"),
            BootstrapError::Serialization(error) => write!(f, "bootstrap response failed to parse: {error}"),
        }
    }
}

impl std::error::Error for BootstrapError {}

/// Talks the rendezvous HTTP protocol on behalf of one peer. `keepalive`
/// doubles as the initial registration call: registration and keep-alive
/// refresh are the same endpoint, hit on a schedule starting at mount
/// time.
pub struct BootstrapClient {
    http: reqwest::Client,
    base_url: String,
    me: PeerEndpoint,
}

impl BootstrapClient {
    pub fn new(base_url: String, me: PeerEndpoint) -> Self {
        Self { http: reqwest::Client::new(), base_url, me }
    }

    /// `GET /ips`.
    pub async fn fetch_peers(&self) -> Result<Vec<PeerEndpoint>, BootstrapError> {
        let response = self
            .http
            .get(format!("{}/ips", self.base_url))
            .send()
            .await
            .map_err(BootstrapError::Unreachable)?;
        response.json().await.map_err(BootstrapError::Serialization)
    }

    /// `POST /keepalive` with this peer's `{address, port}`. Called once
    /// at mount time to register, then again on a recurring interval.
    pub async fn keepalive(&self) -> Result<(), BootstrapError> {
        self.http
            .post(format!("{}/keepalive", self.base_url))
            .json(&self.me)
            .send()
            .await
            .map_err(BootstrapError::Unreachable)?;
        Ok(())
    }

    /// Deregisters this peer's endpoint. Best-effort: shutdown-path errors
    /// are logged, never propagated.
    pub async fn deregister(&self) {
        let result = self
            .http
            .post(format!("{}/deregister", self.base_url))
            .json(&self.me)
            .send()
            .await;
        if let Err(error) = result {
            warn!(%error, "bootstrap deregister failed");
        }
    }
}
