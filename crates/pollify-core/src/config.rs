//! Client configuration and endpoint resolution.

use serde::{Deserialize, Serialize};
use tracing::warn;

use sol_rpc::Commitment;

/// Public devnet endpoint used when no RPC URL is configured.
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const RPC_URL_ENV: &str = "POLLIFY_RPC_URL";

/// Resolve the RPC endpoint to use.
///
/// A non-empty override wins. Otherwise the public devnet endpoint is used
/// and a warning is logged, since the shared endpoint is rate-limited and
/// unsuitable for anything beyond casual use.
pub fn resolve_endpoint(rpc_url: Option<&str>) -> String {
    match rpc_url {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => {
            warn!(
                default = DEFAULT_RPC_URL,
                "no RPC URL configured, falling back to the public devnet endpoint"
            );
            DEFAULT_RPC_URL.to_string()
        }
    }
}

/// Base configuration for a poll client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC endpoint URL. `None` falls back to the public devnet endpoint.
    pub rpc_url: Option<String>,

    /// Commitment level every read and broadcast is pinned to.
    pub commitment: Commitment,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            rpc_url: None,
            commitment: Commitment::Confirmed,
        }
    }
}

impl ClientConfig {
    /// Build a config from the environment, reading [`RPC_URL_ENV`].
    pub fn from_env() -> Self {
        let rpc_url = std::env::var(RPC_URL_ENV).ok().filter(|v| !v.trim().is_empty());
        ClientConfig {
            rpc_url,
            ..Default::default()
        }
    }

    /// The endpoint this config resolves to.
    pub fn endpoint(&self) -> String {
        resolve_endpoint(self.rpc_url.as_deref())
    }
}
