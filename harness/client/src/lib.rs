// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Construction of Ethereum clients from the environment: a read-only
//! provider, a locally signing wallet, and a pairing flow for external
//! wallets.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};

pub mod session;

pub use session::{PendingSession, SessionError, SessionTransport};

/// Public endpoint used when no RPC URL is configured.
pub const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";

/// A provider with a local signer bound to the chain it talks to.
pub type WalletClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Connection settings, typically read from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub api_url: Option<String>,
    pub private_key: Option<String>,
    pub walletconnect_project_id: Option<String>,
}

impl ClientConfig {
    /// Read the settings from `TREX_*` environment variables, falling back
    /// to [`DEFAULT_RPC_URL`] for the endpoint.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            rpc_url: var("TREX_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            api_url: var("TREX_API_URL"),
            private_key: var("TREX_PRIVATE_KEY"),
            walletconnect_project_id: var("TREX_WALLETCONNECT_PROJECT_ID"),
        }
    }
}

/// Connect to the endpoint and bind a signing key to its chain ID.
pub async fn connect_wallet(rpc_url: &str, private_key: &str) -> anyhow::Result<Arc<WalletClient>> {
    let provider =
        Provider::<Http>::try_from(rpc_url).context("failed to create the JSON-RPC provider")?;

    let chain_id = provider
        .get_chainid()
        .await
        .context("failed to query the chain ID")?;

    let wallet: LocalWallet = private_key
        .trim_start_matches("0x")
        .parse()
        .context("failed to parse the private key")?;
    let wallet = wallet.with_chain_id(chain_id.as_u64());

    tracing::debug!(address = ?wallet.address(), chain_id = chain_id.as_u64(), "wallet connected");

    Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
}

/// Builds the clients the harness hands out, each flavour only when its
/// configuration is present.
pub struct ClientFactory {
    config: ClientConfig,
}

impl ClientFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A read-only provider; always available.
    pub fn public_client(&self) -> anyhow::Result<Provider<Http>> {
        Provider::<Http>::try_from(self.config.rpc_url.as_str())
            .context("failed to create the JSON-RPC provider")
    }

    /// A signing client bound to the network-specific API endpoint, or
    /// `None` when the endpoint or the private key is not configured.
    pub async fn wallet_client(&self) -> anyhow::Result<Option<Arc<WalletClient>>> {
        let Some(ref api_url) = self.config.api_url else {
            tracing::warn!("no network API URL configured; wallet operations are unavailable");
            return Ok(None);
        };
        let Some(ref private_key) = self.config.private_key else {
            tracing::warn!("no private key configured; wallet operations are unavailable");
            return Ok(None);
        };
        let client = connect_wallet(api_url, private_key).await?;
        Ok(Some(client))
    }

    /// Start pairing an external wallet, or `None` when no project ID is
    /// configured.
    pub fn pair_session<T>(&self, transport: T, timeout: Duration) -> Option<PendingSession<T::Client>>
    where
        T: SessionTransport,
    {
        let Some(ref project_id) = self.config.walletconnect_project_id else {
            tracing::warn!("no WalletConnect project ID configured; skipping wallet pairing");
            return None;
        };
        Some(PendingSession::spawn(transport, project_id.clone(), timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "TREX_RPC_URL",
            "TREX_API_URL",
            "TREX_PRIVATE_KEY",
            "TREX_WALLETCONNECT_PROJECT_ID",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn config_defaults_to_the_public_endpoint() {
        clear_env();
        let config = ClientConfig::from_env();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.private_key, None);
        assert_eq!(config.walletconnect_project_id, None);
    }

    #[test]
    #[serial]
    fn config_reads_the_environment() {
        clear_env();
        std::env::set_var("TREX_RPC_URL", "http://127.0.0.1:8545");
        std::env::set_var("TREX_PRIVATE_KEY", "abcd");
        let config = ClientConfig::from_env();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.private_key, Some("abcd".to_string()));
        clear_env();
    }

    #[test]
    #[serial]
    fn empty_variables_count_as_unset() {
        clear_env();
        std::env::set_var("TREX_RPC_URL", "");
        std::env::set_var("TREX_WALLETCONNECT_PROJECT_ID", "");
        let config = ClientConfig::from_env();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.walletconnect_project_id, None);
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn wallet_client_is_a_soft_failure() {
        clear_env();
        let factory = ClientFactory::from_env();
        let client = factory
            .wallet_client()
            .await
            .expect("a missing key is not an error");
        assert!(client.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn wallet_client_needs_the_api_url() {
        // A key without the network endpoint must not fall back to the
        // general RPC URL; the wallet stays unavailable.
        clear_env();
        std::env::set_var("TREX_PRIVATE_KEY", "abcd");
        let factory = ClientFactory::from_env();
        let client = factory
            .wallet_client()
            .await
            .expect("a missing URL is not an error");
        assert!(client.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn pairing_needs_a_project_id() {
        clear_env();
        let factory = ClientFactory::from_env();

        struct Never;

        #[async_trait::async_trait]
        impl SessionTransport for Never {
            type Client = ();

            async fn pair(&self, _project_id: &str) -> anyhow::Result<()> {
                std::future::pending().await
            }
        }

        let session = factory.pair_session(Never, Duration::from_secs(1));
        assert!(session.is_none());
    }
}
