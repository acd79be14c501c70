// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Tiered gas price estimation.
//!
//! The policy mirrors what the deployment scripts need in practice: a local
//! development chain answers for itself, public networks consult the
//! Blocknative block-prices API first and the provider second, and every
//! tier degrades to hardcoded defaults instead of blocking a deployment.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::U256;
use ethers::utils::parse_units;
use serde::Deserialize;
use url::Url;

/// 25 gwei, the fallback ceiling when no estimate is available.
pub const DEFAULT_MAX_FEE_PER_GAS: u64 = 25_000_000_000;

/// 1.5 gwei.
pub const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: u64 = 1_500_000_000;

/// Chain IDs reserved for local development chains (Hardhat and Ganache).
pub const LOCAL_CHAIN_IDS: [u64; 2] = [31337, 1337];

const BLOCKNATIVE_URL: &str = "https://api.blocknative.com/";

/// EIP-1559 fee pair, denominated in wei. Constructed fresh per transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPriceData {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl Default for GasPriceData {
    fn default() -> Self {
        Self {
            max_fee_per_gas: DEFAULT_MAX_FEE_PER_GAS.into(),
            max_priority_fee_per_gas: DEFAULT_MAX_PRIORITY_FEE_PER_GAS.into(),
        }
    }
}

impl GasPriceData {
    fn is_positive(&self) -> bool {
        !self.max_fee_per_gas.is_zero() && !self.max_priority_fee_per_gas.is_zero()
    }

    /// Replace any zero field with its default, so callers always get
    /// strictly positive fees.
    fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            max_fee_per_gas: if self.max_fee_per_gas.is_zero() {
                defaults.max_fee_per_gas
            } else {
                self.max_fee_per_gas
            },
            max_priority_fee_per_gas: if self.max_priority_fee_per_gas.is_zero() {
                defaults.max_priority_fee_per_gas
            } else {
                self.max_priority_fee_per_gas
            },
        }
    }
}

/// Convert a gwei amount to wei, keeping at most 9 fractional digits.
///
/// Negative amounts are rejected here; a signed parse would otherwise
/// reinterpret them as enormous unsigned fees.
pub fn gwei_to_wei(gwei: f64) -> anyhow::Result<U256> {
    if !gwei.is_finite() || gwei < 0.0 {
        bail!("{gwei} gwei is not a non-negative fee");
    }
    let parsed = parse_units(format!("{gwei:.9}"), "gwei")
        .with_context(|| format!("failed to convert {gwei} gwei to wei"))?;
    Ok(U256::from(parsed))
}

/// One source of fee estimates; each tier of the policy is a separate source
/// so a failure in one can be exercised independently.
#[async_trait]
pub trait FeeSource: Sync {
    async fn fee_data(&self) -> anyhow::Result<GasPriceData>;
}

/// Fee data reported by the chain provider itself.
pub struct ProviderFees<'a, M>(pub &'a M);

#[async_trait]
impl<'a, M: Middleware> FeeSource for ProviderFees<'a, M> {
    async fn fee_data(&self) -> anyhow::Result<GasPriceData> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .0
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| anyhow!("failed to fetch provider fee data: {e}"))?;

        Ok(GasPriceData {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }
}

/// The Blocknative block-prices API.
pub struct Blocknative {
    client: reqwest::Client,
    base_url: Url,
    chain_id: u64,
}

impl Blocknative {
    pub fn new(chain_id: u64) -> Self {
        let base_url = Url::parse(BLOCKNATIVE_URL).expect("default URL parses");
        Self::with_base_url(base_url, chain_id)
    }

    pub fn with_base_url(base_url: Url, chain_id: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            chain_id,
        }
    }
}

#[async_trait]
impl FeeSource for Blocknative {
    async fn fee_data(&self) -> anyhow::Result<GasPriceData> {
        let mut url = self
            .base_url
            .join("gasprices/blockprices")
            .context("failed to construct the block prices URL")?;
        url.query_pairs_mut()
            .append_pair("chainid", &self.chain_id.to_string());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call the block prices API")?;

        if !response.status().is_success() {
            bail!("failed to fetch gas prices: {}", response.status());
        }

        let prices: BlockPricesResponse = response
            .json()
            .await
            .context("failed to parse the block prices response")?;

        let estimate =
            pick_estimate(&prices).ok_or_else(|| anyhow!("no suitable gas estimate found"))?;

        Ok(GasPriceData {
            max_fee_per_gas: gwei_to_wei(estimate.max_fee_per_gas)?,
            max_priority_fee_per_gas: gwei_to_wei(estimate.max_priority_fee_per_gas)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockPricesResponse {
    #[serde(default)]
    block_prices: Vec<BlockPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockPrice {
    #[serde(default)]
    estimated_prices: Vec<EstimatedPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimatedPrice {
    confidence: u32,
    max_priority_fee_per_gas: f64,
    max_fee_per_gas: f64,
}

/// Prefer the 99% confidence tier of the next block, falling back to the
/// first estimate available.
fn pick_estimate(prices: &BlockPricesResponse) -> Option<&EstimatedPrice> {
    let first = prices.block_prices.first()?;
    first
        .estimated_prices
        .iter()
        .find(|e| e.confidence == 99)
        .or_else(|| first.estimated_prices.first())
}

/// Produce a usable fee pair for the given chain; this never fails, at worst
/// it returns the hardcoded defaults.
pub async fn fetch_gas_price_data<M: Middleware>(provider: &M, chain_id: u64) -> GasPriceData {
    let provider = ProviderFees(provider);

    if LOCAL_CHAIN_IDS.contains(&chain_id) {
        local_fee_data(&provider).await
    } else {
        resolve(&Blocknative::new(chain_id), &provider).await
    }
}

/// On a local chain the provider is authoritative; anything else means the
/// defaults are good enough.
async fn local_fee_data(provider: &dyn FeeSource) -> GasPriceData {
    match provider.fee_data().await {
        Ok(data) if data.is_positive() => data,
        Ok(_) => GasPriceData::default(),
        Err(e) => {
            tracing::warn!(error = e.to_string(), "failed to fetch local fee data");
            GasPriceData::default()
        }
    }
}

/// The public network policy: external estimate first, provider refinement
/// if it reports strictly positive fees, defaults for whatever is left.
async fn resolve(external: &dyn FeeSource, provider: &dyn FeeSource) -> GasPriceData {
    let mut data = GasPriceData::default();

    match external.fee_data().await {
        Ok(estimate) => data = estimate,
        Err(e) => {
            tracing::warn!(error = e.to_string(), "failed to fetch Blocknative gas data")
        }
    }

    match provider.fee_data().await {
        Ok(estimate) if estimate.is_positive() => data = estimate,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = e.to_string(), "failed to fetch provider gas data")
        }
    }

    data.sanitized()
}
