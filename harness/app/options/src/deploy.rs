// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use clap::Args;
use ethers_core::types::Address;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// The JSON-RPC endpoint of the node to deploy to.
    #[arg(long, short, default_value = "http://127.0.0.1:8545", env = "TREX_RPC_URL")]
    pub url: String,

    /// Hexadecimal private key of the account funding the deployment.
    #[arg(long, env = "TREX_PRIVATE_KEY")]
    pub private_key: String,

    /// Owner of the diamond. Defaults to the deploying account.
    #[arg(long, env = "TREX_OWNER")]
    pub owner: Option<Address>,

    /// Facets to cut into the diamond, by artifact name.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "DiamondLoupeFacet,OwnershipFacet,AgentManagement,ComplianceOnChainId,TokenManagement,TokenOperation"
    )]
    pub facets: Vec<String>,

    /// Number of confirmations to wait for after each transaction.
    #[arg(long, default_value_t = 1, env = "TREX_CONFIRMATIONS")]
    pub confirmations: usize,

    /// Legacy gas price in gwei; ignored when the EIP-1559 fees are set.
    #[arg(long, env = "TREX_GAS_PRICE_GWEI")]
    pub gas_price_gwei: Option<f64>,

    /// Maximum fee per gas in gwei.
    #[arg(long, env = "TREX_MAX_FEE_GWEI")]
    pub max_fee_gwei: Option<f64>,

    /// Maximum priority fee per gas in gwei.
    #[arg(long, env = "TREX_MAX_PRIORITY_FEE_GWEI")]
    pub max_priority_fee_gwei: Option<f64>,
}
