// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! End to end exercise of the diamond deployment against a running node.
//!
//! The example assumes that an Ethereum JSON-RPC endpoint is running in the
//! background (e.g. `anvil`) with the account of the given private key
//! funded, and that the combined contract build output has been produced.
//!
//! # Usage
//! ```text
//! cargo run -p trex_harness_deployer --release --example diamond -- \
//!   --private-key $TREX_PRIVATE_KEY --artifacts-file metadata/combined.json
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, Eip1559TransactionRequest, Selector};
use tracing::Level;

use trex_diamond_abis::IERC3643;
use trex_harness_artifacts::ArtifactStore;
use trex_harness_client::connect_wallet;
use trex_harness_deployer::ContractDeployer;

/// Facets cut into the diamond after it is deployed; the cut and token
/// facets are wired in by the constructor already.
const FACETS: [&str; 6] = [
    "DiamondLoupeFacet",
    "OwnershipFacet",
    "AgentManagement",
    "ComplianceOnChainId",
    "TokenManagement",
    "TokenOperation",
];

#[derive(Parser, Debug)]
pub struct Options {
    /// The JSON-RPC endpoint of the node.
    #[arg(long, default_value = "http://127.0.0.1:8545", env = "TREX_RPC_URL")]
    pub url: String,

    /// Hexadecimal private key of a funded account.
    #[arg(long, env = "TREX_PRIVATE_KEY")]
    pub private_key: String,

    /// Path to the combined contract build output.
    #[arg(long, default_value = "metadata/combined.json")]
    pub artifacts_file: PathBuf,

    /// Enable DEBUG logs.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Options {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// See the module docs for how to run.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts: Options = Options::parse();

    tracing_subscriber::fmt()
        .with_max_level(opts.log_level())
        .init();

    let artifacts = Arc::new(ArtifactStore::load(&opts.artifacts_file)?);
    let client = connect_wallet(&opts.url, &opts.private_key).await?;
    let owner = client.address();

    tracing::info!(owner = ?owner, "deploying the diamond");

    let deployer = ContractDeployer::new(artifacts, client.clone());

    let mut prepared = Vec::new();
    for name in FACETS {
        let facet = deployer
            .prepare_facet(name)
            .await
            .with_context(|| format!("failed to prepare {name}"))?;
        prepared.push(facet);
    }

    let cuts = prepared.iter().map(|f| f.cut.clone()).collect();
    let diamond = deployer
        .deploy_diamond(owner, cuts)
        .await?
        .ok_or_else(|| anyhow!("the facet cuts were rejected"))?;

    // Every selector of every prepared facet must be routed back to the
    // facet that carries it.
    let loupe = diamond.loupe();
    for facet in &prepared {
        let routed: BTreeSet<Selector> = loupe
            .facet_function_selectors(facet.cut.facet_address)
            .call()
            .await
            .with_context(|| format!("failed to query selectors of {}", facet.name))?
            .into_iter()
            .collect();
        let expected: BTreeSet<Selector> =
            facet.cut.function_selectors.iter().copied().collect();

        assert_eq!(routed, expected, "selector set of {}", facet.name);
    }

    let addresses = loupe.facet_addresses().call().await?;
    for facet in &prepared {
        assert!(
            addresses.contains(&facet.cut.facet_address),
            "{} is listed by the loupe",
            facet.name
        );
    }

    // A routed call goes through the fallback to the token facet.
    let token = IERC3643::new(diamond.address, client.clone());
    let is_agent = token.is_agent(owner).call().await?;
    tracing::info!(is_agent, "owner agent status");

    // A selector no facet carries must make the fallback revert.
    let tx = TypedTransaction::Eip1559(
        Eip1559TransactionRequest::new()
            .to(diamond.address)
            .data(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])),
    );
    let unrouted = client.call(&tx, None).await;
    assert!(unrouted.is_err(), "unregistered selectors must revert");

    tracing::info!(address = ?diamond.address, "diamond checks finished");

    Ok(())
}
