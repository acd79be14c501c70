// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use anyhow::Context;

use crate::cmd;
use crate::options::deploy::DeployArgs;

use trex_harness_artifacts::ArtifactStore;
use trex_harness_client::connect_wallet;
use trex_harness_deployer::{ContractDeployer, GasOverrides};

cmd! {
  DeployArgs(self, settings) {
    let artifacts = Arc::new(ArtifactStore::load(&settings.artifacts_file)?);

    let client = connect_wallet(&self.url, &self.private_key)
        .await
        .context("failed to connect the wallet")?;

    let owner = self.owner.unwrap_or_else(|| client.address());

    let overrides = GasOverrides::from_gwei(
        self.gas_price_gwei,
        self.max_fee_gwei,
        self.max_priority_fee_gwei,
    )
    .context("invalid fee overrides")?;

    let deployer = ContractDeployer::new(artifacts, client)
        .with_overrides(overrides)
        .with_confirmations(self.confirmations);

    let mut cuts = Vec::new();
    for name in &self.facets {
        let facet = deployer
            .prepare_facet(name)
            .await
            .with_context(|| format!("failed to prepare {name}"))?;
        cuts.push(facet.cut);
    }

    match deployer.deploy_diamond(owner, cuts).await? {
        Some(diamond) => {
            // The address goes to stdout so scripts can capture it.
            println!("{:?}", diamond.address);
        }
        None => {
            tracing::warn!("the facet cuts were rejected; nothing was deployed");
        }
    }

    Ok(())
  }
}
