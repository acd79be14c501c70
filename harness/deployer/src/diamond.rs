// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Deploy a diamond and cut the prepared facets into it.

use std::sync::Arc;

use ethers::providers::Middleware;
use ethers::types::{Address, Bytes};

use trex_diamond_abis::{IDiamondCut, IDiamondLoupe};

use crate::deploy::{ContractDeployer, DeployError};
use crate::facet::{FacetCut, PreparedFacet};

/// Artifact names of the contracts every diamond deployment needs.
pub const DIAMOND_CONTRACT: &str = "Diamond";
pub const DIAMOND_CUT_FACET: &str = "DiamondCutFacet";
pub const DIAMOND_INIT: &str = "DiamondInit";
pub const ERC3643_FACET: &str = "ERC3643Facet";

/// Name of the initializer the diamond delegatecalls after each cut.
const INIT_FUNCTION: &str = "init";

/// The cuts that will be applied, separated from the ones that would be
/// rejected by the diamond and are skipped up front.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradePlan {
    pub cuts: Vec<FacetCut>,
    pub skipped: Vec<FacetCut>,
}

/// Validate a batch of cuts before touching the chain.
///
/// Returns `None` when there is nothing worth sending: an empty batch, or
/// a batch whose leading cut points at the zero address, which indicates
/// the facet deployments themselves went wrong.
pub fn plan_upgrade(cuts: Vec<FacetCut>) -> Option<UpgradePlan> {
    if cuts.is_empty() {
        return None;
    }
    if cuts[0].facet_address == Address::zero() {
        return None;
    }

    let (cuts, skipped) = cuts.into_iter().partition(FacetCut::is_well_formed);

    Some(UpgradePlan { cuts, skipped })
}

/// Handle on a deployed diamond proxy.
pub struct DiamondInstance<M> {
    pub address: Address,
    pub owner: Address,
    client: Arc<M>,
}

impl<M> DiamondInstance<M>
where
    M: Middleware + 'static,
{
    /// The `IDiamondCut` interface routed through the proxy.
    pub fn cutter(&self) -> IDiamondCut<M> {
        IDiamondCut::new(self.address, self.client.clone())
    }

    /// The `IDiamondLoupe` interface routed through the proxy.
    pub fn loupe(&self) -> IDiamondLoupe<M> {
        IDiamondLoupe::new(self.address, self.client.clone())
    }
}

impl<M> ContractDeployer<M>
where
    M: Middleware + 'static,
{
    /// Deploy the diamond with its support contracts and apply the cuts.
    ///
    /// Returns `Ok(None)` when the batch is rejected by [`plan_upgrade`];
    /// the condition is logged but treated as a soft no-op so a partial
    /// facet preparation does not abort a scripted run. Individual cuts
    /// that revert on chain are logged and the rest still go through.
    pub async fn deploy_diamond(
        &self,
        owner: Address,
        cuts: Vec<FacetCut>,
    ) -> Result<Option<DiamondInstance<M>>, DeployError> {
        let plan = match plan_upgrade(cuts) {
            Some(plan) => plan,
            None => {
                tracing::error!("no usable facet cuts; skipping the diamond deployment");
                return Ok(None);
            }
        };
        for cut in &plan.skipped {
            tracing::warn!(
                facet = ?cut.facet_address,
                selectors = cut.function_selectors.len(),
                "skipping malformed facet cut"
            );
        }

        let cut_facet = self.deploy_contract(DIAMOND_CUT_FACET, ()).await?;
        let init = self.deploy_contract(DIAMOND_INIT, ()).await?;
        let erc3643 = self.deploy_contract(ERC3643_FACET, ()).await?;

        let diamond = self
            .deploy_contract(
                DIAMOND_CONTRACT,
                (owner, cut_facet.address(), init.address(), erc3643.address()),
            )
            .await?;

        let init_calldata: Bytes = init
            .abi()
            .function(INIT_FUNCTION)
            .and_then(|f| f.encode_input(&[]))
            .map_err(|e| DeployError::Deployment {
                name: DIAMOND_INIT.to_string(),
                source: anyhow::Error::new(e),
            })?
            .into();

        let instance = DiamondInstance {
            address: diamond.address(),
            owner,
            client: self.client().clone(),
        };

        let cutter = instance.cutter();
        for cut in plan.cuts {
            let facet = cut.facet_address;
            match send_cut(&cutter, cut, init.address(), init_calldata.clone()).await {
                Ok(tx_hash) => {
                    tracing::info!(facet = ?facet, tx_hash = ?tx_hash, "facet cut applied");
                }
                Err(e) => {
                    tracing::error!(
                        facet = ?facet,
                        error = e.to_string(),
                        "facet cut failed; continuing with the remaining cuts"
                    );
                }
            }
        }

        tracing::info!(address = ?instance.address, owner = ?owner, "diamond deployed");

        Ok(Some(instance))
    }
}

async fn send_cut<M>(
    cutter: &IDiamondCut<M>,
    cut: FacetCut,
    init: Address,
    calldata: Bytes,
) -> anyhow::Result<Option<ethers::types::TxHash>>
where
    M: Middleware + 'static,
{
    let call = cutter.diamond_cut(vec![cut.into()], init, calldata);
    let pending = call.send().await?;
    let receipt = pending.await?;
    Ok(receipt.map(|r| r.transaction_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::FacetCutAction;
    use quickcheck_macros::quickcheck;

    fn cut(addr_byte: u8, selectors: usize) -> FacetCut {
        FacetCut {
            facet_address: if addr_byte == 0 {
                Address::zero()
            } else {
                Address::repeat_byte(addr_byte)
            },
            action: FacetCutAction::Add,
            function_selectors: vec![[0xab, 0xcd, 0xef, 0x01]; selectors],
        }
    }

    #[test]
    fn empty_batch_has_no_plan() {
        assert_eq!(plan_upgrade(vec![]), None);
    }

    #[test]
    fn zero_leading_address_has_no_plan() {
        assert_eq!(plan_upgrade(vec![cut(0, 1), cut(1, 1)]), None);
    }

    #[test]
    fn malformed_cuts_are_skipped_not_fatal() {
        let plan = plan_upgrade(vec![cut(1, 1), cut(2, 0), cut(0, 1), cut(3, 2)])
            .expect("the leading cut is usable");

        assert_eq!(
            plan.cuts.iter().map(|c| c.facet_address).collect::<Vec<_>>(),
            vec![Address::repeat_byte(1), Address::repeat_byte(3)]
        );
        assert_eq!(plan.skipped.len(), 2);
    }

    #[quickcheck]
    fn plan_partitions_the_batch(addr_bytes: Vec<u8>) -> bool {
        let cuts: Vec<_> = addr_bytes.iter().map(|b| cut(*b, (*b % 3) as usize)).collect();
        let total = cuts.len();

        match plan_upgrade(cuts.clone()) {
            None => total == 0 || cuts[0].facet_address == Address::zero(),
            Some(plan) => {
                plan.cuts.len() + plan.skipped.len() == total
                    && plan.cuts.iter().all(FacetCut::is_well_formed)
                    && plan.skipped.iter().all(|c| !c.is_well_formed())
            }
        }
    }
}
