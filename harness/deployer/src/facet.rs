// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Facet cuts: the unit of change a diamond understands.

use ethers::abi::Abi;
use ethers::providers::Middleware;
use ethers::types::{Address, Selector};

use trex_diamond_abis::i_diamond_cut;

use crate::deploy::{ContractDeployer, DeployError};

/// What a cut does with its selectors, as encoded by `IDiamondCut`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FacetCutAction {
    Add = 0,
    Replace = 1,
    Remove = 2,
}

/// A single entry of a `diamondCut` call: route these selectors to this facet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetCut {
    pub facet_address: Address,
    pub action: FacetCutAction,
    pub function_selectors: Vec<Selector>,
}

impl FacetCut {
    /// Route every external function of the ABI to the facet.
    pub fn add(facet_address: Address, abi: &Abi) -> Self {
        Self {
            facet_address,
            action: FacetCutAction::Add,
            function_selectors: function_selectors(abi),
        }
    }

    /// A cut the diamond would reject: the zero address or no selectors.
    pub fn is_well_formed(&self) -> bool {
        self.facet_address != Address::zero() && !self.function_selectors.is_empty()
    }
}

impl From<FacetCut> for i_diamond_cut::FacetCut {
    fn from(cut: FacetCut) -> Self {
        Self {
            facet_address: cut.facet_address,
            action: cut.action as u8,
            function_selectors: cut.function_selectors,
        }
    }
}

/// Collect the selectors of the externally callable functions, excluding
/// the `_init` suffixed initializers which must not be routed.
pub fn function_selectors(abi: &Abi) -> Vec<Selector> {
    abi.functions()
        .filter(|f| !f.name.ends_with("_init"))
        .map(|f| f.short_signature())
        .collect()
}

/// A facet that has been deployed and is ready to be cut into a diamond.
#[derive(Clone, Debug)]
pub struct PreparedFacet {
    pub name: String,
    pub cut: FacetCut,
}

impl<M> ContractDeployer<M>
where
    M: Middleware + 'static,
{
    /// Deploy a facet by artifact name and derive its selectors.
    ///
    /// Facets take no constructor arguments; their state lives in the
    /// diamond's storage and is set up by the init contract.
    pub async fn prepare_facet(&self, name: &str) -> Result<PreparedFacet, DeployError> {
        let contract = self.deploy_contract(name, ()).await?;
        let cut = FacetCut::add(contract.address(), contract.abi());

        tracing::info!(
            facet = name,
            address = ?cut.facet_address,
            selectors = cut.function_selectors.len(),
            "prepared facet"
        );

        Ok(PreparedFacet {
            name: name.to_string(),
            cut,
        })
    }
}
