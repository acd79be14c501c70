// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Deployment of the permissioned token diamond: contract deployment from
//! the combined build output, fee estimation, facet preparation and the
//! diamond cut orchestration.

pub mod deploy;
pub mod diamond;
pub mod facet;
pub mod gas;

pub use deploy::{ContractDeployer, DeployError, GasOverrides};
pub use diamond::{plan_upgrade, DiamondInstance, UpgradePlan};
pub use facet::{FacetCut, FacetCutAction, PreparedFacet};
pub use gas::GasPriceData;
