// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Deploy contracts from the artifact store through an ethers middleware.

use std::sync::Arc;

use ethers::abi::Tokenize;
use ethers::contract::{Contract, ContractFactory};
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Eip1559TransactionRequest, U256};

use trex_harness_artifacts::{ArtifactError, ArtifactStore};

use crate::gas;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("artifact {0} does not have a constructor")]
    MissingConstructor(String),

    #[error("failed to deploy {name}")]
    Deployment {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Explicitly configured fee overrides, already converted to wei.
///
/// When both the legacy `gas_price` and the EIP-1559 pair are set, the
/// EIP-1559 pair wins and the legacy value is ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasOverrides {
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

impl GasOverrides {
    /// Parse gwei-denominated override values, e.g. from the environment.
    pub fn from_gwei(
        gas_price: Option<f64>,
        max_fee: Option<f64>,
        max_priority_fee: Option<f64>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            gas_price: gas_price.map(gas::gwei_to_wei).transpose()?,
            max_fee_per_gas: max_fee.map(gas::gwei_to_wei).transpose()?,
            max_priority_fee_per_gas: max_priority_fee.map(gas::gwei_to_wei).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.gas_price.is_none()
            && self.max_fee_per_gas.is_none()
            && self.max_priority_fee_per_gas.is_none()
    }

    fn has_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// Deploys contracts by artifact name, applying fee overrides and waiting
/// for the configured number of confirmations.
pub struct ContractDeployer<M> {
    artifacts: Arc<ArtifactStore>,
    client: Arc<M>,
    overrides: GasOverrides,
    confirmations: usize,
}

impl<M> ContractDeployer<M>
where
    M: Middleware + 'static,
{
    pub fn new(artifacts: Arc<ArtifactStore>, client: Arc<M>) -> Self {
        Self {
            artifacts,
            client,
            overrides: GasOverrides::default(),
            confirmations: 1,
        }
    }

    pub fn with_overrides(mut self, overrides: GasOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn client(&self) -> &Arc<M> {
        &self.client
    }

    /// Deploy a contract by artifact name.
    ///
    /// Waiting for confirmations is bounded only by chain inclusion; a chain
    /// that never mines the transaction stalls the call, and callers that
    /// need bounded latency have to wrap it themselves.
    pub async fn deploy_contract<T>(
        &self,
        name: &str,
        constructor_args: T,
    ) -> Result<Contract<M>, DeployError>
    where
        T: Tokenize,
    {
        let artifact = self.artifacts.get(name)?;
        let bytecode = artifact.bytecode()?;

        let args = constructor_args.into_tokens();
        if !args.is_empty() && artifact.constructor().is_none() {
            return Err(DeployError::MissingConstructor(name.to_string()));
        }

        let factory =
            ContractFactory::new(artifact.abi.clone(), bytecode.into(), self.client.clone());

        let mut deployer = factory.deploy_tokens(args).map_err(|e| DeployError::Deployment {
            name: name.to_string(),
            source: anyhow::Error::new(e),
        })?;

        deployer.tx = self.apply_fees(deployer.tx).await;

        let (contract, receipt) = deployer
            .confirmations(self.confirmations)
            .send_with_receipt()
            .await
            .map_err(|e| DeployError::Deployment {
                name: name.to_string(),
                source: anyhow::Error::new(e),
            })?;

        tracing::info!(
            contract_name = name,
            address = ?contract.address(),
            tx_hash = ?receipt.transaction_hash,
            confirmations = self.confirmations,
            "deployed contract"
        );

        Ok(contract)
    }

    /// Resolve the fee fields of a deployment transaction.
    ///
    /// Precedence: explicit overrides, then the estimation policy, and if
    /// even the chain ID cannot be determined the fields are left for the
    /// node to fill.
    async fn apply_fees(&self, tx: TypedTransaction) -> TypedTransaction {
        if self.overrides.has_eip1559() {
            if self.overrides.gas_price.is_some() {
                tracing::debug!("both legacy and EIP-1559 overrides set; ignoring gas_price");
            }
            return with_eip1559(
                tx,
                self.overrides.max_fee_per_gas,
                self.overrides.max_priority_fee_per_gas,
            );
        }

        if let Some(gas_price) = self.overrides.gas_price {
            let mut tx = tx;
            tx.set_gas_price(gas_price);
            return tx;
        }

        match self.client.get_chainid().await {
            Ok(chain_id) => {
                let fees =
                    gas::fetch_gas_price_data(self.client.as_ref(), chain_id.as_u64()).await;
                with_eip1559(
                    tx,
                    Some(fees.max_fee_per_gas),
                    Some(fees.max_priority_fee_per_gas),
                )
            }
            Err(e) => {
                tracing::warn!(
                    error = e.to_string(),
                    "failed to query the chain ID; leaving gas fields to the node"
                );
                tx
            }
        }
    }
}

/// Rebuild the transaction as EIP-1559 with the given fee fields.
fn with_eip1559(
    tx: TypedTransaction,
    max_fee: Option<U256>,
    max_priority_fee: Option<U256>,
) -> TypedTransaction {
    let mut inner = match tx {
        TypedTransaction::Eip1559(inner) => inner,
        other => Eip1559TransactionRequest {
            from: other.from().copied(),
            to: other.to().cloned(),
            gas: other.gas().copied(),
            value: other.value().copied(),
            data: other.data().cloned(),
            nonce: other.nonce().copied(),
            ..Default::default()
        },
    };

    inner.max_fee_per_gas = max_fee.or(inner.max_fee_per_gas);
    inner.max_priority_fee_per_gas = max_priority_fee.or(inner.max_priority_fee_per_gas);

    TypedTransaction::Eip1559(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Bytes, TransactionRequest};

    #[test]
    fn gwei_overrides_parse() {
        let overrides = GasOverrides::from_gwei(None, Some(25.0), Some(1.5)).unwrap();
        assert_eq!(overrides.gas_price, None);
        assert_eq!(overrides.max_fee_per_gas, Some(U256::from(25_000_000_000u64)));
        assert_eq!(
            overrides.max_priority_fee_per_gas,
            Some(U256::from(1_500_000_000u64))
        );
        assert!(!overrides.is_empty());
        assert!(GasOverrides::default().is_empty());

        assert!(GasOverrides::from_gwei(None, Some(-1.0), None).is_err());
    }

    #[test]
    fn eip1559_conversion_keeps_payload() {
        let data = Bytes::from(vec![0x60, 0x80]);
        let tx: TypedTransaction = TransactionRequest::new().data(data.clone()).into();

        let tx = with_eip1559(tx, Some(U256::from(7)), Some(U256::from(3)));

        match tx {
            TypedTransaction::Eip1559(inner) => {
                assert_eq!(inner.data, Some(data));
                assert_eq!(inner.max_fee_per_gas, Some(U256::from(7)));
                assert_eq!(inner.max_priority_fee_per_gas, Some(U256::from(3)));
            }
            other => panic!("expected an EIP-1559 transaction, got {other:?}"),
        }
    }

    #[test]
    fn eip1559_conversion_is_partial() {
        let tx: TypedTransaction = TransactionRequest::new().into();
        let tx = with_eip1559(tx, Some(U256::from(7)), None);

        match tx {
            TypedTransaction::Eip1559(inner) => {
                assert_eq!(inner.max_fee_per_gas, Some(U256::from(7)));
                assert_eq!(inner.max_priority_fee_per_gas, None);
            }
            other => panic!("expected an EIP-1559 transaction, got {other:?}"),
        }
    }
}
