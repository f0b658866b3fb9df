//! Vault balance resolution over JSON-RPC.
//!
//! `ChainReader` is the seam between the reconciliation core and the chain:
//! the production `VaultReader` talks to an HTTP RPC node through alloy,
//! tests plug in an in-memory map.

use crate::config::ChainConfig;
use crate::onchain::abi::IXvsVault;
use crate::retry::{RetryPolicy, Transient};

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, RootProvider};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("rpc call failed: {0}")]
    Rpc(String),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid rpc url {0:?}")]
    InvalidUrl(String),
    #[error("staked amount {raw} of {address} does not fit a decimal")]
    AmountOverflow { address: String, raw: String },
}

impl Transient for ResolveError {
    fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Rpc(_))
    }
}

/// Read-only view of the chain needed by a reconciliation pass.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64, ResolveError>;

    /// Raw (unscaled) staked principal of `user` in the vault pool.
    async fn staked_raw(&self, user: Address) -> Result<U256, ResolveError>;
}

/// `ChainReader` backed by an alloy HTTP provider and the vault's `getUserInfo`.
pub struct VaultReader {
    provider: RootProvider,
    vault: Address,
    reward_token: Address,
    pool_id: U256,
}

impl VaultReader {
    pub fn connect(config: &ChainConfig, vault_address: &str) -> Result<Self, ResolveError> {
        let url = config
            .rpc_url
            .parse()
            .map_err(|_| ResolveError::InvalidUrl(config.rpc_url.clone()))?;
        let provider = RootProvider::new_http(url);
        Ok(Self {
            provider,
            vault: parse_address(vault_address)?,
            reward_token: parse_address(&config.reward_token)?,
            pool_id: U256::from(config.pool_id),
        })
    }
}

#[async_trait]
impl ChainReader for VaultReader {
    async fn block_number(&self) -> Result<u64, ResolveError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ResolveError::Rpc(e.to_string()))
    }

    async fn staked_raw(&self, user: Address) -> Result<U256, ResolveError> {
        let vault = IXvsVault::new(self.vault, &self.provider);
        let info = vault
            .getUserInfo(self.reward_token, self.pool_id, user)
            .call()
            .await
            .map_err(|e| ResolveError::Rpc(e.to_string()))?;
        Ok(info.amount)
    }
}

/// Turns addresses into current staked amounts, retrying transient RPC failures.
pub struct BalanceResolver<C> {
    chain: C,
    decimals: u32,
    retry: RetryPolicy,
}

impl<C: ChainReader> BalanceResolver<C> {
    pub fn new(chain: C, decimals: u32, retry: RetryPolicy) -> Self {
        Self {
            chain,
            decimals,
            retry,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    pub async fn current_block(&self) -> Result<u64, ResolveError> {
        self.retry
            .run("eth_blockNumber", || self.chain.block_number())
            .await
    }

    /// Current staked amount of `address`, in token units.
    pub async fn resolve(&self, address: &str) -> Result<Decimal, ResolveError> {
        let user = parse_address(address)?;
        let raw = self
            .retry
            .run("getUserInfo", || self.chain.staked_raw(user))
            .await?;
        let amount = scale_amount(raw, self.decimals).ok_or_else(|| {
            ResolveError::AmountOverflow {
                address: address.to_string(),
                raw: raw.to_string(),
            }
        })?;
        debug!(address = %address, amount = %amount, "resolved staked amount");
        Ok(amount)
    }
}

fn parse_address(s: &str) -> Result<Address, ResolveError> {
    Address::from_str(s.trim()).map_err(|_| ResolveError::InvalidAddress(s.to_string()))
}

/// Exact `raw / 10^decimals`. `None` if the value exceeds Decimal's 96-bit mantissa.
pub fn scale_amount(raw: U256, decimals: u32) -> Option<Decimal> {
    let raw: u128 = raw.try_into().ok()?;
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .ok()
        .map(|d| d.normalize())
}
