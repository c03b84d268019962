//! Swap and approve orchestration
//!
//! A swap payload never reaches a builder raw. [`route`] turns it into one
//! of a few concrete shapes and each builder only implements the shapes
//! its chain can express:
//! - UTXO, Cosmos, Ripple, Tron, Ton: a transfer to the inbound vault
//!   carrying the swap memo
//! - THORChain and MayaChain: a `MsgDeposit` with the memo
//! - EVM: a memo transfer for native assets, the router's
//!   `depositWithExpiry` for tokens, or an aggregator's calldata

pub mod thorchain;

use std::borrow::Cow;

use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::payload::{
    AggregatorSwapPayload, BlockchainSpecific, KeysignPayload, SwapPayload, ThorchainSwapPayload,
};
use crate::types::ChainFamily;

/// Aggregators whose quotes carry ready-made EVM calldata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    OneInch,
    Kyber,
    ElDorito,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapRoute<'a> {
    Transfer {
        to_address: String,
        amount: u128,
        memo: String,
    },
    Deposit {
        amount: u128,
        memo: String,
    },
    RouterDeposit {
        router: String,
        vault: String,
        token: String,
        amount: u128,
        memo: String,
        expiry: u64,
    },
    ContractCall {
        aggregator: Aggregator,
        quote: &'a AggregatorSwapPayload,
    },
}

/// Resolve the payload's swap into a route, `None` for a plain transaction
pub fn route<'a>(payload: &'a KeysignPayload, config: &KeysignConfig) -> KeysignResult<Option<SwapRoute<'a>>> {
    let swap = match &payload.swap_payload {
        Some(swap) => swap,
        None => return Ok(None),
    };
    let route = match swap {
        SwapPayload::Thorchain(p) | SwapPayload::Mayachain(p) => thorchain_route(payload, p, config)?,
        SwapPayload::OneInch(q) => aggregator_route(payload, Aggregator::OneInch, q)?,
        SwapPayload::Kyber(q) => aggregator_route(payload, Aggregator::Kyber, q)?,
        SwapPayload::ElDorito(q) => aggregator_route(payload, Aggregator::ElDorito, q)?,
    };
    Ok(Some(route))
}

fn thorchain_route<'a>(
    payload: &KeysignPayload,
    swap: &ThorchainSwapPayload,
    config: &KeysignConfig,
) -> KeysignResult<SwapRoute<'a>> {
    let memo = match payload.memo() {
        Some(memo) => memo.to_string(),
        None => thorchain::build_memo(swap, &config.thorchain)?,
    };
    let amount = swap.from_amount;

    match swap.from_coin.chain.family() {
        ChainFamily::Thorchain => Ok(SwapRoute::Deposit { amount, memo }),
        ChainFamily::Evm if !swap.from_coin.is_native_token => {
            let router = swap
                .router_address
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| KeysignError::runtime("router address is required for token swaps"))?;
            Ok(SwapRoute::RouterDeposit {
                router: router.to_string(),
                vault: swap.vault_address.clone(),
                token: swap.from_coin.contract_address.clone(),
                amount,
                memo,
                expiry: swap.expiration_time,
            })
        }
        _ => Ok(SwapRoute::Transfer {
            to_address: swap.vault_address.clone(),
            amount,
            memo,
        }),
    }
}

fn aggregator_route<'a>(
    payload: &KeysignPayload,
    aggregator: Aggregator,
    quote: &'a AggregatorSwapPayload,
) -> KeysignResult<SwapRoute<'a>> {
    if !quote.from_coin.chain.is_evm() || !payload.coin.chain.is_evm() {
        return Err(KeysignError::runtime(format!(
            "{:?} swaps are only supported from EVM chains, got {}",
            aggregator, quote.from_coin.chain
        )));
    }
    Ok(SwapRoute::ContractCall { aggregator, quote })
}

/// Payload with its swap folded into a plain transfer or deposit, for
/// builders that have no swap-specific encoding
pub fn resolve_transfer<'a>(
    payload: &'a KeysignPayload,
    config: &KeysignConfig,
) -> KeysignResult<Cow<'a, KeysignPayload>> {
    let route = match route(payload, config)? {
        Some(route) => route,
        None => return Ok(Cow::Borrowed(payload)),
    };

    let mut resolved = payload.clone();
    resolved.swap_payload = None;
    match route {
        SwapRoute::Transfer { to_address, amount, memo } => {
            resolved.to_address = to_address;
            resolved.to_amount = amount;
            resolved.memo = Some(memo);
        }
        SwapRoute::Deposit { amount, memo } => {
            match &mut resolved.chain_specific {
                BlockchainSpecific::Thorchain { is_deposit, .. }
                | BlockchainSpecific::Maya { is_deposit, .. } => *is_deposit = true,
                other => {
                    return Err(KeysignError::chain_mismatch(ChainFamily::Thorchain, other.name()))
                }
            }
            resolved.to_amount = amount;
            resolved.memo = Some(memo);
        }
        SwapRoute::RouterDeposit { .. } | SwapRoute::ContractCall { .. } => {
            return Err(KeysignError::runtime(format!(
                "{} cannot execute an EVM swap route",
                payload.coin.chain
            )));
        }
    }
    Ok(Cow::Owned(resolved))
}
