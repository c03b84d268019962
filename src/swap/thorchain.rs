//! THORChain / MayaChain swap memos
//!
//! `=:<ASSET>:<destination>:<limit>[/<interval>/<quantity>][:<affiliate>:<bps>]`

use crate::config::ThorchainConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::payload::ThorchainSwapPayload;
use crate::types::Coin;

/// Pool asset notation: `CHAIN.TICKER` or `CHAIN.TICKER-CONTRACT`
pub fn asset_string(coin: &Coin) -> KeysignResult<String> {
    let chain = coin.chain.swap_asset_prefix().ok_or_else(|| {
        KeysignError::runtime(format!("{} is not a THORChain pool chain", coin.chain))
    })?;
    let ticker = coin.ticker.to_uppercase();
    if coin.is_native_token || coin.contract_address.is_empty() {
        Ok(format!("{}.{}", chain, ticker))
    } else {
        Ok(format!("{}.{}-{}", chain, ticker, coin.contract_address.to_uppercase()))
    }
}

/// Swap memo for a quote; affiliate fields are appended only when the
/// quote was requested with an affiliate
pub fn build_memo(swap: &ThorchainSwapPayload, config: &ThorchainConfig) -> KeysignResult<String> {
    let destination = swap.to_coin.address.trim();
    if destination.is_empty() {
        return Err(KeysignError::runtime("swap destination address is empty"));
    }
    let limit = match swap.to_amount_limit.trim() {
        "" => "0",
        limit => limit,
    };

    let mut memo = format!("=:{}:{}:{}", asset_string(&swap.to_coin)?, destination, limit);
    if swap.streaming_interval > 0 {
        memo.push_str(&format!("/{}/{}", swap.streaming_interval, swap.streaming_quantity));
    }
    if swap.is_affiliate && !config.affiliate_address.is_empty() {
        memo.push_str(&format!(":{}:{}", config.affiliate_address, config.affiliate_fee_bps));
    }
    Ok(memo)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Chain;

    pub(crate) fn swap_payload(from: Coin, to: Coin) -> ThorchainSwapPayload {
        ThorchainSwapPayload {
            from_address: from.address.clone(),
            from_coin: from,
            to_coin: to,
            vault_address: "bc1qvault".to_string(),
            router_address: None,
            from_amount: 100_000,
            to_amount_limit: String::new(),
            streaming_interval: 0,
            streaming_quantity: 0,
            expiration_time: 1_700_000_000,
            is_affiliate: false,
        }
    }

    #[test]
    fn test_asset_string() {
        let btc = Coin::native(Chain::Bitcoin, "bc1q", "");
        assert_eq!(asset_string(&btc).unwrap(), "BTC.BTC");

        let mut usdc = Coin::native(Chain::Ethereum, "0x1", "");
        usdc.ticker = "usdc".into();
        usdc.is_native_token = false;
        usdc.contract_address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into();
        assert_eq!(
            asset_string(&usdc).unwrap(),
            "ETH.USDC-0XA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48"
        );

        assert!(asset_string(&Coin::native(Chain::Polkadot, "1", "")).is_err());
    }

    #[test]
    fn test_memo_with_streaming_and_affiliate() {
        let mut swap = swap_payload(
            Coin::native(Chain::Bitcoin, "bc1qsender", ""),
            Coin::native(Chain::Ethereum, "0xrecipient", ""),
        );
        swap.to_amount_limit = "1000".into();
        swap.streaming_interval = 1;
        swap.streaming_quantity = 0;
        swap.is_affiliate = true;
        let memo = build_memo(&swap, &ThorchainConfig::default()).unwrap();
        assert_eq!(memo, "=:ETH.ETH:0xrecipient:1000/1/0:vi:50");
    }

    #[test]
    fn test_plain_memo_defaults_limit() {
        let swap = swap_payload(
            Coin::native(Chain::Bitcoin, "bc1qsender", ""),
            Coin::native(Chain::Thorchain, "thor1dest", ""),
        );
        assert_eq!(build_memo(&swap, &ThorchainConfig::default()).unwrap(), "=:THOR.RUNE:thor1dest:0");
    }
}
