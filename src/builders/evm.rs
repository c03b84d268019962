//! EVM transaction builder
//!
//! Native transfers, ERC-20 transfers and approvals, THORChain router
//! deposits and aggregator calldata all end up as one
//! [`UnsignedEthereumTransaction`]. BSC is signed as a legacy EIP-155
//! transaction; every other chain uses EIP-1559.

use super::input::{decode_ethereum, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::parse_evm_address;
use crate::config::KeysignConfig;
use crate::encoding::abi::{self, AbiToken};
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{ApprovePayload, BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_ethereum_transaction;
use crate::signing::preimage::ethereum::EthereumTxType;
use crate::signing::preimage::{get_ethereum_signing_hash, UnsignedEthereumTransaction};
use crate::signing::{verify_ecdsa, SignatureMap, SignatureProvider};
use crate::swap::{self, Aggregator, SwapRoute};
use crate::types::{Chain, ChainFamily};
use crate::utils::decode_hex;

/// Fee parameters from `BlockchainSpecific::Ethereum`
struct GasParams {
    max_fee_per_gas: u128,
    priority_fee: u128,
    nonce: u64,
    gas_limit: u64,
}

/// Destination, value and calldata of one EVM call, with optional gas
/// overrides from a swap quote
struct EvmCall {
    to: [u8; 20],
    value: u128,
    data: Vec<u8>,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
}

pub struct EvmBuilder {
    config: KeysignConfig,
}

impl EvmBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Signing input for the ERC-20 `approve` that precedes a token swap.
    /// Uses the payload's nonce; the swap itself takes the next one.
    pub fn build_approve(&self, payload: &KeysignPayload, approve: &ApprovePayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Evm)?;
        let coin = &payload.coin;
        if coin.is_native_token || coin.contract_address.trim().is_empty() {
            return Err(KeysignError::runtime(format!(
                "approve needs an ERC-20 coin, got native {}",
                coin.ticker
            )));
        }
        let gas = gas_params(payload)?;
        let spender = parse_evm_address(&approve.spender)?;
        let call = EvmCall {
            to: parse_evm_address(&coin.contract_address)?,
            value: 0,
            data: abi::encode_call(
                abi::ERC20_APPROVE,
                &[AbiToken::Address(spender), AbiToken::Uint(approve.amount)],
            ),
            gas_limit: None,
            gas_price: None,
        };
        log_debug!("evm", coin.chain, "building approve", spender = approve.spender.as_str(), amount = approve.amount);

        let tx = self.transaction(payload, &gas, gas.nonce, call, self.config.evm.erc20_gas_limit)?;
        SigningInput::Ethereum(tx).encode()
    }

    fn chain_id(&self, chain: Chain) -> KeysignResult<Vec<u8>> {
        let id = if chain == Chain::EthereumSepolia {
            self.config.evm.sepolia_chain_id
        } else {
            chain
                .default_chain_id()
                .ok_or_else(|| KeysignError::runtime(format!("{} has no chain id", chain)))?
                .parse::<u64>()
                .map_err(|e| KeysignError::runtime(format!("chain id for {}: {}", chain, e)))?
        };
        Ok(encode_chain_id(id))
    }

    /// Plain transfer of the payload's coin
    fn transfer_call(&self, payload: &KeysignPayload) -> KeysignResult<(EvmCall, u64)> {
        let coin = &payload.coin;
        let to = parse_evm_address(&payload.to_address)?;
        if coin.is_native_token {
            let data = match payload.memo() {
                Some(memo) if memo.starts_with("0x") => decode_hex(memo)?,
                Some(memo) => memo.as_bytes().to_vec(),
                None => Vec::new(),
            };
            let call = EvmCall { to, value: payload.to_amount, data, gas_limit: None, gas_price: None };
            return Ok((call, self.config.evm.transfer_gas_limit));
        }

        let call = EvmCall {
            to: parse_evm_address(&coin.contract_address)?,
            value: 0,
            data: abi::encode_call(
                abi::ERC20_TRANSFER,
                &[AbiToken::Address(to), AbiToken::Uint(payload.to_amount)],
            ),
            gas_limit: None,
            gas_price: None,
        };
        Ok((call, self.config.evm.erc20_gas_limit))
    }

    fn swap_call(&self, payload: &KeysignPayload, route: SwapRoute<'_>) -> KeysignResult<EvmCall> {
        match route {
            SwapRoute::Transfer { to_address, amount, memo } => Ok(EvmCall {
                to: parse_evm_address(&to_address)?,
                value: amount,
                data: memo.into_bytes(),
                gas_limit: None,
                gas_price: None,
            }),
            SwapRoute::RouterDeposit { router, vault, token, amount, memo, expiry } => Ok(EvmCall {
                to: parse_evm_address(&router)?,
                value: 0,
                data: abi::encode_call(
                    abi::DEPOSIT_WITH_EXPIRY,
                    &[
                        AbiToken::Address(parse_evm_address(&vault)?),
                        AbiToken::Address(parse_evm_address(&token)?),
                        AbiToken::Uint(amount),
                        AbiToken::String(memo),
                        AbiToken::Uint(expiry as u128),
                    ],
                ),
                gas_limit: None,
                gas_price: None,
            }),
            SwapRoute::ContractCall { aggregator, quote } => {
                let evm = &self.config.evm;
                let quoted_gas = if quote.tx.gas == 0 { evm.swap_gas_limit } else { quote.tx.gas };
                let gas_limit = match aggregator {
                    Aggregator::Kyber => {
                        (quoted_gas as f64 * evm.kyber_gas_multiplier(payload.coin.chain)).ceil() as u64
                    }
                    Aggregator::OneInch | Aggregator::ElDorito => quoted_gas,
                };
                let gas_price = match quote.tx.gas_price.trim() {
                    "" => evm.default_swap_gas_price_wei,
                    price => parse_decimal(price, "quote gas price")?,
                };
                let value = match quote.tx.value.trim() {
                    "" => 0,
                    value => parse_decimal(value, "quote value")?,
                };
                Ok(EvmCall {
                    to: parse_evm_address(&quote.tx.to)?,
                    value,
                    data: decode_hex(&quote.tx.data)?,
                    gas_limit: Some(gas_limit),
                    gas_price: Some(gas_price),
                })
            }
            SwapRoute::Deposit { .. } => Err(KeysignError::runtime(format!(
                "{} cannot execute a native deposit",
                payload.coin.chain
            ))),
        }
    }

    fn transaction(
        &self,
        payload: &KeysignPayload,
        gas: &GasParams,
        nonce: u64,
        call: EvmCall,
        fallback_gas_limit: u64,
    ) -> KeysignResult<UnsignedEthereumTransaction> {
        let chain = payload.coin.chain;
        let gas_limit = call.gas_limit.unwrap_or(if gas.gas_limit == 0 {
            fallback_gas_limit
        } else {
            gas.gas_limit
        });
        let fee = call.gas_price.unwrap_or(gas.max_fee_per_gas);
        let tx_type = if chain == Chain::Bsc { EthereumTxType::Legacy } else { EthereumTxType::FeeMarket };

        Ok(UnsignedEthereumTransaction {
            tx_type,
            chain_id: self.chain_id(chain)?,
            nonce,
            gas_price: if tx_type == EthereumTxType::Legacy { fee } else { 0 },
            max_priority_fee_per_gas: if tx_type == EthereumTxType::Legacy { 0 } else { gas.priority_fee },
            max_fee_per_gas: if tx_type == EthereumTxType::Legacy { 0 } else { fee },
            gas_limit,
            to: call.to.to_vec(),
            value: call.value,
            data: call.data,
            public_key: payload.hex_public_key()?,
        })
    }
}

impl ChainTransactionBuilder for EvmBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Evm)?;
        let gas = gas_params(payload)?;
        // an approval ahead of the swap consumes the current nonce
        let nonce = if payload.approve_payload.is_some() { gas.nonce + 1 } else { gas.nonce };

        let (call, fallback) = match swap::route(payload, &self.config)? {
            Some(route) => (self.swap_call(payload, route)?, self.config.evm.swap_gas_limit),
            None => self.transfer_call(payload)?,
        };
        log_debug!("evm", payload.coin.chain, "building transaction", nonce = nonce, data_len = call.data.len());

        let tx = self.transaction(payload, &gas, nonce, call, fallback)?;
        SigningInput::Ethereum(tx).encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_ethereum(unsigned)?;
        Ok(hex_all([get_ethereum_signing_hash(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_ethereum(unsigned)?;
        key.ensure_matches(&tx.public_key)?;
        let public_key = key.secp256k1()?;

        let hash = get_ethereum_signing_hash(&tx);
        let response = SignatureProvider::new(signatures).get(&hash)?;
        verify_ecdsa(public_key, &hash, response)?;
        let rsv = response.signature_with_recovery_id()?;

        let compiled = compile_ethereum_transaction(&tx, &rsv);
        Ok(SignedTransactionResult::new(
            hex::encode(&compiled.raw_tx),
            format!("0x{}", hex::encode(compiled.tx_hash)),
        ))
    }
}

fn gas_params(payload: &KeysignPayload) -> KeysignResult<GasParams> {
    match &payload.chain_specific {
        BlockchainSpecific::Ethereum { max_fee_per_gas_wei, priority_fee_wei, nonce, gas_limit } => {
            Ok(GasParams {
                max_fee_per_gas: *max_fee_per_gas_wei,
                priority_fee: *priority_fee_wei,
                nonce: *nonce,
                gas_limit: *gas_limit,
            })
        }
        other => Err(KeysignError::chain_mismatch(ChainFamily::Evm, other.name())),
    }
}

/// Minimal big-endian chain id
fn encode_chain_id(id: u64) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

fn parse_decimal(value: &str, field: &str) -> KeysignResult<u128> {
    value
        .parse::<u128>()
        .map_err(|_| KeysignError::runtime(format!("{} {:?} is not a decimal integer", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::payload::{AggregatorSwapPayload, EvmQuoteTransaction, SwapPayload};
    use crate::swap::thorchain::tests::swap_payload;
    use crate::testing::TestVault;
    use crate::types::Coin;

    const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn payload(coin: Coin) -> KeysignPayload {
        KeysignPayload {
            coin,
            to_address: RECIPIENT.to_string(),
            to_amount: 1_000_000_000_000_000,
            chain_specific: BlockchainSpecific::Ethereum {
                max_fee_per_gas_wei: 30_000_000_000,
                priority_fee_wei: 2_000_000_000,
                nonce: 7,
                gas_limit: 21_000,
            },
            utxos: vec![],
            memo: None,
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn token(vault: &TestVault) -> Coin {
        let mut coin = vault.coin(Chain::Ethereum);
        coin.ticker = "USDC".to_string();
        coin.is_native_token = false;
        coin.contract_address = USDC.to_string();
        coin
    }

    fn builder() -> EvmBuilder {
        EvmBuilder::new(&KeysignConfig::default())
    }

    fn unsigned(p: &KeysignPayload) -> UnsignedEthereumTransaction {
        decode_ethereum(&builder().build_unsigned(p).unwrap()).unwrap()
    }

    #[test]
    fn test_native_transfer_signs_end_to_end() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Ethereum));
        let b = builder();

        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        assert_eq!(hashes.len(), 1);
        let signatures = vault.sign(Chain::Ethereum, &hashes);
        let signed = b.get_signed_transaction(&p, &vault.keys(), &signatures).unwrap();

        assert!(signed.raw_transaction.starts_with("02"));
        assert!(signed.transaction_hash.starts_with("0x"));
        assert_eq!(signed.transaction_hash.len(), 66);
    }

    #[test]
    fn test_bsc_is_legacy() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Bsc));
        let tx = unsigned(&p);
        assert_eq!(tx.tx_type, EthereumTxType::Legacy);
        assert_eq!(tx.gas_price, 30_000_000_000);
        assert_eq!(tx.chain_id, vec![56]);

        let hashes = builder().get_pre_signed_image_hash(&p).unwrap();
        let signed = builder()
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Bsc, &hashes))
            .unwrap();
        // legacy transactions are a bare RLP list
        assert!(signed.raw_transaction.starts_with("f8"));
    }

    #[test]
    fn test_sepolia_chain_id_from_config() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(vault.coin(Chain::EthereumSepolia)));
        assert_eq!(tx.chain_id, vec![0xaa, 0x36, 0xa7]);
    }

    #[test]
    fn test_memo_becomes_calldata() {
        let vault = TestVault::new();
        let mut p = payload(vault.coin(Chain::Ethereum));
        p.memo = Some("0xdeadbeef".to_string());
        assert_eq!(unsigned(&p).data, vec![0xde, 0xad, 0xbe, 0xef]);
        p.memo = Some("hello".to_string());
        assert_eq!(unsigned(&p).data, b"hello".to_vec());
    }

    #[test]
    fn test_erc20_transfer_calls_contract() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(token(&vault)));
        assert_eq!(hex::encode(&tx.to), USDC.trim_start_matches("0x"));
        assert_eq!(tx.value, 0);
        assert_eq!(&tx.data[..4], &abi::ERC20_TRANSFER);
        assert_eq!(hex::encode(&tx.data[16..36]), RECIPIENT[2..].to_lowercase());
    }

    #[test]
    fn test_zero_gas_limit_falls_back_to_config() {
        let vault = TestVault::new();
        let mut p = payload(token(&vault));
        if let BlockchainSpecific::Ethereum { gas_limit, .. } = &mut p.chain_specific {
            *gas_limit = 0;
        }
        assert_eq!(unsigned(&p).gas_limit, 120_000);
    }

    #[test]
    fn test_approve_then_swap_nonces() {
        let vault = TestVault::new();
        let from = token(&vault);
        let to = Coin::native(Chain::Bitcoin, "bc1qrecipient", "");
        let mut swap = swap_payload(from.clone(), to);
        swap.vault_address = "0x1111111111111111111111111111111111111111".to_string();
        swap.router_address = Some("0x2222222222222222222222222222222222222222".to_string());

        let mut p = payload(from);
        p.swap_payload = Some(SwapPayload::Thorchain(swap));
        p.approve_payload = Some(ApprovePayload {
            amount: 100_000,
            spender: "0x2222222222222222222222222222222222222222".to_string(),
        });

        let b = builder();
        let approve = decode_ethereum(&b.build_approve(&p, p.approve_payload.as_ref().unwrap()).unwrap()).unwrap();
        assert_eq!(approve.nonce, 7);
        assert_eq!(&approve.data[..4], &abi::ERC20_APPROVE);

        let deposit = unsigned(&p);
        assert_eq!(deposit.nonce, 8);
        assert_eq!(deposit.to, vec![0x22; 20]);
        assert_eq!(&deposit.data[..4], &abi::DEPOSIT_WITH_EXPIRY);
        assert_eq!(deposit.value, 0);
    }

    #[test]
    fn test_native_thorchain_swap_is_memo_transfer() {
        let vault = TestVault::new();
        let from = vault.coin(Chain::Ethereum);
        let to = Coin::native(Chain::Bitcoin, "bc1qrecipient", "");
        let mut swap = swap_payload(from.clone(), to);
        swap.vault_address = "0x1111111111111111111111111111111111111111".to_string();

        let mut p = payload(from);
        p.swap_payload = Some(SwapPayload::Thorchain(swap));
        let tx = unsigned(&p);
        assert_eq!(tx.to, vec![0x11; 20]);
        assert_eq!(tx.value, 100_000);
        assert_eq!(tx.data, b"=:BTC.BTC:bc1qrecipient:0".to_vec());
    }

    #[test]
    fn test_kyber_gas_is_scaled() {
        let vault = TestVault::new();
        let from = vault.coin(Chain::Ethereum);
        let quote = AggregatorSwapPayload {
            from_coin: from.clone(),
            to_coin: token(&vault),
            from_amount: 5,
            to_amount_decimal: "1".to_string(),
            tx: EvmQuoteTransaction {
                from: from.address.clone(),
                to: "0x3333333333333333333333333333333333333333".to_string(),
                data: "0xabcdef".to_string(),
                value: "5".to_string(),
                gas_price: String::new(),
                gas: 100_000,
            },
        };
        let mut p = payload(from);
        p.swap_payload = Some(SwapPayload::Kyber(quote.clone()));
        let tx = unsigned(&p);
        assert_eq!(tx.gas_limit, 140_000);
        assert_eq!(tx.max_fee_per_gas, 20_000_000_000);
        assert_eq!(tx.value, 5);
        assert_eq!(tx.data, vec![0xab, 0xcd, 0xef]);

        p.swap_payload = Some(SwapPayload::OneInch(quote));
        assert_eq!(unsigned(&p).gas_limit, 100_000);
    }

    #[test]
    fn test_wrong_signer_key_fails_verification() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Ethereum));
        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        // the Tron path derives a different child key
        let signatures = vault.sign(Chain::Tron, &hashes);
        let err = b.get_signed_transaction(&p, &vault.keys(), &signatures).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }

    #[test]
    fn test_missing_signature_is_error() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Ethereum));
        let err = builder()
            .get_signed_transaction(&p, &vault.keys(), &SignatureMap::new())
            .unwrap_err();
        assert!(err.message.contains("no signature"));
    }

    #[test]
    fn test_chain_id_encoding() {
        assert_eq!(encode_chain_id(1), vec![1]);
        assert_eq!(encode_chain_id(43_114), vec![0xa8, 0x6a]);
    }
}
