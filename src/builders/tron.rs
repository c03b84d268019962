//! Tron transaction builder
//!
//! TRX transfers, TRC20 transfers through `TriggerSmartContract`, and the
//! Stake 2.0 contracts selected by `FREEZE:` / `UNFREEZE:` memos. A memo
//! naming a receiver delegates (or reclaims) the resource instead.

use secp256k1::PublicKey;

use super::input::{decode_tron, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{parse_tron_address, tron_address_from_pubkey};
use crate::config::KeysignConfig;
use crate::encoding::abi::{self, AbiToken};
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::operation::Operation;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_tron_transaction;
use crate::signing::preimage::tron::{TronBlockHeader, TronContract};
use crate::signing::preimage::{get_tron_txid, UnsignedTronTransaction};
use crate::signing::{verify_ecdsa, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::ChainFamily;
use crate::utils::decode_hex;

fn to_i64(value: u128, what: &str) -> KeysignResult<i64> {
    i64::try_from(value).map_err(|_| KeysignError::runtime(format!("{} {} exceeds int64", what, value)))
}

fn hex_field(value: &str, field: &str) -> KeysignResult<Vec<u8>> {
    decode_hex(value).map_err(|e| KeysignError::runtime(format!("{} is not hex: {}", field, e)))
}

pub struct TronBuilder {
    config: KeysignConfig,
}

impl TronBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Contract, memo and fee limit for the payload
    fn contract(
        &self,
        payload: &KeysignPayload,
        owner: Vec<u8>,
        gas_fee_estimation: u64,
    ) -> KeysignResult<(TronContract, Option<String>, i64)> {
        let operation = payload.operation()?;
        let staked = |amount: Option<u128>| to_i64(amount.unwrap_or(payload.to_amount), "amount");

        let contract = match operation {
            Operation::TronFreeze { resource, amount, receiver: Some(receiver) } => {
                TronContract::DelegateResource {
                    owner,
                    receiver: parse_tron_address(&receiver)?.to_vec(),
                    amount: staked(amount)?,
                    resource: resource as i32,
                }
            }
            Operation::TronFreeze { resource, amount, receiver: None } => {
                TronContract::FreezeBalanceV2 { owner, amount: staked(amount)?, resource: resource as i32 }
            }
            Operation::TronUnfreeze { resource, amount, receiver: Some(receiver) } => {
                TronContract::UnDelegateResource {
                    owner,
                    receiver: parse_tron_address(&receiver)?.to_vec(),
                    amount: staked(amount)?,
                    resource: resource as i32,
                }
            }
            Operation::TronUnfreeze { resource, amount, receiver: None } => {
                TronContract::UnfreezeBalanceV2 { owner, amount: staked(amount)?, resource: resource as i32 }
            }
            operation => {
                let memo = match operation {
                    Operation::Plain(text) => Some(text),
                    _ => None,
                };
                let to = parse_tron_address(&payload.to_address)?;
                if payload.coin.is_native_token {
                    let contract = TronContract::Transfer {
                        owner,
                        to: to.to_vec(),
                        amount: to_i64(payload.to_amount, "amount")?,
                    };
                    return Ok((contract, memo, 0));
                }

                let token = parse_tron_address(&payload.coin.contract_address)?;
                let mut recipient = [0u8; 20];
                recipient.copy_from_slice(&to[1..]);
                let data = abi::encode_call(
                    abi::ERC20_TRANSFER,
                    &[AbiToken::Address(recipient), AbiToken::Uint(payload.to_amount)],
                );
                let fee_limit = if gas_fee_estimation > 0 {
                    gas_fee_estimation
                } else {
                    self.config.tron.trc20_fee_limit
                };
                let contract = TronContract::TriggerSmartContract { owner, contract: token.to_vec(), data };
                return Ok((contract, memo, to_i64(fee_limit as u128, "fee limit")?));
            }
        };
        Ok((contract, None, 0))
    }
}

impl ChainTransactionBuilder for TronBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Tron)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let (timestamp, expiration, block_header, gas_fee_estimation) = match &payload.chain_specific {
            BlockchainSpecific::Tron {
                timestamp,
                expiration,
                block_header_timestamp,
                block_header_number,
                block_header_version,
                block_header_tx_trie_root,
                block_header_parent_hash,
                block_header_witness_address,
                gas_fee_estimation,
            } => {
                let header = TronBlockHeader {
                    timestamp: to_i64(*block_header_timestamp as u128, "block timestamp")?,
                    tx_trie_root: hex_field(block_header_tx_trie_root, "tx trie root")?,
                    parent_hash: hex_field(block_header_parent_hash, "parent hash")?,
                    number: to_i64(*block_header_number as u128, "block number")?,
                    witness_address: hex_field(block_header_witness_address, "witness address")?,
                    version: i32::try_from(*block_header_version)
                        .map_err(|_| KeysignError::runtime("block version exceeds int32"))?,
                };
                (*timestamp, *expiration, header, *gas_fee_estimation)
            }
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Tron, other.name())),
        };

        let key = PublicKey::from_slice(&payload.hex_public_key()?)
            .map_err(|e| KeysignError::invalid_public_key(format!("Tron public key: {}", e)))?;
        let expected = tron_address_from_pubkey(&key);
        if expected != payload.coin.address.trim() {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the address of public key {} ({})",
                payload.coin.address, payload.coin.hex_public_key, expected
            )));
        }

        let owner = parse_tron_address(&payload.coin.address)?.to_vec();
        let (contract, memo, fee_limit) = self.contract(&payload, owner, gas_fee_estimation)?;
        let expiration = if expiration > 0 {
            expiration
        } else {
            timestamp + self.config.tron.expiration_offset_ms
        };
        log_debug!("tron", payload.coin.chain, "building contract",
            contract = contract.type_name(), fee_limit = fee_limit, block = block_header.number);

        SigningInput::Tron(UnsignedTronTransaction {
            block_header,
            expiration: to_i64(expiration as u128, "expiration")?,
            timestamp: to_i64(timestamp as u128, "timestamp")?,
            fee_limit,
            memo,
            contract,
            public_key: key.serialize_uncompressed().to_vec(),
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_tron(unsigned)?;
        Ok(hex_all([get_tron_txid(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_tron(unsigned)?;
        key.ensure_matches(&tx.public_key)?;

        let txid = get_tron_txid(&tx);
        let response = SignatureProvider::new(signatures).get(&txid)?;
        verify_ecdsa(key.secp256k1()?, &txid, response)?;
        let rsv = response.signature_with_recovery_id()?;

        let compiled = compile_tron_transaction(&tx, &rsv);
        let raw = serde_json::to_string(&compiled)?;
        Ok(SignedTransactionResult::new(raw, compiled.tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::TestVault;
    use crate::types::Chain;

    const RECIPIENT: &str = "TLa2f6VPqDgRE67v1736s7bJ8Ray5wYjU7";
    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    fn payload(vault: &TestVault, memo: Option<&str>) -> KeysignPayload {
        KeysignPayload {
            coin: vault.coin(Chain::Tron),
            to_address: RECIPIENT.to_string(),
            to_amount: 3_000_000,
            chain_specific: BlockchainSpecific::Tron {
                timestamp: 1_760_000_000_000,
                expiration: 0,
                block_header_timestamp: 1_759_999_998_000,
                block_header_number: 76_543_210,
                block_header_version: 32,
                block_header_tx_trie_root: "aa".repeat(32),
                block_header_parent_hash: "0000000004900bea".to_string() + &"bb".repeat(24),
                block_header_witness_address: "41".to_string() + &"cc".repeat(20),
                gas_fee_estimation: 0,
            },
            utxos: vec![],
            memo: memo.map(str::to_string),
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn builder() -> TronBuilder {
        TronBuilder::new(&KeysignConfig::default())
    }

    fn unsigned(p: &KeysignPayload) -> UnsignedTronTransaction {
        decode_tron(&builder().build_unsigned(p).unwrap()).unwrap()
    }

    #[test]
    fn test_transfer_signs_end_to_end() {
        let vault = TestVault::new();
        let p = payload(&vault, None);
        let b = builder();

        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let signed = b.get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Tron, &hashes)).unwrap();

        assert_eq!(signed.transaction_hash, hashes[0]);
        let json: serde_json::Value = serde_json::from_str(&signed.raw_transaction).unwrap();
        assert_eq!(json["txID"], hashes[0]);
        let signature = json["signature"][0].as_str().unwrap();
        assert_eq!(signature.len(), 130);
        assert!(signature.ends_with("00") || signature.ends_with("01"));
    }

    #[test]
    fn test_expiration_defaults_to_offset() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, Some("hi")));
        assert_eq!(tx.expiration, 1_760_000_000_000 + 36_000_000);
        assert_eq!(tx.memo.as_deref(), Some("hi"));
        assert_eq!(tx.fee_limit, 0);
        assert_eq!(&tx.block_header.ref_block_bytes()[..], &76_543_210u64.to_be_bytes()[6..8]);
    }

    #[test]
    fn test_trc20_transfer() {
        let vault = TestVault::new();
        let mut p = payload(&vault, None);
        p.coin.is_native_token = false;
        p.coin.contract_address = USDT.into();
        let tx = unsigned(&p);
        assert_eq!(tx.fee_limit, 100_000_000);
        match &tx.contract {
            TronContract::TriggerSmartContract { contract, data, .. } => {
                assert_eq!(contract.as_slice(), &parse_tron_address(USDT).unwrap()[..]);
                assert_eq!(&data[..4], &abi::ERC20_TRANSFER);
                assert_eq!(&data[16..36], &parse_tron_address(RECIPIENT).unwrap()[1..]);
                assert_eq!(data.len(), 68);
            }
            other => panic!("unexpected contract {:?}", other),
        }
    }

    #[test]
    fn test_freeze_and_delegate() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, Some("FREEZE:ENERGY:1000000")));
        assert!(matches!(
            tx.contract,
            TronContract::FreezeBalanceV2 { amount: 1_000_000, resource: 1, .. }
        ));
        assert_eq!(tx.memo, None);

        let memo = format!("FREEZE:BANDWIDTH::{}", RECIPIENT);
        let tx = unsigned(&payload(&vault, Some(&memo)));
        match tx.contract {
            TronContract::DelegateResource { receiver, amount, resource, .. } => {
                assert_eq!(receiver, parse_tron_address(RECIPIENT).unwrap().to_vec());
                assert_eq!(amount, 3_000_000);
                assert_eq!(resource, 0);
            }
            other => panic!("unexpected contract {:?}", other),
        }
    }

    #[test]
    fn test_unfreeze_and_undelegate() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, Some("UNFREEZE:BANDWIDTH:5")));
        assert!(matches!(tx.contract, TronContract::UnfreezeBalanceV2 { amount: 5, resource: 0, .. }));

        let memo = format!("UNFREEZE:ENERGY:7:{}", RECIPIENT);
        let tx = unsigned(&payload(&vault, Some(&memo)));
        assert!(matches!(tx.contract, TronContract::UnDelegateResource { amount: 7, resource: 1, .. }));
    }

    #[test]
    fn test_bad_freeze_memo_rejected() {
        let vault = TestVault::new();
        assert!(builder().build_unsigned(&payload(&vault, Some("FREEZE:WATER:1"))).is_err());
    }

    #[test]
    fn test_foreign_owner_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, None);
        p.coin.address = RECIPIENT.into();
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.is_code(ErrorCode::InvalidPublicKey));
    }

    #[test]
    fn test_other_key_signature_fails() {
        let vault = TestVault::new();
        let p = payload(&vault, None);
        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let err = b
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Bitcoin, &hashes))
            .unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }
}
