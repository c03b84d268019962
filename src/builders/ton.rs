//! Ton transaction builder
//!
//! A wallet v4r2 external message carrying one internal message: a plain
//! or commented transfer, a jetton transfer sent through the sender's
//! jetton wallet, or a nominator pool deposit/withdraw parsed from the
//! `TON_STAKE` / `TON_UNSTAKE` memos.

use super::input::{decode_ton, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::operation::Operation;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_ton_transaction;
use crate::signing::preimage::ton::{
    TonMessage, TonMessageBody, SEND_MODE_CARRY_ALL_BALANCE, SEND_MODE_IGNORE_ERRORS,
    SEND_MODE_PAY_FEES_SEPARATELY,
};
use crate::signing::preimage::{get_ton_signing_hash, UnsignedTonTransaction};
use crate::signing::{verify_ed25519, SignatureMap, SignatureProvider};
use crate::swap;
use crate::ton::TonAddress;
use crate::types::ChainFamily;

const DEFAULT_MODE: u8 = SEND_MODE_PAY_FEES_SEPARATELY | SEND_MODE_IGNORE_ERRORS;
const SEND_MAX_MODE: u8 = SEND_MODE_CARRY_ALL_BALANCE | SEND_MODE_IGNORE_ERRORS;

struct TonParams<'a> {
    seqno: u32,
    expire_at: u32,
    bounceable: bool,
    send_max_amount: bool,
    jetton_wallet: &'a str,
}

pub struct TonBuilder {
    config: KeysignConfig,
}

impl TonBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    fn native_message(&self, payload: &KeysignPayload, params: &TonParams<'_>) -> KeysignResult<TonMessage> {
        let destination = TonAddress::parse(&payload.to_address)?;
        let message = match payload.operation()? {
            Operation::TonStake => TonMessage {
                destination,
                amount: payload.to_amount,
                mode: DEFAULT_MODE,
                body: TonMessageBody::StakeDeposit {
                    query_id: 0,
                    gas_limit: self.config.ton.staking_gas_limit as u128,
                },
            },
            Operation::TonUnstake { amount } => TonMessage {
                destination,
                amount: self.config.ton.unstake_attached_amount as u128,
                mode: DEFAULT_MODE,
                body: TonMessageBody::StakeWithdraw {
                    query_id: 0,
                    gas_limit: self.config.ton.staking_gas_limit as u128,
                    amount: amount.unwrap_or(0),
                },
            },
            operation => {
                let body = match operation {
                    Operation::Plain(text) => TonMessageBody::Comment(text),
                    _ => TonMessageBody::Empty,
                };
                let mode = if params.send_max_amount { SEND_MAX_MODE } else { DEFAULT_MODE };
                TonMessage {
                    destination: destination.with_bounceable(params.bounceable),
                    amount: payload.to_amount,
                    mode,
                    body,
                }
            }
        };
        Ok(message)
    }

    /// Transfer instruction sent to the sender's own jetton wallet
    fn jetton_message(
        &self,
        payload: &KeysignPayload,
        wallet: &TonAddress,
        params: &TonParams<'_>,
    ) -> KeysignResult<TonMessage> {
        if params.jetton_wallet.trim().is_empty() {
            return Err(KeysignError::runtime(format!(
                "no jetton wallet for {} ({})",
                payload.coin.ticker, payload.coin.contract_address
            )));
        }
        Ok(TonMessage {
            destination: TonAddress::parse(params.jetton_wallet)?.with_bounceable(true),
            amount: self.config.ton.jetton_attached_amount as u128,
            mode: DEFAULT_MODE,
            body: TonMessageBody::JettonTransfer {
                query_id: 0,
                amount: payload.to_amount,
                destination: TonAddress::parse(&payload.to_address)?,
                response_destination: wallet.clone(),
                forward_amount: self.config.ton.jetton_forward_amount as u128,
                comment: payload.memo().map(str::to_string),
            },
        })
    }
}

impl ChainTransactionBuilder for TonBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Ton
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Ton)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let params = match &payload.chain_specific {
            BlockchainSpecific::Ton { sequence_number, expire_at, bounceable, send_max_amount, jetton_address } => {
                TonParams {
                    seqno: *sequence_number,
                    expire_at: *expire_at,
                    bounceable: *bounceable,
                    send_max_amount: *send_max_amount,
                    jetton_wallet: jetton_address,
                }
            }
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Ton, other.name())),
        };

        let public_key = payload.hex_public_key()?;
        if public_key.len() != 32 {
            return Err(KeysignError::invalid_public_key("Ton public key must be 32 bytes"));
        }
        let wallet = TonAddress::parse(&payload.coin.address)?;

        let message = if payload.coin.is_native_token {
            self.native_message(&payload, &params)?
        } else {
            self.jetton_message(&payload, &wallet, &params)?
        };
        log_debug!("ton", payload.coin.chain, "building wallet message",
            seqno = params.seqno, mode = message.mode, native = payload.coin.is_native_token);

        SigningInput::Ton(UnsignedTonTransaction {
            wallet,
            wallet_id: self.config.ton.wallet_id,
            seqno: params.seqno,
            expire_at: params.expire_at,
            messages: vec![message],
            public_key,
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_ton(unsigned)?;
        Ok(hex_all([get_ton_signing_hash(&tx)?]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_ton(unsigned)?;
        key.ensure_matches(&tx.public_key)?;

        let hash = get_ton_signing_hash(&tx)?;
        let response = SignatureProvider::new(signatures).get(&hash)?;
        let signature = verify_ed25519(key.ed25519()?, &hash, response)?;

        let compiled = compile_ton_transaction(&tx, &signature)?;
        Ok(SignedTransactionResult::new(compiled.boc_base64(), compiled.hash_hex()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::TestVault;
    use crate::ton::boc::BOC_MAGIC;
    use crate::types::Chain;
    use base64::Engine;

    fn address(byte: u8) -> String {
        TonAddress::new(0, [byte; 32]).to_user_friendly()
    }

    fn payload(vault: &TestVault, memo: Option<&str>) -> KeysignPayload {
        KeysignPayload {
            coin: vault.coin(Chain::Ton),
            to_address: address(0x22),
            to_amount: 1_500_000_000,
            chain_specific: BlockchainSpecific::Ton {
                sequence_number: 12,
                expire_at: 1_760_000_600,
                bounceable: false,
                send_max_amount: false,
                jetton_address: String::new(),
            },
            utxos: vec![],
            memo: memo.map(str::to_string),
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn builder() -> TonBuilder {
        TonBuilder::new(&KeysignConfig::default())
    }

    fn unsigned(p: &KeysignPayload) -> UnsignedTonTransaction {
        decode_ton(&builder().build_unsigned(p).unwrap()).unwrap()
    }

    #[test]
    fn test_transfer_signs_end_to_end() {
        let vault = TestVault::new();
        let p = payload(&vault, Some("thanks"));
        let b = builder();

        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let signed = b.get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Ton, &hashes)).unwrap();

        let boc = base64::engine::general_purpose::STANDARD.decode(&signed.raw_transaction).unwrap();
        assert_eq!(&boc[..4], &BOC_MAGIC);
        assert_eq!(signed.transaction_hash.len(), 64);
        // deterministic for the same inputs
        let again = b.get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Ton, &hashes)).unwrap();
        assert_eq!(again, signed);
    }

    #[test]
    fn test_comment_and_flags() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, Some("thanks")));
        let message = &tx.messages[0];
        assert_eq!(message.body, TonMessageBody::Comment("thanks".into()));
        assert_eq!(message.mode, DEFAULT_MODE);
        assert!(!message.destination.bounceable);
        assert_eq!(tx.wallet_id, 698_983_191);
        assert_eq!(tx.seqno, 12);
    }

    #[test]
    fn test_send_max_carries_balance() {
        let vault = TestVault::new();
        let mut p = payload(&vault, None);
        if let BlockchainSpecific::Ton { send_max_amount, .. } = &mut p.chain_specific {
            *send_max_amount = true;
        }
        let tx = unsigned(&p);
        assert_eq!(tx.messages[0].mode, 130);
        assert_eq!(tx.messages[0].body, TonMessageBody::Empty);
    }

    #[test]
    fn test_stake_and_unstake_payloads() {
        let vault = TestVault::new();
        let stake = unsigned(&payload(&vault, Some("TON_STAKE")));
        assert_eq!(stake.messages[0].body, TonMessageBody::StakeDeposit { query_id: 0, gas_limit: 100_000 });
        assert_eq!(stake.messages[0].amount, 1_500_000_000);

        let unstake = unsigned(&payload(&vault, Some("TON_UNSTAKE:5000")));
        assert_eq!(unstake.messages[0].amount, 200_000_000);
        assert_eq!(
            unstake.messages[0].body,
            TonMessageBody::StakeWithdraw { query_id: 0, gas_limit: 100_000, amount: 5000 }
        );
    }

    #[test]
    fn test_malformed_unstake_rejected() {
        let vault = TestVault::new();
        assert!(builder().build_unsigned(&payload(&vault, Some("TON_UNSTAKE:lots"))).is_err());
    }

    #[test]
    fn test_jetton_goes_through_sender_wallet() {
        let vault = TestVault::new();
        let mut p = payload(&vault, Some("order 9"));
        p.coin.is_native_token = false;
        p.coin.ticker = "USDT".into();
        p.coin.contract_address = address(0x33);
        if let BlockchainSpecific::Ton { jetton_address, .. } = &mut p.chain_specific {
            *jetton_address = address(0x44);
        }
        let tx = unsigned(&p);
        let message = &tx.messages[0];
        assert_eq!(message.destination.hash, [0x44; 32]);
        assert_eq!(message.amount, 100_000_000);
        match &message.body {
            TonMessageBody::JettonTransfer { amount, destination, response_destination, comment, .. } => {
                assert_eq!(*amount, 1_500_000_000);
                assert_eq!(destination.hash, [0x22; 32]);
                assert_eq!(response_destination, &tx.wallet);
                assert_eq!(comment.as_deref(), Some("order 9"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_jetton_without_wallet_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, None);
        p.coin.is_native_token = false;
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.message.contains("jetton wallet"));
    }

    #[test]
    fn test_forged_signature_fails() {
        let vault = TestVault::new();
        let p = payload(&vault, None);
        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let mut signatures = vault.sign(Chain::Ton, &hashes);
        let response = signatures.get_mut(&hashes[0]).unwrap();
        response.s = hex::encode([0u8; 32]);

        let err = b.get_signed_transaction(&p, &vault.keys(), &signatures).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }
}
