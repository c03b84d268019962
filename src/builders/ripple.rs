//! XRP Ledger transaction builder
//!
//! Payments only. A memo made of digits becomes the `DestinationTag`,
//! anything else travels as `MemoData`.

use super::input::{decode_ripple, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{parse_ripple_address, ripple_address_from_pubkey};
use crate::config::KeysignConfig;
use crate::encoding::xrpl::MAX_DROPS;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_ripple_transaction;
use crate::signing::preimage::{get_ripple_signing_hash, UnsignedRippleTransaction};
use crate::signing::{verify_ecdsa, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::ChainFamily;

pub struct RippleBuilder {
    config: KeysignConfig,
}

impl RippleBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl ChainTransactionBuilder for RippleBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Ripple
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Ripple)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let (sequence, gas, last_ledger_sequence) = match &payload.chain_specific {
            BlockchainSpecific::Ripple { sequence, gas, last_ledger_sequence } => {
                (*sequence, *gas, *last_ledger_sequence)
            }
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Ripple, other.name())),
        };

        let public_key = payload.hex_public_key()?;
        if public_key.len() != 33 {
            return Err(KeysignError::invalid_public_key("XRP public key must be 33 bytes, compressed"));
        }
        let expected = ripple_address_from_pubkey(&public_key);
        if expected != payload.coin.address.trim() {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the address of public key {} ({})",
                payload.coin.address, payload.coin.hex_public_key, expected
            )));
        }

        let amount_drops = u64::try_from(payload.to_amount)
            .ok()
            .filter(|drops| *drops <= MAX_DROPS)
            .ok_or_else(|| KeysignError::runtime(format!("{} drops is not a valid XRP amount", payload.to_amount)))?;
        let fee_drops = if gas > 0 { gas } else { self.config.ripple.fee_drops };

        let (destination_tag, memo) = match payload.memo() {
            Some(memo) => match memo.parse::<u32>() {
                Ok(tag) => (Some(tag), None),
                Err(_) => (None, Some(memo.as_bytes().to_vec())),
            },
            None => (None, None),
        };
        log_debug!("ripple", payload.coin.chain, "building payment",
            sequence = sequence, fee = fee_drops, tagged = destination_tag.is_some());

        SigningInput::Ripple(UnsignedRippleTransaction {
            account: parse_ripple_address(&payload.coin.address)?,
            destination: parse_ripple_address(&payload.to_address)?,
            amount_drops,
            fee_drops,
            sequence,
            last_ledger_sequence,
            destination_tag,
            memo,
            public_key,
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_ripple(unsigned)?;
        Ok(hex_all([get_ripple_signing_hash(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_ripple(unsigned)?;
        key.ensure_matches(&tx.public_key)?;

        let hash = get_ripple_signing_hash(&tx);
        let response = SignatureProvider::new(signatures).get(&hash)?;
        let signature = verify_ecdsa(key.secp256k1()?, &hash, response)?;

        let compiled = compile_ripple_transaction(&tx, &signature.serialize_der());
        Ok(SignedTransactionResult::new(hex::encode(&compiled.tx_blob), compiled.hash_hex()))
    }
}
