//! Cardano transaction builder
//!
//! Plain ADA transfers from an enterprise address. Inputs are selected
//! largest first, the fee is the linear `a·size + b` over the signed size,
//! and change below the minimum UTXO value is left to the fee.

use super::input::{decode_cardano, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{cardano_enterprise_address, parse_cardano_address};
use crate::config::{CardanoConfig, KeysignConfig};
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{send_max_guard, BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_cardano_transaction;
use crate::signing::preimage::cardano::{CardanoInput, CardanoOutput};
use crate::signing::preimage::{get_cardano_body_hash, UnsignedCardanoTransaction};
use crate::signing::{verify_ed25519, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::{Chain, ChainFamily, UtxoInfo};
use crate::utils::decode_hex_array;

/// Linear fee for `tx`, raised until it covers its own encoding
fn settle_fee(config: &CardanoConfig, tx: &mut UnsignedCardanoTransaction) -> KeysignResult<u64> {
    tx.fee = 0;
    loop {
        let needed = config
            .min_fee_a
            .checked_mul(tx.signed_size() as u64)
            .and_then(|fee| fee.checked_add(config.min_fee_b))
            .ok_or_else(|| KeysignError::runtime("cardano fee overflows"))?;
        if needed <= tx.fee {
            return Ok(tx.fee);
        }
        tx.fee = needed;
    }
}

pub struct CardanoBuilder {
    config: KeysignConfig,
}

impl CardanoBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    fn plan(
        &self,
        utxos: &[UtxoInfo],
        recipient: Vec<u8>,
        change_address: Vec<u8>,
        amount: u64,
        send_max: bool,
        template: UnsignedCardanoTransaction,
    ) -> KeysignResult<UnsignedCardanoTransaction> {
        let config = &self.config.cardano;
        let mut sorted = utxos.to_vec();
        sorted.sort_by(|a, b| b.amount.cmp(&a.amount));
        let inputs = sorted
            .iter()
            .map(|u| {
                Ok(CardanoInput { tx_hash: decode_hex_array::<32>(&u.hash, "utxo hash")?, index: u.index as u64 })
            })
            .collect::<KeysignResult<Vec<_>>>()?;

        if send_max {
            let total = sorted
                .iter()
                .try_fold(0u64, |sum, u| sum.checked_add(u.amount))
                .ok_or_else(|| KeysignError::runtime("utxo total overflows"))?;
            let mut tx = UnsignedCardanoTransaction {
                inputs,
                outputs: vec![CardanoOutput { address: recipient, amount: total }],
                ..template
            };
            let fee = settle_fee(config, &mut tx)?;
            tx.outputs[0].amount = total
                .checked_sub(fee)
                .filter(|a| *a >= config.min_utxo_lovelace)
                .ok_or_else(|| KeysignError::runtime(format!("balance {} cannot cover fee {}", total, fee)))?;
            return Ok(tx);
        }

        if amount < config.min_utxo_lovelace {
            return Err(KeysignError::runtime(format!(
                "amount {} is below the minimum UTXO value {}",
                amount, config.min_utxo_lovelace
            )));
        }
        let insufficient = |total: u64| {
            KeysignError::runtime(format!("insufficient funds: have {}, need {} plus fee", total, amount))
        };
        let mut total = 0u64;
        for (count, utxo) in sorted.iter().enumerate() {
            total = total.checked_add(utxo.amount).ok_or_else(|| insufficient(total))?;
            let mut tx = UnsignedCardanoTransaction {
                inputs: inputs[..=count].to_vec(),
                outputs: vec![
                    CardanoOutput { address: recipient.clone(), amount },
                    CardanoOutput { address: change_address.clone(), amount: total },
                ],
                ..template.clone()
            };
            let fee = settle_fee(config, &mut tx)?;
            let needed = amount.checked_add(fee).ok_or_else(|| insufficient(total))?;
            let Some(change) = total.checked_sub(needed) else {
                continue;
            };
            if change >= config.min_utxo_lovelace {
                tx.outputs[1].amount = change;
            } else {
                log_warn!("cardano", Chain::Cardano, "change below minimum UTXO left to fee", change = change);
                tx.outputs.truncate(1);
                tx.fee = total - amount;
            }
            return Ok(tx);
        }
        Err(insufficient(total))
    }
}

impl ChainTransactionBuilder for CardanoBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Cardano
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Cardano)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let (send_max_amount, ttl) = match &payload.chain_specific {
            BlockchainSpecific::Cardano { send_max_amount, ttl, .. } => (*send_max_amount, *ttl),
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Cardano, other.name())),
        };
        if payload.memo().is_some() {
            return Err(KeysignError::runtime("memos are not supported on Cardano"));
        }
        if payload.utxos.is_empty() {
            return Err(KeysignError::runtime("no UTXOs to spend"));
        }

        let public_key = payload.hex_public_key()?;
        let spend_key: [u8; 32] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| KeysignError::invalid_public_key("Cardano spending key must be 32 bytes"))?;
        let expected = cardano_enterprise_address(&spend_key)?;
        if expected != payload.coin.address.trim() {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the enterprise address of public key {} ({})",
                payload.coin.address, payload.coin.hex_public_key, expected
            )));
        }

        let send_max = send_max_guard(send_max_amount, payload.coin.raw_balance, payload.to_amount);
        let amount = u64::try_from(payload.to_amount)
            .map_err(|_| KeysignError::runtime(format!("amount {} exceeds u64", payload.to_amount)))?;
        let template = UnsignedCardanoTransaction {
            inputs: vec![],
            outputs: vec![],
            fee: 0,
            ttl,
            public_key,
        };
        let tx = self.plan(
            &payload.utxos,
            parse_cardano_address(&payload.to_address)?,
            parse_cardano_address(&payload.coin.address)?,
            amount,
            send_max,
            template,
        )?;
        log_debug!("cardano", payload.coin.chain, "planned transaction",
            inputs = tx.inputs.len(), outputs = tx.outputs.len(), fee = tx.fee, send_max = send_max);

        SigningInput::Cardano(tx).encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_cardano(unsigned)?;
        Ok(hex_all([get_cardano_body_hash(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_cardano(unsigned)?;
        key.ensure_matches(&tx.public_key)?;

        let hash = get_cardano_body_hash(&tx);
        let response = SignatureProvider::new(signatures).get(&hash)?;
        let signature = verify_ed25519(key.ed25519()?, &hash, response)?;

        let compiled = compile_cardano_transaction(&tx, &signature);
        Ok(SignedTransactionResult::new(hex::encode(&compiled.encoded), hex::encode(compiled.tx_id)))
    }
}
