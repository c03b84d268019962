//! UTXO transaction builder
//!
//! Plans inputs and outputs for Bitcoin-like chains and hands the plan to
//! the sighash and compiler modules. Inputs are selected largest first;
//! outputs are ordered recipient, change, then the optional `OP_RETURN`.

use super::input::{decode_utxo, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::utxo_script_pubkey;
use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{send_max_guard, BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_utxo_transaction;
use crate::signing::preimage::utxo::{UtxoInput, UtxoOutput, UtxoSighash, ZcashParams};
use crate::signing::preimage::{get_utxo_sighashes, UnsignedUtxoTransaction};
use crate::signing::{verify_ecdsa, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::{Chain, ChainFamily, UtxoInfo};
use crate::utils::decode_hex_array;

const OP_RETURN: u8 = 0x6a;
const OP_PUSHDATA1: u8 = 0x4c;
const MAX_OP_RETURN_DATA: usize = 80;
const FINAL_SEQUENCE: u32 = u32::MAX;

/// Transaction size model used to price a plan
#[derive(Debug, Clone, Copy, PartialEq)]
enum FeeModel {
    /// Pre-segwit P2PKH: 10 + 148 per input + 34 per output bytes
    Linear { byte_fee: u64 },
    /// P2WPKH virtual size: 10 + 101.25 per input + 31 per output vbytes
    Segwit { byte_fee: u64 },
    /// ZIP-317 conventional fee: marginal fee per logical action, at least two
    Zip317 { marginal_fee: u64 },
}

impl FeeModel {
    fn fee(&self, inputs: usize, outputs: usize) -> u64 {
        let (inputs, outputs) = (inputs as u64, outputs as u64);
        match *self {
            FeeModel::Linear { byte_fee } => (10 + 148 * inputs + 34 * outputs).saturating_mul(byte_fee),
            FeeModel::Segwit { byte_fee } => {
                // quarter-vbytes keep the 101.25 input weight exact
                let quarter_vbytes = 40 + 405 * inputs + 124 * outputs;
                quarter_vbytes.div_ceil(4).saturating_mul(byte_fee)
            }
            FeeModel::Zip317 { marginal_fee } => marginal_fee.saturating_mul(inputs.max(outputs).max(2)),
        }
    }
}

/// Selected inputs and resulting amounts
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    inputs: Vec<UtxoInfo>,
    amount: u64,
    change: u64,
    fee: u64,
}

pub struct UtxoBuilder {
    config: KeysignConfig,
}

impl UtxoBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    fn fee_model(&self, chain: Chain, byte_fee: u64) -> FeeModel {
        match chain {
            Chain::Bitcoin | Chain::Litecoin => FeeModel::Segwit { byte_fee },
            Chain::Zcash => FeeModel::Zip317 { marginal_fee: self.config.utxo.zcash_marginal_fee },
            _ => FeeModel::Linear { byte_fee },
        }
    }

    /// Largest-first selection. Change below the dust threshold is left to
    /// the fee rather than creating an unspendable output.
    fn plan(
        &self,
        payload: &KeysignPayload,
        model: FeeModel,
        use_max: bool,
        extra_outputs: usize,
    ) -> KeysignResult<Plan> {
        let chain = payload.coin.chain;
        let dust = self.config.utxo.dust_threshold(chain);
        let mut utxos = payload.utxos.clone();
        utxos.sort_by(|a, b| b.amount.cmp(&a.amount));

        if use_max {
            let total = utxos
                .iter()
                .try_fold(0u64, |sum, u| sum.checked_add(u.amount))
                .ok_or_else(|| KeysignError::runtime(format!("utxo total overflows on {}", chain)))?;
            let fee = model.fee(utxos.len(), 1 + extra_outputs);
            let amount = total.checked_sub(fee).filter(|a| *a >= dust).ok_or_else(|| {
                KeysignError::runtime(format!(
                    "balance {} cannot cover fee {} on {}",
                    total, fee, chain
                ))
            })?;
            return Ok(Plan { inputs: utxos, amount, change: 0, fee });
        }

        let amount = u64::try_from(payload.to_amount)
            .map_err(|_| KeysignError::runtime(format!("amount {} out of range", payload.to_amount)))?;
        if amount < dust {
            return Err(KeysignError::runtime(format!(
                "amount {} is below the {} dust threshold {}",
                amount, chain, dust
            )));
        }

        let insufficient = |total: u64| {
            KeysignError::runtime(format!(
                "insufficient funds on {}: have {}, need {} plus fee",
                chain, total, amount
            ))
        };

        let mut total = 0u64;
        for (count, utxo) in utxos.iter().enumerate() {
            total = total.checked_add(utxo.amount).ok_or_else(|| insufficient(total))?;
            let selected = count + 1;

            let fee_without_change = model.fee(selected, 1 + extra_outputs);
            let needed = amount.checked_add(fee_without_change).ok_or_else(|| insufficient(total))?;
            if total < needed {
                continue;
            }
            let fee_with_change = model.fee(selected, 2 + extra_outputs);
            let change = amount
                .checked_add(fee_with_change)
                .and_then(|spent| total.checked_sub(spent))
                .filter(|change| *change >= dust);
            let plan = match change {
                Some(change) => Plan { inputs: utxos[..selected].to_vec(), amount, change, fee: fee_with_change },
                None => Plan { inputs: utxos[..selected].to_vec(), amount, change: 0, fee: total - amount },
            };
            return Ok(plan);
        }

        Err(insufficient(total))
    }
}

impl ChainTransactionBuilder for UtxoBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Utxo
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Utxo)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let chain = payload.coin.chain;
        let (byte_fee, send_max_amount) = match &payload.chain_specific {
            BlockchainSpecific::Utxo { byte_fee, send_max_amount } => (*byte_fee, *send_max_amount),
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Utxo, other.name())),
        };
        if payload.utxos.is_empty() {
            return Err(KeysignError::runtime(format!("no UTXOs to spend on {}", chain)));
        }

        let public_key = payload.hex_public_key()?;
        if public_key.len() != 33 {
            return Err(KeysignError::invalid_public_key(format!(
                "{} needs a compressed public key, got {} bytes",
                chain,
                public_key.len()
            )));
        }
        let to_script = utxo_script_pubkey(chain, &payload.to_address)?;
        let change_script = utxo_script_pubkey(chain, &payload.coin.address)?;
        let memo_script = payload.memo().map(op_return_script).transpose()?;

        let use_max = send_max_guard(send_max_amount, payload.coin.raw_balance, payload.to_amount);
        let model = self.fee_model(chain, byte_fee);
        let plan = self.plan(&payload, model, use_max, memo_script.iter().count())?;
        log_debug!("utxo", chain, "planned transaction",
            inputs = plan.inputs.len(), amount = plan.amount, change = plan.change, fee = plan.fee, max = use_max);

        let inputs = plan
            .inputs
            .iter()
            .map(|utxo| {
                let mut txid = decode_hex_array::<32>(&utxo.hash, "utxo hash")?;
                // display order to wire order
                txid.reverse();
                Ok(UtxoInput {
                    txid: txid.to_vec(),
                    vout: utxo.index,
                    amount: utxo.amount,
                    sequence: FINAL_SEQUENCE,
                })
            })
            .collect::<KeysignResult<Vec<_>>>()?;

        let mut outputs = vec![UtxoOutput { value: plan.amount, script_pubkey: to_script }];
        if plan.change > 0 {
            outputs.push(UtxoOutput { value: plan.change, script_pubkey: change_script });
        }
        if let Some(script) = memo_script {
            outputs.push(UtxoOutput { value: 0, script_pubkey: script });
        }

        let zcash = (chain == Chain::Zcash).then(|| ZcashParams {
            branch_id: self.config.utxo.zcash_branch_id,
            expiry_height: self.config.utxo.zcash_expiry_height,
        });
        let tx = UnsignedUtxoTransaction {
            chain,
            sighash: UtxoSighash::for_chain(chain)?,
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
            public_key,
            zcash,
            fee: plan.fee,
        };
        SigningInput::Utxo(tx).encode()
    }

    /// One sighash per input, sorted; assembly re-derives input order
    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_utxo(unsigned)?;
        let mut hashes = hex_all(get_utxo_sighashes(&tx)?);
        hashes.sort();
        Ok(hashes)
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_utxo(unsigned)?;
        key.ensure_matches(&tx.public_key)?;
        let public_key = key.secp256k1()?;

        let provider = SignatureProvider::new(signatures);
        let verified = get_utxo_sighashes(&tx)?
            .iter()
            .map(|hash| verify_ecdsa(public_key, hash, provider.get(hash)?))
            .collect::<KeysignResult<Vec<_>>>()?;

        let compiled = compile_utxo_transaction(&tx, &verified)?;
        Ok(SignedTransactionResult::new(
            hex::encode(&compiled.raw_tx),
            hex::encode(compiled.txid),
        ))
    }
}

fn op_return_script(memo: &str) -> KeysignResult<Vec<u8>> {
    let data = memo.as_bytes();
    if data.len() > MAX_OP_RETURN_DATA {
        return Err(KeysignError::runtime(format!(
            "memo is {} bytes, OP_RETURN allows {}",
            data.len(),
            MAX_OP_RETURN_DATA
        )));
    }
    let mut script = vec![OP_RETURN];
    if data.len() >= OP_PUSHDATA1 as usize {
        script.push(OP_PUSHDATA1);
    }
    script.push(data.len() as u8);
    script.extend_from_slice(data);
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::payload::SwapPayload;
    use crate::swap::thorchain::tests::swap_payload;
    use crate::testing::TestVault;
    use crate::types::Coin;

    const SEGWIT_DEST: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn utxo(tag: u8, amount: u64) -> UtxoInfo {
        UtxoInfo { hash: hex::encode([tag; 32]), amount, index: tag as u32 }
    }

    fn payload(coin: Coin, to: &str, amount: u128, utxos: Vec<UtxoInfo>) -> KeysignPayload {
        KeysignPayload {
            coin,
            to_address: to.to_string(),
            to_amount: amount,
            chain_specific: BlockchainSpecific::Utxo { byte_fee: 10, send_max_amount: false },
            utxos,
            memo: None,
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn builder() -> UtxoBuilder {
        UtxoBuilder::new(&KeysignConfig::default())
    }

    fn unsigned(p: &KeysignPayload) -> UnsignedUtxoTransaction {
        decode_utxo(&builder().build_unsigned(p).unwrap()).unwrap()
    }

    #[test]
    fn test_fee_models() {
        assert_eq!(FeeModel::Linear { byte_fee: 1 }.fee(1, 2), 226);
        // 10 + 101.25 + 62 = 173.25 -> 174
        assert_eq!(FeeModel::Segwit { byte_fee: 10 }.fee(1, 2), 1_740);
        assert_eq!(FeeModel::Zip317 { marginal_fee: 5_000 }.fee(1, 1), 10_000);
        assert_eq!(FeeModel::Zip317 { marginal_fee: 5_000 }.fee(3, 2), 15_000);
    }

    #[test]
    fn test_bitcoin_single_input_signs() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, 50_000, vec![utxo(1, 100_000)]);
        let tx = unsigned(&p);
        let spent: u64 = tx.outputs.iter().map(|o| o.value).sum::<u64>() + tx.fee;
        assert_eq!(spent, 100_000);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].value, 50_000);

        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        assert_eq!(hashes.len(), 1);
        let signed = b
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Bitcoin, &hashes))
            .unwrap();
        // segwit marker and flag after the version
        assert_eq!(&signed.raw_transaction[8..12], "0001");
        assert_eq!(signed.transaction_hash.len(), 64);
    }

    #[test]
    fn test_largest_inputs_selected_first() {
        let vault = TestVault::new();
        let coin = vault.coin(Chain::Dogecoin);
        let to = coin.address.clone();
        let p = payload(
            coin,
            &to,
            150_000_000,
            vec![utxo(1, 10_000_000), utxo(2, 200_000_000), utxo(3, 50_000_000)],
        );
        let tx = unsigned(&p);
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].amount, 200_000_000);
        // wire order is the reverse of the display hash
        assert_eq!(tx.inputs[0].txid, vec![2u8; 32]);
    }

    #[test]
    fn test_dust_change_goes_to_fee() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, 98_000, vec![utxo(1, 100_000)]);
        let tx = unsigned(&p);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.fee, 2_000);
    }

    #[test]
    fn test_send_max_requires_exact_balance() {
        let vault = TestVault::new();
        let mut coin = vault.coin(Chain::Bitcoin);
        coin.raw_balance = 100_000;
        let mut p = payload(coin, SEGWIT_DEST, 100_000, vec![utxo(1, 100_000)]);
        p.chain_specific = BlockchainSpecific::Utxo { byte_fee: 10, send_max_amount: true };
        let tx = unsigned(&p);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value + tx.fee, 100_000);

        // a rounded-down amount never empties the wallet
        p.to_amount = 99_000;
        assert!(builder().build_unsigned(&p).is_err());
    }

    #[test]
    fn test_memo_is_last_output() {
        let vault = TestVault::new();
        let mut p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, 10_000, vec![utxo(1, 100_000)]);
        p.memo = Some("hello".to_string());
        let tx = unsigned(&p);
        let last = tx.outputs.last().unwrap();
        assert_eq!(last.value, 0);
        assert_eq!(last.script_pubkey, [&[OP_RETURN, 5][..], b"hello"].concat());
    }

    #[test]
    fn test_long_memo_rejected() {
        assert!(op_return_script(&"x".repeat(81)).is_err());
        assert_eq!(op_return_script(&"x".repeat(80)).unwrap()[..3], [OP_RETURN, OP_PUSHDATA1, 80]);
    }

    #[test]
    fn test_swap_pays_vault_with_memo() {
        let vault = TestVault::new();
        let from = vault.coin(Chain::Bitcoin);
        let to = Coin::native(Chain::Ethereum, "0xrecipient", "");
        let mut swap = swap_payload(from.clone(), to);
        swap.vault_address = SEGWIT_DEST.to_string();
        let mut p = payload(from, "", 0, vec![utxo(1, 500_000)]);
        p.swap_payload = Some(SwapPayload::Thorchain(swap));

        let tx = unsigned(&p);
        assert_eq!(tx.outputs[0].value, 100_000);
        let memo = tx.outputs.last().unwrap();
        assert_eq!(&memo.script_pubkey[2..], b"=:ETH.ETH:0xrecipient:0");
    }

    #[test]
    fn test_pre_images_sorted_and_multi_input_signs() {
        let vault = TestVault::new();
        let coin = vault.coin(Chain::BitcoinCash);
        let to = coin.address.clone();
        let p = payload(coin, &to, 150_000, vec![utxo(1, 100_000), utxo(2, 100_000)]);
        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        assert_eq!(hashes.len(), 2);
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);

        let signed = b
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::BitcoinCash, &hashes))
            .unwrap();
        let again = b
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::BitcoinCash, &hashes))
            .unwrap();
        assert_eq!(signed, again);
    }

    #[test]
    fn test_zcash_uses_branch_id() {
        let vault = TestVault::new();
        let coin = vault.coin(Chain::Zcash);
        let to = coin.address.clone();
        let p = payload(coin, &to, 100_000, vec![utxo(1, 200_000)]);
        let tx = unsigned(&p);
        assert_eq!(tx.zcash.unwrap().branch_id, 0x4DEC_4DF0);
        assert_eq!(tx.fee, 10_000);

        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        assert!(b
            .get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Zcash, &hashes))
            .is_ok());
    }

    #[test]
    fn test_insufficient_funds() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, 100_000, vec![utxo(1, 100_000)]);
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.is_code(ErrorCode::RuntimeError));
        assert!(err.message.contains("insufficient"));
    }

    #[test]
    fn test_max_amount_is_insufficient_funds() {
        let vault = TestVault::new();
        let p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, u64::MAX as u128, vec![utxo(1, 100_000)]);
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.is_code(ErrorCode::RuntimeError));
        assert!(err.message.contains("insufficient"));
    }

    #[test]
    fn test_utxo_total_overflow_rejected() {
        let vault = TestVault::new();
        let utxos = vec![utxo(1, u64::MAX - 10), utxo(2, u64::MAX - 10)];
        let p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, u64::MAX as u128 - 5, utxos.clone());
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.message.contains("insufficient"));

        let mut coin = vault.coin(Chain::Bitcoin);
        coin.raw_balance = 1_000_000;
        let mut max = payload(coin, SEGWIT_DEST, 1_000_000, utxos);
        max.chain_specific = BlockchainSpecific::Utxo { byte_fee: 10, send_max_amount: true };
        let err = builder().build_unsigned(&max).unwrap_err();
        assert!(err.message.contains("overflows"), "{}", err);
    }

    #[test]
    fn test_extreme_byte_fee_does_not_overflow() {
        let vault = TestVault::new();
        let mut p = payload(vault.coin(Chain::Bitcoin), SEGWIT_DEST, 100_000, vec![utxo(1, 500_000)]);
        p.chain_specific = BlockchainSpecific::Utxo { byte_fee: u64::MAX, send_max_amount: false };
        assert!(builder().build_unsigned(&p).unwrap_err().message.contains("insufficient"));
    }
}
