//! UTXO transaction compilation
//!
//! Places one DER signature per input: in the scriptSig for P2PKH chains,
//! in the witness for P2WPKH.

use bitcoin::hashes::{sha256d, Hash};
use secp256k1::ecdsa::Signature;

use crate::signing::preimage::utxo::{
    write_compact_size, write_outpoint, write_output, UnsignedUtxoTransaction, UtxoSighash,
    ZCASH_SAPLING_VERSION_GROUP_ID, ZCASH_V4_HEADER,
};
use crate::signing::preimage::{PreImageError, PreImageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUtxoTransaction {
    pub raw_tx: Vec<u8>,
    /// Display-order (reversed) txid
    pub txid: [u8; 32],
}

/// Combine per-input signatures (in input order) with the unsigned transaction
pub fn compile_utxo_transaction(
    tx: &UnsignedUtxoTransaction,
    signatures: &[Signature],
) -> PreImageResult<CompiledUtxoTransaction> {
    if signatures.len() != tx.inputs.len() {
        return Err(PreImageError::InvalidTransaction(format!(
            "{} signatures for {} inputs",
            signatures.len(),
            tx.inputs.len()
        )));
    }

    let hash_type = tx.sighash.hash_type() as u8;
    let pushes: Vec<Vec<u8>> = signatures
        .iter()
        .map(|sig| {
            let mut der = sig.serialize_der().to_vec();
            der.push(hash_type);
            der
        })
        .collect();

    let (raw_tx, txid_preimage) = match tx.sighash {
        UtxoSighash::Bip143 => {
            let stripped = encode_body(tx, |_, out| out.push(0x00));
            let mut raw = Vec::new();
            raw.extend_from_slice(&tx.version.to_le_bytes());
            // segwit marker and flag
            raw.extend_from_slice(&[0x00, 0x01]);
            raw.extend_from_slice(&stripped[4..stripped.len() - 4]);
            for push in &pushes {
                raw.push(0x02);
                write_compact_size(push.len() as u64, &mut raw);
                raw.extend_from_slice(push);
                write_compact_size(tx.public_key.len() as u64, &mut raw);
                raw.extend_from_slice(&tx.public_key);
            }
            raw.extend_from_slice(&tx.lock_time.to_le_bytes());
            (raw, stripped)
        }
        UtxoSighash::ForkId | UtxoSighash::Legacy => {
            let raw = encode_body(tx, |i, out| write_script_sig(&pushes[i], &tx.public_key, out));
            (raw.clone(), raw)
        }
        UtxoSighash::ZcashV4 => {
            let raw = encode_zcash_v4(tx, &pushes)?;
            (raw.clone(), raw)
        }
    };

    let mut txid = sha256d::Hash::hash(&txid_preimage).to_byte_array();
    txid.reverse();
    Ok(CompiledUtxoTransaction { raw_tx, txid })
}

fn write_script_sig(signature: &[u8], public_key: &[u8], out: &mut Vec<u8>) {
    let script_len = 1 + signature.len() + 1 + public_key.len();
    write_compact_size(script_len as u64, out);
    out.push(signature.len() as u8);
    out.extend_from_slice(signature);
    out.push(public_key.len() as u8);
    out.extend_from_slice(public_key);
}

/// version ‖ inputs ‖ outputs ‖ lock_time with a caller-provided scriptSig per input
fn encode_body(tx: &UnsignedUtxoTransaction, mut script_sig: impl FnMut(usize, &mut Vec<u8>)) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tx.version.to_le_bytes());
    write_inputs(tx, &mut script_sig, &mut out);
    write_outputs(tx, &mut out);
    out.extend_from_slice(&tx.lock_time.to_le_bytes());
    out
}

fn write_inputs(
    tx: &UnsignedUtxoTransaction,
    script_sig: &mut impl FnMut(usize, &mut Vec<u8>),
    out: &mut Vec<u8>,
) {
    write_compact_size(tx.inputs.len() as u64, out);
    for (i, input) in tx.inputs.iter().enumerate() {
        write_outpoint(input, out);
        script_sig(i, out);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }
}

fn write_outputs(tx: &UnsignedUtxoTransaction, out: &mut Vec<u8>) {
    write_compact_size(tx.outputs.len() as u64, out);
    for output in &tx.outputs {
        write_output(output, out);
    }
}

fn encode_zcash_v4(tx: &UnsignedUtxoTransaction, pushes: &[Vec<u8>]) -> PreImageResult<Vec<u8>> {
    let params = tx
        .zcash
        .ok_or_else(|| PreImageError::MissingField("zcash branch id".to_string()))?;

    let mut out = Vec::new();
    out.extend_from_slice(&ZCASH_V4_HEADER.to_le_bytes());
    out.extend_from_slice(&ZCASH_SAPLING_VERSION_GROUP_ID.to_le_bytes());
    write_inputs(tx, &mut |i, o| write_script_sig(&pushes[i], &tx.public_key, o), &mut out);
    write_outputs(tx, &mut out);
    out.extend_from_slice(&tx.lock_time.to_le_bytes());
    out.extend_from_slice(&params.expiry_height.to_le_bytes());
    // valueBalance, then empty shielded spends, outputs and joinsplits
    out.extend_from_slice(&0i64.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00, 0x00]);
    Ok(out)
}
