//! UTXO Pre-Image Hashing
//!
//! One sighash per input, all `SIGHASH_ALL`:
//! - BIP-143 for segwit chains (Bitcoin, Litecoin)
//! - BIP-143 with `SIGHASH_FORKID` for Bitcoin Cash
//! - original legacy algorithm for Dogecoin and Dash
//! - ZIP-243 (Sapling v4) for Zcash

use bitcoin::hashes::{sha256d, Hash};
use blake2_rfc::blake2b::Blake2b;
use serde::{Deserialize, Serialize};

use super::{PreImageError, PreImageResult};
use crate::address::{p2pkh_script, pubkey_hash160};
use crate::types::Chain;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;

pub const ZCASH_V4_HEADER: u32 = 0x8000_0004;
pub const ZCASH_SAPLING_VERSION_GROUP_ID: u32 = 0x892F_2085;

/// Sighash algorithm of a UTXO chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtxoSighash {
    Bip143,
    ForkId,
    Legacy,
    ZcashV4,
}

impl UtxoSighash {
    pub fn for_chain(chain: Chain) -> PreImageResult<Self> {
        match chain {
            Chain::Bitcoin | Chain::Litecoin => Ok(UtxoSighash::Bip143),
            Chain::BitcoinCash => Ok(UtxoSighash::ForkId),
            Chain::Dogecoin | Chain::Dash => Ok(UtxoSighash::Legacy),
            Chain::Zcash => Ok(UtxoSighash::ZcashV4),
            other => Err(PreImageError::UnsupportedType(format!("{} is not a UTXO chain", other))),
        }
    }

    /// Sighash type byte appended to each signature
    pub fn hash_type(&self) -> u32 {
        match self {
            UtxoSighash::ForkId => SIGHASH_ALL | SIGHASH_FORKID,
            _ => SIGHASH_ALL,
        }
    }

    pub fn is_segwit(&self) -> bool {
        matches!(self, UtxoSighash::Bip143)
    }
}

/// Spent output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInput {
    /// Previous txid in wire (little-endian) order
    pub txid: Vec<u8>,
    pub vout: u32,
    /// Value in the smallest unit
    pub amount: u64,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// Zcash transparent v4 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZcashParams {
    pub branch_id: u32,
    pub expiry_height: u32,
}

/// Unsigned UTXO transaction plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedUtxoTransaction {
    pub chain: Chain,
    pub sighash: UtxoSighash,
    pub version: u32,
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
    pub lock_time: u32,
    /// Compressed key every input is locked to
    pub public_key: Vec<u8>,
    pub zcash: Option<ZcashParams>,
    /// Planned fee, for reporting
    pub fee: u64,
}

impl UnsignedUtxoTransaction {
    /// P2PKH script of the signing key; also the BIP-143 scriptCode for P2WPKH
    pub fn script_code(&self) -> Vec<u8> {
        p2pkh_script(&pubkey_hash160(&self.public_key))
    }
}

/// Get sighashes for all inputs, in input order
pub fn get_utxo_sighashes(tx: &UnsignedUtxoTransaction) -> PreImageResult<Vec<[u8; 32]>> {
    if tx.inputs.is_empty() {
        return Err(PreImageError::InvalidTransaction("no inputs".to_string()));
    }
    if tx.inputs.iter().any(|i| i.txid.len() != 32) {
        return Err(PreImageError::InvalidTransaction("txid must be 32 bytes".to_string()));
    }

    (0..tx.inputs.len())
        .map(|index| match tx.sighash {
            UtxoSighash::Bip143 | UtxoSighash::ForkId => Ok(bip143_sighash(tx, index)),
            UtxoSighash::Legacy => Ok(legacy_sighash(tx, index)),
            UtxoSighash::ZcashV4 => zip243_sighash(tx, index),
        })
        .collect()
}

pub(crate) fn write_compact_size(value: u64, out: &mut Vec<u8>) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub(crate) fn write_outpoint(input: &UtxoInput, out: &mut Vec<u8>) {
    out.extend_from_slice(&input.txid);
    out.extend_from_slice(&input.vout.to_le_bytes());
}

pub(crate) fn write_output(output: &UtxoOutput, out: &mut Vec<u8>) {
    out.extend_from_slice(&output.value.to_le_bytes());
    write_compact_size(output.script_pubkey.len() as u64, out);
    out.extend_from_slice(&output.script_pubkey);
}

fn serialized_prevouts(tx: &UnsignedUtxoTransaction) -> Vec<u8> {
    let mut data = Vec::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        write_outpoint(input, &mut data);
    }
    data
}

fn serialized_sequences(tx: &UnsignedUtxoTransaction) -> Vec<u8> {
    tx.inputs.iter().flat_map(|i| i.sequence.to_le_bytes()).collect()
}

fn serialized_outputs(tx: &UnsignedUtxoTransaction) -> Vec<u8> {
    let mut data = Vec::new();
    for output in &tx.outputs {
        write_output(output, &mut data);
    }
    data
}

/// BIP-143 digest; Bitcoin Cash uses the same layout with the fork id bit
fn bip143_sighash(tx: &UnsignedUtxoTransaction, index: usize) -> [u8; 32] {
    let input = &tx.inputs[index];
    let script_code = tx.script_code();

    let mut serialized = Vec::new();
    serialized.extend_from_slice(&tx.version.to_le_bytes());
    serialized.extend_from_slice(&sha256d::Hash::hash(&serialized_prevouts(tx)).to_byte_array());
    serialized.extend_from_slice(&sha256d::Hash::hash(&serialized_sequences(tx)).to_byte_array());
    write_outpoint(input, &mut serialized);
    write_compact_size(script_code.len() as u64, &mut serialized);
    serialized.extend_from_slice(&script_code);
    serialized.extend_from_slice(&input.amount.to_le_bytes());
    serialized.extend_from_slice(&input.sequence.to_le_bytes());
    serialized.extend_from_slice(&sha256d::Hash::hash(&serialized_outputs(tx)).to_byte_array());
    serialized.extend_from_slice(&tx.lock_time.to_le_bytes());
    serialized.extend_from_slice(&tx.sighash.hash_type().to_le_bytes());

    sha256d::Hash::hash(&serialized).to_byte_array()
}

/// Pre-segwit digest: the signed input carries the scriptCode, others an empty script
fn legacy_sighash(tx: &UnsignedUtxoTransaction, index: usize) -> [u8; 32] {
    let script_code = tx.script_code();

    let mut serialized = Vec::new();
    serialized.extend_from_slice(&tx.version.to_le_bytes());
    write_compact_size(tx.inputs.len() as u64, &mut serialized);
    for (i, input) in tx.inputs.iter().enumerate() {
        write_outpoint(input, &mut serialized);
        if i == index {
            write_compact_size(script_code.len() as u64, &mut serialized);
            serialized.extend_from_slice(&script_code);
        } else {
            serialized.push(0x00);
        }
        serialized.extend_from_slice(&input.sequence.to_le_bytes());
    }
    write_compact_size(tx.outputs.len() as u64, &mut serialized);
    serialized.extend_from_slice(&serialized_outputs(tx));
    serialized.extend_from_slice(&tx.lock_time.to_le_bytes());
    serialized.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

    sha256d::Hash::hash(&serialized).to_byte_array()
}

fn zcash_blake2b(personal: &[u8; 16], data: &[u8]) -> [u8; 32] {
    // BLAKE2b parameter block: 32-byte digest, no key, no salt, personalization
    let mut params = [0u64; 8];
    params[0] = 0x0101_0000 ^ 32;
    params[6] = u64::from_le_bytes(personal[0..8].try_into().unwrap());
    params[7] = u64::from_le_bytes(personal[8..16].try_into().unwrap());
    let mut hasher = Blake2b::with_parameter_block(&params);
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finalize().as_bytes());
    out
}

/// ZIP-243 transparent-only digest
fn zip243_sighash(tx: &UnsignedUtxoTransaction, index: usize) -> PreImageResult<[u8; 32]> {
    let params = tx
        .zcash
        .ok_or_else(|| PreImageError::MissingField("zcash branch id".to_string()))?;
    let input = &tx.inputs[index];
    let script_code = tx.script_code();

    let mut serialized = Vec::new();
    serialized.extend_from_slice(&ZCASH_V4_HEADER.to_le_bytes());
    serialized.extend_from_slice(&ZCASH_SAPLING_VERSION_GROUP_ID.to_le_bytes());
    serialized.extend_from_slice(&zcash_blake2b(b"ZcashPrevoutHash", &serialized_prevouts(tx)));
    serialized.extend_from_slice(&zcash_blake2b(b"ZcashSequencHash", &serialized_sequences(tx)));
    serialized.extend_from_slice(&zcash_blake2b(b"ZcashOutputsHash", &serialized_outputs(tx)));
    // joinsplits, shielded spends, shielded outputs
    serialized.extend_from_slice(&[0u8; 96]);
    serialized.extend_from_slice(&tx.lock_time.to_le_bytes());
    serialized.extend_from_slice(&params.expiry_height.to_le_bytes());
    // valueBalance
    serialized.extend_from_slice(&0i64.to_le_bytes());
    serialized.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
    write_outpoint(input, &mut serialized);
    write_compact_size(script_code.len() as u64, &mut serialized);
    serialized.extend_from_slice(&script_code);
    serialized.extend_from_slice(&input.amount.to_le_bytes());
    serialized.extend_from_slice(&input.sequence.to_le_bytes());

    let mut personal = [0u8; 16];
    personal[..12].copy_from_slice(b"ZcashSigHash");
    personal[12..].copy_from_slice(&params.branch_id.to_le_bytes());
    Ok(zcash_blake2b(&personal, &serialized))
}
