//! Polkadot Pre-Image
//!
//! Signing payload: `call ‖ extra ‖ additional signed`, hashed with
//! Blake2b-256 only when longer than 256 bytes.

use serde::{Deserialize, Serialize};

use crate::encoding::scale::{compact_encode, ExtrinsicEra};
use crate::utils::blake2b_256;

/// CheckMetadataHash disabled
pub const METADATA_HASH_MODE_DISABLED: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedPolkadotTransaction {
    /// SCALE-encoded call
    pub call: Vec<u8>,
    pub current_block: u64,
    pub era_period: u64,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    pub block_hash: [u8; 32],
    pub public_key: Vec<u8>,
}

impl UnsignedPolkadotTransaction {
    pub fn era(&self) -> ExtrinsicEra {
        ExtrinsicEra::mortal(self.current_block, self.era_period)
    }

    /// Signed extensions carried in the extrinsic
    pub fn extra(&self) -> Vec<u8> {
        let mut extra = self.era().encode();
        extra.extend_from_slice(&compact_encode(self.nonce as u128));
        extra.extend_from_slice(&compact_encode(self.tip));
        extra.push(METADATA_HASH_MODE_DISABLED);
        extra
    }

    /// Signed extensions only committed to by the signature
    fn additional_signed(&self) -> Vec<u8> {
        let mut additional = Vec::with_capacity(73);
        additional.extend_from_slice(&self.spec_version.to_le_bytes());
        additional.extend_from_slice(&self.transaction_version.to_le_bytes());
        additional.extend_from_slice(&self.genesis_hash);
        additional.extend_from_slice(&self.block_hash);
        // metadata hash: None
        additional.push(0x00);
        additional
    }
}

pub fn get_polkadot_signing_payload(tx: &UnsignedPolkadotTransaction) -> Vec<u8> {
    let mut payload = tx.call.clone();
    payload.extend_from_slice(&tx.extra());
    payload.extend_from_slice(&tx.additional_signed());
    if payload.len() > 256 {
        blake2b_256(&payload).to_vec()
    } else {
        payload
    }
}
