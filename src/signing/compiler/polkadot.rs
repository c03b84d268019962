//! Polkadot extrinsic compilation

use crate::encoding::scale;
use crate::signing::preimage::polkadot::UnsignedPolkadotTransaction;
use crate::utils::blake2b_256;

/// Extrinsic format version 4, signed
const SIGNED_EXTRINSIC_V4: u8 = 0x84;
const MULTI_ADDRESS_ID: u8 = 0x00;
const MULTI_SIGNATURE_ED25519: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolkadotTransaction {
    /// Length-prefixed extrinsic
    pub extrinsic: Vec<u8>,
    pub hash: [u8; 32],
}

pub fn compile_polkadot_transaction(
    tx: &UnsignedPolkadotTransaction,
    public_key: &[u8; 32],
    signature: &[u8; 64],
) -> CompiledPolkadotTransaction {
    let mut body = vec![SIGNED_EXTRINSIC_V4, MULTI_ADDRESS_ID];
    body.extend_from_slice(public_key);
    body.push(MULTI_SIGNATURE_ED25519);
    body.extend_from_slice(signature);
    body.extend_from_slice(&tx.extra());
    body.extend_from_slice(&tx.call);

    let extrinsic = scale::encode_bytes(&body);
    let hash = blake2b_256(&extrinsic);
    CompiledPolkadotTransaction { extrinsic, hash }
}
