//! Sui transaction compilation

use base64::Engine;

use crate::utils::blake2b_256;

/// Signature scheme flag for Ed25519
pub const ED25519_FLAG: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSuiTransaction {
    /// BCS `TransactionData`
    pub tx_bytes: Vec<u8>,
    /// `flag ‖ signature ‖ public key`
    pub signature: Vec<u8>,
}

impl CompiledSuiTransaction {
    pub fn tx_bytes_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.tx_bytes)
    }

    pub fn signature_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.signature)
    }

    /// Transaction digest, base58
    pub fn digest(&self) -> String {
        let mut data = b"TransactionData::".to_vec();
        data.extend_from_slice(&self.tx_bytes);
        bs58::encode(blake2b_256(&data)).into_string()
    }
}

pub fn compile_sui_transaction(
    tx_bytes: Vec<u8>,
    signature: &[u8; 64],
    public_key: &[u8; 32],
) -> CompiledSuiTransaction {
    let mut serialized = Vec::with_capacity(97);
    serialized.push(ED25519_FLAG);
    serialized.extend_from_slice(signature);
    serialized.extend_from_slice(public_key);
    CompiledSuiTransaction { tx_bytes, signature: serialized }
}
