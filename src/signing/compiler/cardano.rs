//! Cardano transaction compilation

use crate::signing::preimage::cardano::{get_cardano_body_hash, UnsignedCardanoTransaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCardanoTransaction {
    pub encoded: Vec<u8>,
    /// Transaction id, the body hash
    pub tx_id: [u8; 32],
}

pub fn compile_cardano_transaction(tx: &UnsignedCardanoTransaction, signature: &[u8; 64]) -> CompiledCardanoTransaction {
    CompiledCardanoTransaction {
        encoded: tx.signed_bytes(signature),
        tx_id: get_cardano_body_hash(tx),
    }
}
