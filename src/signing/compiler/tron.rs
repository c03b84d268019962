//! Tron transaction compilation
//!
//! Output is the JSON accepted by `/wallet/broadcasttransaction`.

use serde::Serialize;

use crate::signing::preimage::tron::{get_tron_txid, UnsignedTronTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledTronTransaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub raw_data_hex: String,
    pub signature: Vec<String>,
}

/// `signature` is `r ‖ s ‖ v` with `v` in 0..=1
pub fn compile_tron_transaction(tx: &UnsignedTronTransaction, signature: &[u8; 65]) -> CompiledTronTransaction {
    CompiledTronTransaction {
        tx_id: hex::encode(get_tron_txid(tx)),
        raw_data_hex: hex::encode(tx.raw_bytes()),
        signature: vec![hex::encode(signature)],
    }
}
