//! Ripple transaction compilation

use crate::signing::preimage::ripple::{UnsignedRippleTransaction, TRANSACTION_ID_PREFIX};
use crate::utils::sha512_half;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRippleTransaction {
    pub tx_blob: Vec<u8>,
    pub hash: [u8; 32],
}

impl CompiledRippleTransaction {
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(self.hash)
    }
}

/// Insert a DER signature and compute the transaction id
pub fn compile_ripple_transaction(
    tx: &UnsignedRippleTransaction,
    der_signature: &[u8],
) -> CompiledRippleTransaction {
    let tx_blob = tx.serialize(Some(der_signature));
    let mut data = TRANSACTION_ID_PREFIX.to_vec();
    data.extend_from_slice(&tx_blob);
    let hash = sha512_half(&data);
    CompiledRippleTransaction { tx_blob, hash }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_over_signed_blob() {
        let tx = UnsignedRippleTransaction {
            account: [1; 20],
            destination: [2; 20],
            amount_drops: 5,
            fee_drops: 10,
            sequence: 1,
            last_ledger_sequence: 0,
            destination_tag: None,
            memo: None,
            public_key: vec![0x03; 33],
        };
        let compiled = compile_ripple_transaction(&tx, &[0x30, 0x06, 1, 2, 3, 4, 5, 6]);
        let mut data = b"TXN\0".to_vec();
        data.extend_from_slice(&compiled.tx_blob);
        assert_eq!(compiled.hash, sha512_half(&data));
        assert_eq!(compiled.hash_hex().len(), 64);
    }
}
