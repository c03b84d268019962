//! Solana transaction compilation

use crate::signing::preimage::solana::write_compact_u16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSolanaTransaction {
    pub raw_tx: Vec<u8>,
}

impl CompiledSolanaTransaction {
    /// The encoded transaction, base58 as wallets broadcast it
    pub fn encoded(&self) -> String {
        bs58::encode(&self.raw_tx).into_string()
    }

    /// The transaction id is the first signature, base58
    pub fn signature_id(&self) -> Option<String> {
        self.raw_tx
            .get(1..65)
            .filter(|_| self.raw_tx.first() == Some(&1))
            .map(|sig| bs58::encode(sig).into_string())
    }
}

pub fn compile_solana_transaction(message: &[u8], signature: &[u8; 64]) -> CompiledSolanaTransaction {
    let mut raw_tx = Vec::with_capacity(1 + 64 + message.len());
    write_compact_u16(1, &mut raw_tx);
    raw_tx.extend_from_slice(signature);
    raw_tx.extend_from_slice(message);
    CompiledSolanaTransaction { raw_tx }
}
