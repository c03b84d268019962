//! Cosmos transaction compilation

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::encoding::protobuf::ProtoWriter;
use crate::signing::preimage::cosmos::UnsignedCosmosTransaction;
use crate::utils::sha256;

pub const BROADCAST_MODE_SYNC: &str = "BROADCAST_MODE_SYNC";

/// Body of a `/cosmos/tx/v1beta1/txs` broadcast request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    pub mode: String,
    pub tx_bytes: String,
}

impl BroadcastEnvelope {
    pub fn decode_tx_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.tx_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCosmosTransaction {
    /// Protobuf `TxRaw`
    pub tx_bytes: Vec<u8>,
    pub envelope: BroadcastEnvelope,
}

impl CompiledCosmosTransaction {
    /// Uppercase hex SHA-256 of the tx bytes, as explorers show it
    pub fn tx_hash(&self) -> String {
        hex::encode_upper(sha256(&self.tx_bytes))
    }
}

/// Build `TxRaw` with one `r ‖ s` signature
pub fn compile_cosmos_transaction(
    tx: &UnsignedCosmosTransaction,
    signature: &[u8; 64],
) -> CompiledCosmosTransaction {
    let tx_bytes = ProtoWriter::new()
        .bytes(1, &tx.body_bytes())
        .bytes(2, &tx.auth_info_bytes())
        .bytes(3, signature)
        .finish();
    let envelope = BroadcastEnvelope {
        mode: BROADCAST_MODE_SYNC.to_string(),
        tx_bytes: base64::engine::general_purpose::STANDARD.encode(&tx_bytes),
    };
    CompiledCosmosTransaction { tx_bytes, envelope }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::preimage::cosmos::{CosmosFee, CosmosMessage};
    use crate::types::Chain;

    #[test]
    fn test_envelope_round_trips_tx_bytes() {
        let tx = UnsignedCosmosTransaction {
            chain: Chain::Thorchain,
            chain_id: "thorchain-1".to_string(),
            account_number: 1,
            sequence: 0,
            messages: vec![CosmosMessage { type_url: "/types.MsgDeposit".to_string(), value: vec![] }],
            memo: String::new(),
            fee: CosmosFee { amount: vec![], gas: 20_000_000 },
            public_key: vec![0x03; 33],
        };
        let compiled = compile_cosmos_transaction(&tx, &[7u8; 64]);

        let json = serde_json::to_string(&compiled.envelope).unwrap();
        assert!(json.starts_with(r#"{"mode":"BROADCAST_MODE_SYNC","tx_bytes":""#));
        let decoded: BroadcastEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.decode_tx_bytes().unwrap(), compiled.tx_bytes);

        let hash = compiled.tx_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash.to_uppercase());
        let n = compiled.tx_bytes.len();
        assert_eq!(&compiled.tx_bytes[n - 66..n - 64], &[0x1a, 0x40]);
        assert!(compiled.tx_bytes[n - 64..].iter().all(|&b| b == 7));
    }
}
