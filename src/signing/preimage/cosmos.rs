//! Cosmos Pre-Image Hashing
//!
//! SIGN_MODE_DIRECT: the signer signs SHA-256 of the protobuf `SignDoc`.

use serde::{Deserialize, Serialize};

use crate::encoding::protobuf::ProtoWriter;
use crate::types::Chain;
use crate::utils::sha256;

const SECP256K1_PUBKEY_TYPE: &str = "/cosmos.crypto.secp256k1.PubKey";
const SIGN_MODE_DIRECT: u64 = 1;

/// Cosmos fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosFee {
    pub amount: Vec<CosmosCoin>,
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosCoin {
    pub denom: String,
    pub amount: String,
}

/// Message packed as `google.protobuf.Any`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosMessage {
    pub type_url: String,
    pub value: Vec<u8>,
}

/// Unsigned Cosmos transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCosmosTransaction {
    pub chain: Chain,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub messages: Vec<CosmosMessage>,
    pub memo: String,
    pub fee: CosmosFee,
    /// Compressed secp256k1 key
    pub public_key: Vec<u8>,
}

impl UnsignedCosmosTransaction {
    /// `TxBody`
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut body = ProtoWriter::new();
        for msg in &self.messages {
            body.any(1, &msg.type_url, &msg.value);
        }
        body.string(2, &self.memo);
        body.finish()
    }

    /// `AuthInfo` with a single SIGN_MODE_DIRECT signer
    pub fn auth_info_bytes(&self) -> Vec<u8> {
        let pubkey = ProtoWriter::new().bytes(1, &self.public_key).finish();
        let single = ProtoWriter::new().uint64(1, SIGN_MODE_DIRECT).finish();
        let mode_info = ProtoWriter::new().message(1, &single).finish();
        let signer_info = ProtoWriter::new()
            .any(1, SECP256K1_PUBKEY_TYPE, &pubkey)
            .message(2, &mode_info)
            .uint64(3, self.sequence)
            .finish();

        let mut fee = ProtoWriter::new();
        for coin in &self.fee.amount {
            let encoded = ProtoWriter::new()
                .string(1, &coin.denom)
                .string(2, &coin.amount)
                .finish();
            fee.message(1, &encoded);
        }
        fee.uint64(2, self.fee.gas);
        let fee = fee.finish();

        ProtoWriter::new()
            .message(1, &signer_info)
            .message(2, &fee)
            .finish()
    }

    pub fn sign_doc_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.body_bytes())
            .bytes(2, &self.auth_info_bytes())
            .string(3, &self.chain_id)
            .uint64(4, self.account_number)
            .finish()
    }
}

/// SHA-256 of the `SignDoc`
pub fn get_cosmos_sign_doc_hash(tx: &UnsignedCosmosTransaction) -> [u8; 32] {
    sha256(&tx.sign_doc_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cosmos_tx() -> UnsignedCosmosTransaction {
        UnsignedCosmosTransaction {
            chain: Chain::Gaia,
            chain_id: "cosmoshub-4".to_string(),
            account_number: 12345,
            sequence: 5,
            messages: vec![CosmosMessage {
                type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
                value: vec![0x0a, 0x01, b'a'],
            }],
            memo: "hello".to_string(),
            fee: CosmosFee {
                amount: vec![CosmosCoin { denom: "uatom".to_string(), amount: "7500".to_string() }],
                gas: 200_000,
            },
            public_key: vec![0x02; 33],
        }
    }

    #[test]
    fn test_sign_doc_layout() {
        let tx = sample_cosmos_tx();
        let doc = tx.sign_doc_bytes();
        let body = tx.body_bytes();

        assert_eq!(doc[0], 0x0a);
        assert_eq!(doc[1] as usize, body.len());
        assert_eq!(&doc[2..2 + body.len()], body.as_slice());
        // chain id then account number close the document
        let tail = [&[0x1a, 11][..], b"cosmoshub-4", &[0x20, 0xb9, 0x60]].concat();
        assert!(doc.ends_with(&tail));
    }

    #[test]
    fn test_sign_doc_hash_tracks_sequence() {
        let tx = sample_cosmos_tx();
        let mut next = tx.clone();
        next.sequence += 1;
        assert_ne!(get_cosmos_sign_doc_hash(&tx), get_cosmos_sign_doc_hash(&next));
    }

    #[test]
    fn test_zero_fee_keeps_gas() {
        let mut tx = sample_cosmos_tx();
        tx.fee.amount.clear();
        let auth = tx.auth_info_bytes();
        // fee message: only gas_limit = 200000
        assert!(auth.ends_with(&[0x12, 0x04, 0x10, 0xc0, 0x9a, 0x0c]));
    }
}
