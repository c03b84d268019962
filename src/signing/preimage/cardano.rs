//! Cardano Pre-Image Hashing
//!
//! Shelley-era transactions: the witness signs Blake2b-256 of the CBOR body.

use serde::{Deserialize, Serialize};

use crate::encoding::cbor::CborValue;
use crate::utils::blake2b_256;

const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const BODY_TTL: u64 = 3;
const WITNESS_VKEYS: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoInput {
    pub tx_hash: [u8; 32],
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoOutput {
    /// Raw Shelley address bytes
    pub address: Vec<u8>,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedCardanoTransaction {
    pub inputs: Vec<CardanoInput>,
    pub outputs: Vec<CardanoOutput>,
    pub fee: u64,
    pub ttl: u64,
    /// 32-byte Ed25519 spending key
    pub public_key: Vec<u8>,
}

impl UnsignedCardanoTransaction {
    pub fn body(&self) -> CborValue {
        let inputs = self
            .inputs
            .iter()
            .map(|i| {
                CborValue::Array(vec![
                    CborValue::Bytes(i.tx_hash.to_vec()),
                    CborValue::Unsigned(i.index),
                ])
            })
            .collect();
        let outputs = self
            .outputs
            .iter()
            .map(|o| {
                CborValue::Array(vec![
                    CborValue::Bytes(o.address.clone()),
                    CborValue::Unsigned(o.amount),
                ])
            })
            .collect();
        CborValue::Map(vec![
            (CborValue::Unsigned(BODY_INPUTS), CborValue::Array(inputs)),
            (CborValue::Unsigned(BODY_OUTPUTS), CborValue::Array(outputs)),
            (CborValue::Unsigned(BODY_FEE), CborValue::Unsigned(self.fee)),
            (CborValue::Unsigned(BODY_TTL), CborValue::Unsigned(self.ttl)),
        ])
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        self.body().encode()
    }

    /// `[body, witness_set, is_valid, auxiliary_data]`
    pub fn signed_bytes(&self, signature: &[u8; 64]) -> Vec<u8> {
        let witness = CborValue::Map(vec![(
            CborValue::Unsigned(WITNESS_VKEYS),
            CborValue::Array(vec![CborValue::Array(vec![
                CborValue::Bytes(self.public_key.clone()),
                CborValue::Bytes(signature.to_vec()),
            ])]),
        )]);
        CborValue::Array(vec![self.body(), witness, CborValue::Bool(true), CborValue::Null]).encode()
    }

    /// Size of the signed transaction; signatures have fixed length
    pub fn signed_size(&self) -> usize {
        self.signed_bytes(&[0u8; 64]).len()
    }
}

pub fn get_cardano_body_hash(tx: &UnsignedCardanoTransaction) -> [u8; 32] {
    blake2b_256(&tx.body_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UnsignedCardanoTransaction {
        UnsignedCardanoTransaction {
            inputs: vec![CardanoInput { tx_hash: [0xaa; 32], index: 1 }],
            outputs: vec![CardanoOutput { address: vec![0x61; 29], amount: 1_500_000 }],
            fee: 170_000,
            ttl: 150_000_000,
            public_key: vec![5; 32],
        }
    }

    #[test]
    fn test_body_encoding() {
        let body = sample().body_bytes();
        // map(4), key 0, array(1), array(2), bytes(32)
        assert_eq!(&body[..5], &[0xa4, 0x00, 0x81, 0x82, 0x58]);
        assert_eq!(body[5], 32);
        assert_eq!(get_cardano_body_hash(&sample()), blake2b_256(&body));
    }

    #[test]
    fn test_signed_envelope() {
        let tx = sample();
        let signed = tx.signed_bytes(&[9u8; 64]);
        assert_eq!(signed[0], 0x84);
        assert_eq!(&signed[1..1 + tx.body_bytes().len()], tx.body_bytes().as_slice());
        assert_eq!(&signed[signed.len() - 2..], &[0xf5, 0xf6]);
        assert_eq!(tx.signed_size(), signed.len());
    }
}
