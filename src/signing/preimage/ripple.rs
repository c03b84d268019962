//! Ripple Pre-Image Hashing
//!
//! Payment in XRPL canonical field order; the signer signs
//! SHA-512-half of `STX\0 ‖ tx` (TxnSignature omitted).

use serde::{Deserialize, Serialize};

use crate::encoding::xrpl::{
    encode_vl, encode_xrp_amount, field_id, ARRAY_END, OBJECT_END, TYPE_ACCOUNT_ID, TYPE_AMOUNT,
    TYPE_ARRAY, TYPE_BLOB, TYPE_OBJECT, TYPE_UINT16, TYPE_UINT32,
};
use crate::utils::sha512_half;

pub const PAYMENT: u16 = 0;
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;
pub const SIGNING_PREFIX: [u8; 4] = *b"STX\0";
pub const TRANSACTION_ID_PREFIX: [u8; 4] = *b"TXN\0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedRippleTransaction {
    pub account: [u8; 20],
    pub destination: [u8; 20],
    pub amount_drops: u64,
    pub fee_drops: u64,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
    pub destination_tag: Option<u32>,
    pub memo: Option<Vec<u8>>,
    /// Compressed secp256k1 key
    pub public_key: Vec<u8>,
}

impl UnsignedRippleTransaction {
    /// Canonical binary form, with the signature when given
    pub fn serialize(&self, signature: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(field_id(TYPE_UINT16, 2));
        out.extend_from_slice(&PAYMENT.to_be_bytes());
        out.extend(field_id(TYPE_UINT32, 2));
        out.extend_from_slice(&TF_FULLY_CANONICAL_SIG.to_be_bytes());
        out.extend(field_id(TYPE_UINT32, 4));
        out.extend_from_slice(&self.sequence.to_be_bytes());
        if let Some(tag) = self.destination_tag {
            out.extend(field_id(TYPE_UINT32, 14));
            out.extend_from_slice(&tag.to_be_bytes());
        }
        if self.last_ledger_sequence > 0 {
            out.extend(field_id(TYPE_UINT32, 27));
            out.extend_from_slice(&self.last_ledger_sequence.to_be_bytes());
        }
        out.extend(field_id(TYPE_AMOUNT, 1));
        out.extend_from_slice(&encode_xrp_amount(self.amount_drops));
        out.extend(field_id(TYPE_AMOUNT, 8));
        out.extend_from_slice(&encode_xrp_amount(self.fee_drops));
        out.extend(field_id(TYPE_BLOB, 3));
        encode_vl(&self.public_key, &mut out);
        if let Some(signature) = signature {
            out.extend(field_id(TYPE_BLOB, 4));
            encode_vl(signature, &mut out);
        }
        out.extend(field_id(TYPE_ACCOUNT_ID, 1));
        encode_vl(&self.account, &mut out);
        out.extend(field_id(TYPE_ACCOUNT_ID, 3));
        encode_vl(&self.destination, &mut out);
        if let Some(memo) = &self.memo {
            out.extend(field_id(TYPE_ARRAY, 9));
            out.extend(field_id(TYPE_OBJECT, 10));
            out.extend(field_id(TYPE_BLOB, 13));
            encode_vl(memo, &mut out);
            out.push(OBJECT_END);
            out.push(ARRAY_END);
        }
        out
    }
}

pub fn get_ripple_signing_hash(tx: &UnsignedRippleTransaction) -> [u8; 32] {
    let mut data = SIGNING_PREFIX.to_vec();
    data.extend_from_slice(&tx.serialize(None));
    sha512_half(&data)
}
