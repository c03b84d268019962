//! Ton external message assembly

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::signing::preimage::UnsignedTonTransaction;
use crate::ton::{encode_boc, BocResult, Cell, CellBuilder};

pub struct CompiledTonTransaction {
    pub message: Cell,
}

impl CompiledTonTransaction {
    /// Base64 bag of cells, as accepted by `sendBoc`
    pub fn boc_base64(&self) -> String {
        STANDARD.encode(encode_boc(&self.message))
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.message.hash())
    }
}

/// Wrap the signed wallet body into an `ext_in_msg_info` message
pub fn compile_ton_transaction(
    tx: &UnsignedTonTransaction,
    signature: &[u8; 64],
) -> BocResult<CompiledTonTransaction> {
    let body = tx.body(Some(signature))?;

    let mut b = CellBuilder::new();
    b.store_uint(0b10, 2)?
        .store_address(None)?
        .store_address(Some(&tx.wallet))?
        .store_coins(0)? // import_fee
        .store_bit(false)? // no state init
        .store_bit(true)?;
    b.store_ref(body)?;

    Ok(CompiledTonTransaction { message: b.build() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::preimage::ton::{TonMessage, TonMessageBody};
    use crate::ton::TonAddress;

    #[test]
    fn test_external_message_wraps_signed_body() {
        let tx = UnsignedTonTransaction {
            wallet: TonAddress::new(0, [1u8; 32]),
            wallet_id: 698_983_191,
            seqno: 0,
            expire_at: 1_700_000_000,
            messages: vec![TonMessage {
                destination: TonAddress::new(0, [2u8; 32]),
                amount: 10,
                mode: 3,
                body: TonMessageBody::Comment("hi".into()),
            }],
            public_key: vec![0u8; 32],
        };
        let compiled = compile_ton_transaction(&tx, &[7u8; 64]).unwrap();
        let message = &compiled.message;
        assert_eq!(message.bit_len(), 2 + 2 + 267 + 4 + 1 + 1);

        let body = &message.refs()[0];
        assert_eq!(body.bit_len(), 512 + 112);
        assert_eq!(&body.padded_data()[..64], &[7u8; 64]);

        let boc = STANDARD.decode(compiled.boc_base64()).unwrap();
        assert_eq!(&boc[..4], &crate::ton::boc::BOC_MAGIC);
        assert_eq!(compiled.hash_hex().len(), 64);
    }
}
