//! Ton Pre-Image Hashing
//!
//! Wallet v4r2: the signer signs the representation hash of the body cell
//! `subwallet ‖ valid_until ‖ seqno ‖ op=0 ‖ (mode, ^message)*`.

use serde::{Deserialize, Serialize};

use crate::ton::{BocResult, Cell, CellBuilder, TonAddress};
use crate::ton::boc::snake_text_cell;

pub const JETTON_TRANSFER_OP: u32 = 0x0f8a_7ea5;
pub const STAKE_DEPOSIT_OP: u32 = 0x7bcd_1fef;
pub const STAKE_WITHDRAW_OP: u32 = 0xda80_3efd;
const TEXT_COMMENT_OP: u32 = 0;

/// Pay transfer fees separately from the value
pub const SEND_MODE_PAY_FEES_SEPARATELY: u8 = 1;
pub const SEND_MODE_IGNORE_ERRORS: u8 = 2;
/// Carry the whole remaining balance
pub const SEND_MODE_CARRY_ALL_BALANCE: u8 = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TonMessageBody {
    Empty,
    Comment(String),
    JettonTransfer {
        query_id: u64,
        amount: u128,
        destination: TonAddress,
        response_destination: TonAddress,
        forward_amount: u128,
        comment: Option<String>,
    },
    StakeDeposit { query_id: u64, gas_limit: u128 },
    /// A zero amount withdraws everything
    StakeWithdraw { query_id: u64, gas_limit: u128, amount: u128 },
}

impl TonMessageBody {
    pub fn to_cell(&self) -> BocResult<Option<Cell>> {
        let cell = match self {
            TonMessageBody::Empty => return Ok(None),
            TonMessageBody::Comment(text) => snake_text_cell(Some(TEXT_COMMENT_OP), text.as_bytes())?,
            TonMessageBody::JettonTransfer {
                query_id,
                amount,
                destination,
                response_destination,
                forward_amount,
                comment,
            } => {
                let mut b = CellBuilder::new();
                b.store_uint(JETTON_TRANSFER_OP as u128, 32)?
                    .store_uint(*query_id as u128, 64)?
                    .store_coins(*amount)?
                    .store_address(Some(destination))?
                    .store_address(Some(response_destination))?
                    // no custom payload
                    .store_bit(false)?
                    .store_coins(*forward_amount)?;
                match comment {
                    Some(text) => {
                        b.store_bit(true)?;
                        b.store_ref(snake_text_cell(Some(TEXT_COMMENT_OP), text.as_bytes())?)?;
                    }
                    None => {
                        b.store_bit(false)?;
                    }
                }
                b.build()
            }
            TonMessageBody::StakeDeposit { query_id, gas_limit } => {
                let mut b = CellBuilder::new();
                b.store_uint(STAKE_DEPOSIT_OP as u128, 32)?
                    .store_uint(*query_id as u128, 64)?
                    .store_coins(*gas_limit)?;
                b.build()
            }
            TonMessageBody::StakeWithdraw { query_id, gas_limit, amount } => {
                let mut b = CellBuilder::new();
                b.store_uint(STAKE_WITHDRAW_OP as u128, 32)?
                    .store_uint(*query_id as u128, 64)?
                    .store_coins(*gas_limit)?
                    .store_coins(*amount)?;
                b.build()
            }
        };
        Ok(Some(cell))
    }
}

/// Outgoing internal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonMessage {
    pub destination: TonAddress,
    pub amount: u128,
    pub mode: u8,
    pub body: TonMessageBody,
}

impl TonMessage {
    /// `int_msg_info` with zeroed fees and timestamps, body by reference
    pub fn to_cell(&self) -> BocResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_bit(false)? // int_msg_info$0
            .store_bit(true)? // ihr_disabled
            .store_bit(self.destination.bounceable)?
            .store_bit(false)? // bounced
            .store_address(None)?
            .store_address(Some(&self.destination))?
            .store_coins(self.amount)?
            .store_bit(false)? // no extra currencies
            .store_coins(0)? // ihr_fee
            .store_coins(0)? // fwd_fee
            .store_uint(0, 64)? // created_lt
            .store_uint(0, 32)? // created_at
            .store_bit(false)?; // no state init
        match self.body.to_cell()? {
            Some(body) => {
                b.store_bit(true)?;
                b.store_ref(body)?;
            }
            None => {
                b.store_bit(false)?;
            }
        }
        Ok(b.build())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTonTransaction {
    /// Sender wallet contract
    pub wallet: TonAddress,
    pub wallet_id: u32,
    pub seqno: u32,
    pub expire_at: u32,
    pub messages: Vec<TonMessage>,
    pub public_key: Vec<u8>,
}

impl UnsignedTonTransaction {
    /// Wallet body; with a signature this is the signed external body
    pub fn body(&self, signature: Option<&[u8; 64]>) -> BocResult<Cell> {
        let mut b = CellBuilder::new();
        if let Some(sig) = signature {
            b.store_bytes(sig)?;
        }
        b.store_uint(self.wallet_id as u128, 32)?
            .store_uint(self.expire_at as u128, 32)?
            .store_uint(self.seqno as u128, 32)?
            .store_uint(0, 8)?;
        for message in &self.messages {
            b.store_uint(message.mode as u128, 8)?;
            b.store_ref(message.to_cell()?)?;
        }
        Ok(b.build())
    }
}

pub fn get_ton_signing_hash(tx: &UnsignedTonTransaction) -> BocResult<[u8; 32]> {
    Ok(tx.body(None)?.hash())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(body: TonMessageBody) -> UnsignedTonTransaction {
        UnsignedTonTransaction {
            wallet: TonAddress::new(0, [1u8; 32]),
            wallet_id: 698_983_191,
            seqno: 4,
            expire_at: 1_700_000_000,
            messages: vec![TonMessage {
                destination: TonAddress::new(0, [2u8; 32]).with_bounceable(false),
                amount: 1_000_000_000,
                mode: SEND_MODE_PAY_FEES_SEPARATELY | SEND_MODE_IGNORE_ERRORS,
                body,
            }],
            public_key: vec![3u8; 32],
        }
    }

    #[test]
    fn test_signing_body_layout() {
        let body = sample(TonMessageBody::Empty).body(None).unwrap();
        assert_eq!(body.bit_len(), 32 * 3 + 8 + 8);
        assert_eq!(body.refs().len(), 1);
        let data = body.padded_data();
        assert_eq!(&data[..4], &698_983_191u32.to_be_bytes());
        assert_eq!(&data[8..12], &4u32.to_be_bytes());
        assert_eq!(data[13], 3);
    }

    #[test]
    fn test_internal_message_bits() {
        let message = sample(TonMessageBody::Empty).messages[0].to_cell().unwrap();
        // 4 flag bits, addr_none, addr_std (267), coins (4 + 32), extra, 2 fees,
        // lt, at, init, body
        assert_eq!(message.bit_len(), 4 + 2 + 267 + 36 + 1 + 4 + 4 + 64 + 32 + 1 + 1);
        assert!(message.refs().is_empty());
    }

    #[test]
    fn test_comment_goes_into_reference() {
        let message = sample(TonMessageBody::Comment("hello".into())).messages[0]
            .to_cell()
            .unwrap();
        let comment = &message.refs()[0];
        assert_eq!(comment.bit_len(), 32 + 5 * 8);
        assert_eq!(&comment.padded_data()[4..], b"hello");
    }

    #[test]
    fn test_staking_payloads() {
        let deposit = TonMessageBody::StakeDeposit { query_id: 0, gas_limit: 100_000 }
            .to_cell()
            .unwrap()
            .unwrap();
        assert_eq!(&deposit.padded_data()[..4], &[0x7b, 0xcd, 0x1f, 0xef]);
        // op, query id, coins with 3 bytes
        assert_eq!(deposit.bit_len(), 32 + 64 + 4 + 24);

        let withdraw = TonMessageBody::StakeWithdraw { query_id: 0, gas_limit: 100_000, amount: 0 }
            .to_cell()
            .unwrap()
            .unwrap();
        assert_eq!(&withdraw.padded_data()[..4], &[0xda, 0x80, 0x3e, 0xfd]);
        assert_eq!(withdraw.bit_len(), 32 + 64 + 28 + 4);
    }

    #[test]
    fn test_hash_changes_with_seqno() {
        let a = sample(TonMessageBody::Empty);
        let mut b = a.clone();
        b.seqno += 1;
        assert_ne!(get_ton_signing_hash(&a).unwrap(), get_ton_signing_hash(&b).unwrap());
    }
}
