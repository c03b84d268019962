//! Sui Pre-Image Hashing
//!
//! A PaySui-style programmable transaction: every input coin is used as gas
//! payment, the amount is split from the gas coin and transferred.

use serde::{Deserialize, Serialize};

use super::{PreImageError, PreImageResult};
use crate::encoding::bcs::BcsWriter;
use crate::utils::blake2b_256;

/// Intent scope TransactionData, version V0, app id Sui
pub const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiObjectRef {
    pub object_id: [u8; 32],
    pub version: u64,
    pub digest: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedSuiTransaction {
    pub sender: [u8; 32],
    pub recipient: [u8; 32],
    pub amount: u64,
    pub coins: Vec<SuiObjectRef>,
    pub gas_price: u64,
    pub gas_budget: u64,
    pub public_key: Vec<u8>,
}

impl UnsignedSuiTransaction {
    /// BCS `TransactionData::V1`
    pub fn transaction_data(&self) -> PreImageResult<Vec<u8>> {
        if self.coins.is_empty() {
            return Err(PreImageError::MissingField("coins".to_string()));
        }

        let mut w = BcsWriter::new();
        // TransactionData::V1, TransactionKind::ProgrammableTransaction
        w.variant(0).variant(0);

        // inputs: Pure(amount), Pure(recipient)
        w.uleb128(2);
        w.variant(0).bytes(&self.amount.to_le_bytes());
        w.variant(0).bytes(&self.recipient);

        // commands
        w.uleb128(2);
        // SplitCoins(GasCoin, [Input(0)])
        w.variant(2).variant(0).uleb128(1).variant(1).u16(0);
        // TransferObjects([NestedResult(0, 0)], Input(1))
        w.variant(1).uleb128(1).variant(3).u16(0).u16(0).variant(1).u16(1);

        w.fixed(&self.sender);

        // GasData
        w.uleb128(self.coins.len() as u64);
        for coin in &self.coins {
            w.fixed(&coin.object_id).u64(coin.version).bytes(&coin.digest);
        }
        w.fixed(&self.sender).u64(self.gas_price).u64(self.gas_budget);

        // TransactionExpiration::None
        w.variant(0);
        Ok(w.finish())
    }
}

/// Blake2b-256 over the intent message
pub fn get_sui_signing_digest(tx: &UnsignedSuiTransaction) -> PreImageResult<[u8; 32]> {
    let mut intent_message = TRANSACTION_INTENT.to_vec();
    intent_message.extend_from_slice(&tx.transaction_data()?);
    Ok(blake2b_256(&intent_message))
}
