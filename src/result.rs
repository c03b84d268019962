//! Signed transaction results

use serde::{Deserialize, Serialize};

/// Final, broadcast-ready transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransactionResult {
    pub raw_transaction: String,
    pub transaction_hash: String,
    pub signature: Option<String>,
}

impl SignedTransactionResult {
    pub fn new(raw_transaction: impl Into<String>, transaction_hash: impl Into<String>) -> Self {
        Self {
            raw_transaction: raw_transaction.into(),
            transaction_hash: transaction_hash.into(),
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// A lone transaction, or an approval that must be broadcast before the swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SignedTransactionType {
    Regular {
        transaction: SignedTransactionResult,
    },
    RegularWithApprove {
        approve: SignedTransactionResult,
        transaction: SignedTransactionResult,
    },
}

impl SignedTransactionType {
    /// Transactions in broadcast order
    pub fn in_broadcast_order(&self) -> Vec<&SignedTransactionResult> {
        match self {
            SignedTransactionType::Regular { transaction } => vec![transaction],
            SignedTransactionType::RegularWithApprove { approve, transaction } => {
                vec![approve, transaction]
            }
        }
    }

    pub fn transaction(&self) -> &SignedTransactionResult {
        match self {
            SignedTransactionType::Regular { transaction }
            | SignedTransactionType::RegularWithApprove { transaction, .. } => transaction,
        }
    }
}
