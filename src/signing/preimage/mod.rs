//! Pre-Image Hash Generation
//!
//! Each chain module holds its unsigned transaction structure and computes
//! the exact bytes or digest the vault signs for it.

pub mod cardano;
pub mod cosmos;
pub mod ethereum;
pub mod polkadot;
pub mod ripple;
pub mod solana;
pub mod sui;
pub mod ton;
pub mod tron;
pub mod utxo;

use crate::error::KeysignError;

/// Error types for pre-image operations
#[derive(Debug, thiserror::Error)]
pub enum PreImageError {
    #[error("Invalid transaction format: {0}")]
    InvalidTransaction(String),

    #[error("Unsupported transaction type: {0}")]
    UnsupportedType(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

pub type PreImageResult<T> = Result<T, PreImageError>;

impl From<PreImageError> for KeysignError {
    fn from(e: PreImageError) -> Self {
        KeysignError::runtime(e.to_string())
    }
}

pub use cardano::{get_cardano_body_hash, UnsignedCardanoTransaction};
pub use cosmos::{get_cosmos_sign_doc_hash, UnsignedCosmosTransaction};
pub use ethereum::{get_ethereum_signing_hash, UnsignedEthereumTransaction};
pub use polkadot::{get_polkadot_signing_payload, UnsignedPolkadotTransaction};
pub use ripple::{get_ripple_signing_hash, UnsignedRippleTransaction};
pub use solana::{get_solana_message, UnsignedSolanaTransaction};
pub use sui::{get_sui_signing_digest, UnsignedSuiTransaction};
pub use ton::{get_ton_signing_hash, UnsignedTonTransaction};
pub use tron::{get_tron_txid, UnsignedTronTransaction};
pub use utxo::{get_utxo_sighashes, UnsignedUtxoTransaction};
