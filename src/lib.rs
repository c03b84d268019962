//! Keysign Core Library
//!
//! Transaction construction and co-signing for a threshold-signature
//! vault spanning many chains.
//!
//! # Architecture
//!
//! This crate provides:
//! - **keys**: Child public-key derivation from the vault's root keys
//! - **builders**: One transaction builder per chain family, behind a registry
//! - **signing**: Pre-image hashing, signature lookup, verification, compilation
//! - **swap**: THORChain / MayaChain memos and aggregator quote routing
//! - **encoding** / **ton**: Hand-written wire codecs (RLP, protobuf, BCS, SCALE, CBOR, XRPL, BOC)
//! - **config**: Immutable per-chain defaults, overridable from JSON
//!
//! # Flow
//!
//! Every chain goes through the same three steps: build the unsigned
//! transaction, hand its pre-image hashes to the threshold signer, then
//! verify the returned signatures and assemble the broadcast bytes.
//!
//! ```rust,ignore
//! use keysign_core::{BuilderRegistry, KeysignConfig};
//!
//! let registry = BuilderRegistry::new(&KeysignConfig::default());
//! let hashes = registry.pre_image_hashes(&payload)?;
//! // ... threshold signer produces `signatures` for `hashes` ...
//! let signed = registry.sign(&payload, &vault, &signatures)?;
//! println!("{}", signed.transaction().raw_transaction);
//! ```

#[macro_use]
pub mod utils;

pub mod address;
pub mod builders;
pub mod config;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod operation;
pub mod payload;
pub mod result;
pub mod signing;
pub mod swap;
pub mod ton;
pub mod types;

#[cfg(test)]
mod testing;

pub use builders::{pre_image_hashes, sign, BuilderRegistry, ChainTransactionBuilder};
pub use config::KeysignConfig;
pub use error::{ErrorCode, KeysignError, KeysignResult};
pub use keys::{derive_public_key, DerivedPublicKey};
pub use operation::Operation;
pub use payload::KeysignPayload;
pub use result::{SignedTransactionResult, SignedTransactionType};
pub use signing::{KeysignResponse, SignatureMap};
pub use types::{Chain, ChainFamily, Coin, SignatureScheme, UtxoInfo, VaultKeys};
