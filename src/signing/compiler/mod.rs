//! Transaction Compiler
//!
//! Combines verified signatures with unsigned transactions into
//! broadcast-ready encodings.

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

pub use cardano::{compile_cardano_transaction, CompiledCardanoTransaction};
pub use cosmos::{compile_cosmos_transaction, CompiledCosmosTransaction};
pub use ethereum::{compile_ethereum_transaction, CompiledEthereumTransaction};
pub use polkadot::{compile_polkadot_transaction, CompiledPolkadotTransaction};
pub use ripple::{compile_ripple_transaction, CompiledRippleTransaction};
pub use solana::{compile_solana_transaction, CompiledSolanaTransaction};
pub use sui::{compile_sui_transaction, CompiledSuiTransaction};
pub use ton::{compile_ton_transaction, CompiledTonTransaction};
pub use tron::{compile_tron_transaction, CompiledTronTransaction};
pub use utxo::{compile_utxo_transaction, CompiledUtxoTransaction};
