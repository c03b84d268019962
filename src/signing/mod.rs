//! External Signature Handling
//!
//! 1. Compute pre-image hashes from unsigned transactions
//! 2. Look up and verify the threshold signer's responses
//! 3. Compile signatures into final signed transactions

pub mod compiler;
pub mod preimage;
pub mod signature;
pub mod verify;

pub use signature::{KeysignResponse, SignatureMap, SignatureProvider};
pub use verify::{verify_ecdsa, verify_ed25519};
