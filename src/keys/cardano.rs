//! Cardano extended verification key
//!
//! The signer expects the 128-byte layout `spend ‖ spend ‖ chain_code ‖ chain_code`.

use crate::error::{KeysignError, KeysignResult};

pub const EXTENDED_KEY_LEN: usize = 128;

/// Build the extended key, failing fast on a component that is not 32 bytes
pub fn extended_key(spend_key: &[u8], chain_code: &[u8]) -> KeysignResult<[u8; EXTENDED_KEY_LEN]> {
    if spend_key.len() != 32 {
        return Err(KeysignError::invalid_public_key(format!(
            "cardano spending key must be 32 bytes, got {}",
            spend_key.len()
        )));
    }
    if chain_code.len() != 32 {
        return Err(KeysignError::invalid_public_key(format!(
            "cardano chain code must be 32 bytes, got {}",
            chain_code.len()
        )));
    }

    let mut out = [0u8; EXTENDED_KEY_LEN];
    out[..32].copy_from_slice(spend_key);
    out[32..64].copy_from_slice(spend_key);
    out[64..96].copy_from_slice(chain_code);
    out[96..].copy_from_slice(chain_code);
    Ok(out)
}
