//! Shared helpers: logging and small hashing utilities

#[macro_use]
pub mod logging;

use sha2::{Digest, Sha256, Sha512};
use tiny_keccak::{Hasher, Keccak};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// First half of SHA-512
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// Blake2b with a 32-byte output
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    use blake2::digest::consts::U32;
    use blake2::Blake2b;

    Blake2b::<U32>::digest(data).into()
}

/// Decode hex with or without a `0x` prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = value.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
}

/// Fixed-size hex decode
pub fn decode_hex_array<const N: usize>(value: &str, field: &str) -> crate::KeysignResult<[u8; N]> {
    let bytes = decode_hex(value)?;
    bytes.as_slice().try_into().map_err(|_| {
        crate::KeysignError::runtime(format!(
            "{} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}
