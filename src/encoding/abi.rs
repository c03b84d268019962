//! Minimal Solidity ABI call encoding
//!
//! Covers the calls the EVM builder emits: ERC-20 `transfer` and `approve`,
//! and the THORChain router's `depositWithExpiry`.

use crate::utils::keccak256;

/// `transfer(address,uint256)`
pub const ERC20_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `approve(address,uint256)`
pub const ERC20_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
/// `depositWithExpiry(address,address,uint256,string,uint256)`
pub const DEPOSIT_WITH_EXPIRY: [u8; 4] = [0x44, 0xbc, 0x93, 0x7b];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiToken {
    Address([u8; 20]),
    Uint(u128),
    String(String),
    Bytes(Vec<u8>),
}

impl AbiToken {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiToken::String(_) | AbiToken::Bytes(_))
    }

    fn encode_static(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        match self {
            AbiToken::Address(addr) => word[12..].copy_from_slice(addr),
            AbiToken::Uint(v) => word[16..].copy_from_slice(&v.to_be_bytes()),
            AbiToken::String(_) | AbiToken::Bytes(_) => {}
        }
        word
    }

    fn encode_tail(&self) -> Vec<u8> {
        let bytes = match self {
            AbiToken::String(s) => s.as_bytes(),
            AbiToken::Bytes(b) => b.as_slice(),
            _ => return Vec::new(),
        };
        let padded_len = bytes.len().div_ceil(32) * 32;
        let mut out = Vec::with_capacity(32 + padded_len);
        out.extend_from_slice(&uint_word(bytes.len() as u128));
        out.extend_from_slice(bytes);
        out.resize(32 + padded_len, 0);
        out
    }
}

fn uint_word(value: u128) -> [u8; 32] {
    AbiToken::Uint(value).encode_static()
}

/// Head/tail encoding of a parameter tuple
pub fn encode_params(tokens: &[AbiToken]) -> Vec<u8> {
    let head_size = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_size + tail.len()) as u128));
            tail.extend(token.encode_tail());
        } else {
            head.extend_from_slice(&token.encode_static());
        }
    }
    head.extend(tail);
    head
}

pub fn encode_call(selector: [u8; 4], tokens: &[AbiToken]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode_params(tokens));
    out
}

/// First four bytes of keccak256 of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
