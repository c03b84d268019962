//! Destination address parsing
//!
//! Every builder resolves `to_address` through this module before touching
//! any transaction field. A malformed address is a hard `RuntimeError`;
//! nothing here tries to repair input.

use bech32::{FromBase32, ToBase32, Variant};
use bitcoin::hashes::{hash160, Hash};
use std::str::FromStr;

use crate::error::{KeysignError, KeysignResult};
use crate::types::Chain;
use crate::utils::{blake2b_256, double_sha256, keccak256};

fn invalid(chain: Chain, address: &str, reason: impl std::fmt::Display) -> KeysignError {
    KeysignError::runtime(format!("invalid {} address {:?}: {}", chain, address, reason))
}

// =============================================================================
// EVM
// =============================================================================

/// Parse a `0x` address. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_evm_address(address: &str) -> KeysignResult<[u8; 20]> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| invalid(Chain::Ethereum, address, "missing 0x prefix"))?;
    if hex_part.len() != 40 {
        return Err(invalid(Chain::Ethereum, address, "expected 40 hex characters"));
    }
    let bytes = hex::decode(hex_part).map_err(|e| invalid(Chain::Ethereum, address, e))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);

    let mixed_case = hex_part.chars().any(|c| c.is_ascii_uppercase())
        && hex_part.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case && eip55_checksum(&out)[2..] != *hex_part {
        return Err(invalid(Chain::Ethereum, address, "bad EIP-55 checksum"));
    }
    Ok(out)
}

/// EIP-55 checksum encoding
pub fn eip55_checksum(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }
    result
}

pub fn evm_address_from_pubkey(key: &secp256k1::PublicKey) -> [u8; 20] {
    let uncompressed = key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

// =============================================================================
// UTXO family
// =============================================================================

/// Resolve a UTXO-chain address into its locking script
pub fn utxo_script_pubkey(chain: Chain, address: &str) -> KeysignResult<Vec<u8>> {
    let address = address.trim();
    match chain {
        Chain::Bitcoin => {
            let parsed = bitcoin::Address::from_str(address)
                .map_err(|e| invalid(chain, address, e))?
                .require_network(bitcoin::Network::Bitcoin)
                .map_err(|e| invalid(chain, address, e))?;
            Ok(parsed.script_pubkey().to_bytes())
        }
        Chain::Litecoin => {
            if address.to_lowercase().starts_with("ltc1") {
                segwit_script(chain, address, "ltc")
            } else {
                base58_script(chain, address, &[0x30], &[0x32, 0x05])
            }
        }
        Chain::BitcoinCash => {
            if address.starts_with('1') || address.starts_with('3') {
                base58_script(chain, address, &[0x00], &[0x05])
            } else {
                cashaddr_script(address)
            }
        }
        Chain::Dogecoin => base58_script(chain, address, &[0x1e], &[0x16]),
        Chain::Dash => base58_script(chain, address, &[0x4c], &[0x10]),
        Chain::Zcash => base58_script(chain, address, &[0x1c, 0xb8], &[0x1c, 0xbd]),
        other => Err(KeysignError::runtime(format!("{} is not a UTXO chain", other))),
    }
}

/// P2PKH locking script for a hash160
pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[0x76, 0xa9, 0x14]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[0xa9, 0x14]);
    script.extend_from_slice(hash);
    script.push(0x87);
    script
}

pub fn p2wpkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.extend_from_slice(&[0x00, 0x14]);
    script.extend_from_slice(hash);
    script
}

pub fn pubkey_hash160(pubkey: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(pubkey).to_byte_array()
}

fn base58check_decode(chain: Chain, address: &str) -> KeysignResult<Vec<u8>> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|e| invalid(chain, address, e))?;
    if raw.len() < 5 {
        return Err(invalid(chain, address, "too short"));
    }
    let (payload, checksum) = raw.split_at(raw.len() - 4);
    if double_sha256(payload)[..4] != *checksum {
        return Err(invalid(chain, address, "bad checksum"));
    }
    Ok(payload.to_vec())
}

fn base58check_encode(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&double_sha256(payload)[..4]);
    bs58::encode(data).into_string()
}

fn base58_script(
    chain: Chain,
    address: &str,
    p2pkh_version: &[u8],
    p2sh_versions: &[u8],
) -> KeysignResult<Vec<u8>> {
    let payload = base58check_decode(chain, address)?;
    let version_len = p2pkh_version.len();
    if payload.len() != version_len + 20 {
        return Err(invalid(chain, address, "wrong payload length"));
    }
    let (version, body) = payload.split_at(version_len);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(body);

    if version == p2pkh_version {
        return Ok(p2pkh_script(&hash));
    }
    // Multi-byte versions share their first byte between P2PKH and P2SH
    let p2sh_match = if version_len == 1 {
        p2sh_versions.contains(&version[0])
    } else {
        version == p2sh_versions
    };
    if p2sh_match {
        Ok(p2sh_script(&hash))
    } else {
        Err(invalid(chain, address, format!("unknown version {}", hex::encode(version))))
    }
}

fn segwit_script(chain: Chain, address: &str, expected_hrp: &str) -> KeysignResult<Vec<u8>> {
    let (hrp, data, variant) = bech32::decode(address).map_err(|e| invalid(chain, address, e))?;
    if hrp != expected_hrp {
        return Err(invalid(chain, address, format!("expected prefix {}", expected_hrp)));
    }
    let (version, program) = data
        .split_first()
        .ok_or_else(|| invalid(chain, address, "empty witness program"))?;
    let version = version.to_u8();
    let program = Vec::<u8>::from_base32(program).map_err(|e| invalid(chain, address, e))?;

    let expected_variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    if variant != expected_variant || version > 16 || program.len() < 2 || program.len() > 40 {
        return Err(invalid(chain, address, "malformed witness program"));
    }
    if version == 0 && program.len() != 20 && program.len() != 32 {
        return Err(invalid(chain, address, "v0 program must be 20 or 32 bytes"));
    }

    let mut script = Vec::with_capacity(program.len() + 2);
    script.push(if version == 0 { 0x00 } else { 0x50 + version });
    script.push(program.len() as u8);
    script.extend_from_slice(&program);
    Ok(script)
}

/// Sender address for a compressed secp256k1 key on a UTXO chain
pub fn utxo_address_from_pubkey(chain: Chain, pubkey: &[u8]) -> KeysignResult<String> {
    let hash = pubkey_hash160(pubkey);
    let with_version = |version: &[u8]| {
        let mut payload = version.to_vec();
        payload.extend_from_slice(&hash);
        base58check_encode(&payload)
    };
    match chain {
        Chain::Bitcoin | Chain::Litecoin => {
            let hrp = if chain == Chain::Bitcoin { "bc" } else { "ltc" };
            let mut data = vec![bech32::u5::try_from_u8(0)
                .map_err(|e| KeysignError::runtime(e.to_string()))?];
            data.extend(hash.to_base32());
            bech32::encode(hrp, data, Variant::Bech32)
                .map_err(|e| KeysignError::runtime(e.to_string()))
        }
        Chain::BitcoinCash => Ok(cashaddr_encode("bitcoincash", 0, &hash)),
        Chain::Dogecoin => Ok(with_version(&[0x1e])),
        Chain::Dash => Ok(with_version(&[0x4c])),
        Chain::Zcash => Ok(with_version(&[0x1c, 0xb8])),
        other => Err(KeysignError::runtime(format!("{} is not a UTXO chain", other))),
    }
}

// -----------------------------------------------------------------------------
// CashAddr
// -----------------------------------------------------------------------------

const CASHADDR_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

fn cashaddr_script(address: &str) -> KeysignResult<Vec<u8>> {
    let chain = Chain::BitcoinCash;
    let lower = address.to_lowercase();
    if lower != address && address.to_uppercase() != address {
        return Err(invalid(chain, address, "mixed case"));
    }
    let (prefix, body) = match lower.split_once(':') {
        Some((p, b)) => (p.to_string(), b.to_string()),
        None => ("bitcoincash".to_string(), lower.clone()),
    };
    if prefix != "bitcoincash" {
        return Err(invalid(chain, address, "expected bitcoincash prefix"));
    }

    let mut values = Vec::with_capacity(body.len());
    for c in body.bytes() {
        let v = CASHADDR_CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| invalid(chain, address, format!("bad character {:?}", c as char)))?;
        values.push(v as u8);
    }
    if values.len() < 8 {
        return Err(invalid(chain, address, "too short"));
    }

    let mut check = prefix_values(&prefix);
    check.extend_from_slice(&values);
    if polymod(&check) != 1 {
        return Err(invalid(chain, address, "bad checksum"));
    }

    let payload = convert_bits(&values[..values.len() - 8], 5, 8, false);
    if payload.len() != 21 {
        return Err(invalid(chain, address, "only 160-bit hashes are supported"));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    match payload[0] >> 3 {
        0 => Ok(p2pkh_script(&hash)),
        1 => Ok(p2sh_script(&hash)),
        other => Err(invalid(chain, address, format!("unknown type {}", other))),
    }
}

fn cashaddr_encode(prefix: &str, kind: u8, hash: &[u8; 20]) -> String {
    let mut payload = vec![kind << 3];
    payload.extend_from_slice(hash);
    let data = convert_bits(&payload, 8, 5, true);

    let mut values = prefix_values(prefix);
    values.extend_from_slice(&data);
    values.extend_from_slice(&[0u8; 8]);
    let checksum = polymod(&values) ^ 1;

    let mut out = format!("{}:", prefix);
    for v in data {
        out.push(CASHADDR_CHARSET[v as usize] as char);
    }
    for i in 0..8 {
        out.push(CASHADDR_CHARSET[((checksum >> (5 * (7 - i))) & 0x1f) as usize] as char);
    }
    out
}

fn prefix_values(prefix: &str) -> Vec<u8> {
    let mut values: Vec<u8> = prefix.bytes().map(|c| c & 0x1f).collect();
    values.push(0);
    values
}

fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut result = Vec::new();
    let max_value = (1u32 << to_bits) - 1;

    for &value in data {
        acc = (acc << from_bits) | value as u32;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }
    if pad && bits > 0 {
        result.push(((acc << (to_bits - bits)) & max_value) as u8);
    }
    result
}

fn polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for &v in values {
        let c0 = c >> 35;
        c = ((c & 0x07ffffffff) << 5) ^ v as u64;
        for (i, &generator) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= generator;
            }
        }
    }
    c
}

// =============================================================================
// Cosmos family
// =============================================================================

/// Bech32 account prefix of a Cosmos-SDK chain
pub fn cosmos_hrp(chain: Chain) -> Option<&'static str> {
    match chain {
        Chain::Gaia => Some("cosmos"),
        Chain::Kujira => Some("kujira"),
        Chain::Osmosis => Some("osmo"),
        Chain::Terra | Chain::TerraClassic => Some("terra"),
        Chain::Dydx => Some("dydx"),
        Chain::Noble => Some("noble"),
        Chain::Thorchain => Some("thor"),
        Chain::Mayachain => Some("maya"),
        _ => None,
    }
}

/// Decode a bech32 account, optionally pinning its prefix
pub fn parse_bech32_account(
    chain: Chain,
    address: &str,
    expected_hrp: Option<&str>,
) -> KeysignResult<Vec<u8>> {
    let (hrp, data, variant) =
        bech32::decode(address.trim()).map_err(|e| invalid(chain, address, e))?;
    if variant != Variant::Bech32 {
        return Err(invalid(chain, address, "expected bech32 checksum"));
    }
    if let Some(expected) = expected_hrp {
        if hrp != expected {
            return Err(invalid(chain, address, format!("expected prefix {}", expected)));
        }
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(chain, address, e))?;
    if bytes.len() != 20 && bytes.len() != 32 {
        return Err(invalid(chain, address, "account must be 20 or 32 bytes"));
    }
    Ok(bytes)
}

pub fn cosmos_address_from_pubkey(chain: Chain, pubkey: &[u8]) -> KeysignResult<String> {
    let hrp = cosmos_hrp(chain)
        .ok_or_else(|| KeysignError::runtime(format!("{} has no bech32 prefix", chain)))?;
    bech32::encode(hrp, pubkey_hash160(pubkey).to_base32(), Variant::Bech32)
        .map_err(|e| KeysignError::runtime(e.to_string()))
}

// =============================================================================
// Account-model chains
// =============================================================================

pub fn parse_solana_address(address: &str) -> KeysignResult<[u8; 32]> {
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| invalid(Chain::Solana, address, e))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(Chain::Solana, address, "expected 32 bytes"))
}

pub fn parse_sui_address(address: &str) -> KeysignResult<[u8; 32]> {
    let hex_part = address
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| invalid(Chain::Sui, address, "missing 0x prefix"))?;
    if hex_part.len() != 64 {
        return Err(invalid(Chain::Sui, address, "expected 64 hex characters"));
    }
    let bytes = hex::decode(hex_part).map_err(|e| invalid(Chain::Sui, address, e))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Ed25519 Sui address: blake2b-256 of the scheme flag and key
pub fn sui_address_from_pubkey(pubkey: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(33);
    data.push(0x00);
    data.extend_from_slice(pubkey);
    blake2b_256(&data)
}

/// Decode an SS58 address. Only the Polkadot relay-chain prefix (0) is accepted.
pub fn parse_ss58_address(address: &str) -> KeysignResult<[u8; 32]> {
    let chain = Chain::Polkadot;
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| invalid(chain, address, e))?;
    if bytes.len() != 35 {
        return Err(invalid(chain, address, "expected 35 decoded bytes"));
    }
    if bytes[0] != 0 {
        return Err(invalid(chain, address, format!("network prefix {} is not polkadot", bytes[0])));
    }
    if ss58_checksum(&bytes[..33]) != bytes[33..] {
        return Err(invalid(chain, address, "bad checksum"));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[1..33]);
    Ok(key)
}

pub fn ss58_address_from_pubkey(pubkey: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(35);
    data.push(0);
    data.extend_from_slice(pubkey);
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum);
    bs58::encode(data).into_string()
}

/// First two bytes of Blake2b-512 over `SS58PRE ‖ data`
fn ss58_checksum(data: &[u8]) -> [u8; 2] {
    use blake2::{Blake2b512, Digest};

    let mut hasher = Blake2b512::new();
    hasher.update(b"SS58PRE");
    hasher.update(data);
    let hash = hasher.finalize();
    [hash[0], hash[1]]
}

/// Classic XRPL address into its 20-byte account id
pub fn parse_ripple_address(address: &str) -> KeysignResult<[u8; 20]> {
    let chain = Chain::Ripple;
    let raw = bs58::decode(address.trim())
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| invalid(chain, address, e))?;
    if raw.len() != 25 || raw[0] != 0x00 {
        return Err(invalid(chain, address, "expected version 0 and 20-byte account"));
    }
    if double_sha256(&raw[..21])[..4] != raw[21..] {
        return Err(invalid(chain, address, "bad checksum"));
    }
    let mut account = [0u8; 20];
    account.copy_from_slice(&raw[1..21]);
    Ok(account)
}

pub fn ripple_address_from_pubkey(pubkey: &[u8]) -> String {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&pubkey_hash160(pubkey));
    payload.extend_from_slice(&double_sha256(&payload)[..4]);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

/// Tron base58check address into its 21-byte form (`0x41 ‖ hash`)
pub fn parse_tron_address(address: &str) -> KeysignResult<[u8; 21]> {
    let chain = Chain::Tron;
    let payload = base58check_decode(chain, address.trim())?;
    if payload.len() != 21 || payload[0] != 0x41 {
        return Err(invalid(chain, address, "expected 0x41 prefix and 20-byte hash"));
    }
    let mut out = [0u8; 21];
    out.copy_from_slice(&payload);
    Ok(out)
}

pub fn tron_address_from_pubkey(key: &secp256k1::PublicKey) -> String {
    let mut payload = vec![0x41];
    payload.extend_from_slice(&evm_address_from_pubkey(key));
    base58check_encode(&payload)
}

/// Shelley bech32 address bytes. Byron (base58) addresses are rejected.
pub fn parse_cardano_address(address: &str) -> KeysignResult<Vec<u8>> {
    let chain = Chain::Cardano;
    let trimmed = address.trim();
    if !trimmed.starts_with("addr1") {
        return Err(invalid(chain, address, "only Shelley mainnet addresses are supported"));
    }
    let (hrp, data, _) = bech32::decode(trimmed).map_err(|e| invalid(chain, address, e))?;
    if hrp != "addr" {
        return Err(invalid(chain, address, "expected addr prefix"));
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| invalid(chain, address, e))?;
    if bytes.len() != 57 && bytes.len() != 29 {
        return Err(invalid(chain, address, "expected base or enterprise address"));
    }
    Ok(bytes)
}

/// Enterprise (payment-only) address for an Ed25519 spending key
pub fn cardano_enterprise_address(spend_key: &[u8; 32]) -> KeysignResult<String> {
    use blake2::digest::consts::U28;
    use blake2::{Blake2b, Digest};

    let key_hash = Blake2b::<U28>::digest(spend_key);
    let mut bytes = vec![0x61];
    bytes.extend_from_slice(&key_hash);
    bech32::encode("addr", bytes.to_base32(), Variant::Bech32)
        .map_err(|e| KeysignError::runtime(e.to_string()))
}
