//! Public-key derivation
//!
//! Turns vault key material into the key object a chain signs with:
//! - ECDSA chains derive a non-hardened child along the coin's path
//!   (Tron keeps it uncompressed)
//! - EdDSA chains use the vault's raw Ed25519 key
//! - Cardano wraps it into a 128-byte extended key

pub mod bip32;
pub mod cardano;

use ed25519_dalek::VerifyingKey;
use secp256k1::PublicKey;

use crate::error::{KeysignError, KeysignResult};
use crate::types::{Chain, Coin, SignatureScheme, VaultKeys};
use crate::utils::decode_hex;

/// Chain-appropriate public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedPublicKey {
    Secp256k1 { key: PublicKey, uncompressed: bool },
    Ed25519(VerifyingKey),
    CardanoExtended {
        key: VerifyingKey,
        extended: [u8; cardano::EXTENDED_KEY_LEN],
    },
}

impl DerivedPublicKey {
    pub fn secp256k1(&self) -> KeysignResult<&PublicKey> {
        match self {
            DerivedPublicKey::Secp256k1 { key, .. } => Ok(key),
            _ => Err(KeysignError::invalid_public_key("expected a secp256k1 key")),
        }
    }

    /// The Ed25519 verifying key; for Cardano the spending key
    pub fn ed25519(&self) -> KeysignResult<&VerifyingKey> {
        match self {
            DerivedPublicKey::Ed25519(key) | DerivedPublicKey::CardanoExtended { key, .. } => Ok(key),
            _ => Err(KeysignError::invalid_public_key("expected an ed25519 key")),
        }
    }

    /// Encoded key as the chain consumes it
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DerivedPublicKey::Secp256k1 { key, uncompressed: true } => {
                key.serialize_uncompressed().to_vec()
            }
            DerivedPublicKey::Secp256k1 { key, .. } => key.serialize().to_vec(),
            DerivedPublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            DerivedPublicKey::CardanoExtended { extended, .. } => extended.to_vec(),
        }
    }

    pub fn hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Fail unless `embedded` (as recorded in a signing input) is this key
    pub fn ensure_matches(&self, embedded: &[u8]) -> KeysignResult<()> {
        let matches = match self {
            DerivedPublicKey::Secp256k1 { key, .. } => PublicKey::from_slice(embedded)
                .map(|other| other == *key)
                .unwrap_or(false),
            DerivedPublicKey::Ed25519(key) | DerivedPublicKey::CardanoExtended { key, .. } => {
                embedded == key.as_bytes()
            }
        };
        if matches {
            Ok(())
        } else {
            Err(KeysignError::invalid_public_key(format!(
                "derived key {} does not match the key the transaction was built for ({})",
                self.hex(),
                hex::encode(embedded)
            )))
        }
    }
}

/// Derive the public key `coin` signs with from vault key material
pub fn derive_public_key(coin: &Coin, vault: &VaultKeys) -> KeysignResult<DerivedPublicKey> {
    let chain = coin.chain;
    match chain.signature_scheme() {
        SignatureScheme::Ecdsa => {
            let path = coin.derivation_path().ok_or_else(|| {
                KeysignError::invalid_public_key(format!("{} has no derivation path", chain))
            })?;
            let key = derive_ecdsa(&vault.public_key_ecdsa, &vault.hex_chain_code, path)?;
            log_debug!("keys", chain, "derived child key", path = path, public_key = hex::encode(key.serialize()));
            Ok(DerivedPublicKey::Secp256k1 {
                key,
                uncompressed: chain == Chain::Tron,
            })
        }
        SignatureScheme::Eddsa => {
            let raw = decode_key_hex(&vault.public_key_eddsa, "eddsa public key")?;
            let key = ed25519_key(&raw)?;
            if chain == Chain::Cardano {
                let chain_code = decode_key_hex(&vault.hex_chain_code, "chain code")?;
                let extended = cardano::extended_key(&raw, &chain_code)?;
                Ok(DerivedPublicKey::CardanoExtended { key, extended })
            } else {
                Ok(DerivedPublicKey::Ed25519(key))
            }
        }
    }
}

/// Child secp256k1 key at `path` under the vault's root ECDSA key
pub fn derive_ecdsa(root_hex: &str, chain_code_hex: &str, path: &str) -> KeysignResult<PublicKey> {
    let root_bytes = decode_key_hex(root_hex, "ecdsa public key")?;
    let root = PublicKey::from_slice(&root_bytes)
        .map_err(|e| KeysignError::invalid_public_key(format!("ecdsa public key: {}", e)))?;
    let chain_code_bytes = decode_key_hex(chain_code_hex, "chain code")?;
    let chain_code: [u8; 32] = chain_code_bytes.as_slice().try_into().map_err(|_| {
        KeysignError::invalid_public_key(format!(
            "chain code must be 32 bytes, got {}",
            chain_code_bytes.len()
        ))
    })?;
    bip32::derive_public_key(&root, &chain_code, path)
}

pub fn ed25519_key(raw: &[u8]) -> KeysignResult<VerifyingKey> {
    let bytes: [u8; 32] = raw.try_into().map_err(|_| {
        KeysignError::invalid_public_key(format!("ed25519 key must be 32 bytes, got {}", raw.len()))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| KeysignError::invalid_public_key(format!("ed25519 key: {}", e)))
}

fn decode_key_hex(value: &str, what: &str) -> KeysignResult<Vec<u8>> {
    decode_hex(value)
        .map_err(|e| KeysignError::invalid_public_key(format!("{} is not hex: {}", what, e)))
}
