//! Non-hardened BIP32 public derivation (CKDpub)
//!
//! Vault keys are threshold keys: no party holds the private scalar, so
//! only public child derivation is possible. Hardened markers in a path are
//! ignored and the index is derived as a normal child.

use std::str::FromStr;

use bitcoin::bip32::{ChainCode, ChildNumber, DerivationPath, Fingerprint, Xpub};
use bitcoin::NetworkKind;
use secp256k1::{PublicKey, Secp256k1};

use crate::error::{KeysignError, KeysignResult};

/// Parse `m/44'/60'/0'/0/0` into a path of normal children
pub fn parse_path(path: &str) -> KeysignResult<DerivationPath> {
    let path = path.trim();
    let rest = match path.split_once('/') {
        Some(("m", rest)) | Some(("M", rest)) => rest,
        None if path == "m" || path == "M" => "",
        _ => {
            return Err(KeysignError::invalid_public_key(format!(
                "derivation path {:?} must start with m/",
                path
            )))
        }
    };

    if rest.is_empty() {
        return Ok(DerivationPath::master());
    }
    let parsed = DerivationPath::from_str(&format!("m/{}", rest)).map_err(|e| {
        KeysignError::invalid_public_key(format!("invalid derivation path {:?}: {}", path, e))
    })?;
    let normal: Vec<ChildNumber> = parsed
        .as_ref()
        .iter()
        .map(|child| match *child {
            ChildNumber::Hardened { index } => ChildNumber::Normal { index },
            normal => normal,
        })
        .collect();
    Ok(DerivationPath::from(normal))
}

/// Root extended public key of a vault
pub fn root_xpub(root: &PublicKey, chain_code: &[u8; 32]) -> Xpub {
    Xpub {
        network: NetworkKind::Main,
        depth: 0,
        parent_fingerprint: Fingerprint::default(),
        child_number: ChildNumber::Normal { index: 0 },
        public_key: *root,
        chain_code: ChainCode::from(*chain_code),
    }
}

/// Derive the child public key at `path` from a root key and chain code
pub fn derive_public_key(root: &PublicKey, chain_code: &[u8; 32], path: &str) -> KeysignResult<PublicKey> {
    let path = parse_path(path)?;
    let secp = Secp256k1::verification_only();
    let child = root_xpub(root, chain_code)
        .derive_pub(&secp, &path)
        .map_err(|e| KeysignError::invalid_public_key(format!("child derivation failed: {}", e)))?;
    Ok(child.public_key)
}
