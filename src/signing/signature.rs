//! Threshold signer responses
//!
//! The signer returns one [`KeysignResponse`] per pre-image hash it was
//! asked to sign. Responses are looked up by the lowercase hex of that hash.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{KeysignError, KeysignResult};

/// Per-hash signature as reported by the threshold signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeysignResponse {
    /// Pre-image hash that was signed, hex
    #[serde(default)]
    pub msg: String,
    /// Big-endian r, hex
    pub r: String,
    /// Big-endian s, hex
    pub s: String,
    #[serde(default)]
    pub der_signature: String,
    /// ECDSA recovery id, hex (`00`/`01`, or `1b`/`1c`)
    #[serde(default)]
    pub recovery_id: String,
}

/// Signature map keyed by lowercase pre-image hex
pub type SignatureMap = BTreeMap<String, KeysignResponse>;

impl KeysignResponse {
    pub fn from_recoverable(msg: &[u8], signature: &RecoverableSignature) -> Self {
        let (recovery_id, compact) = signature.serialize_compact();
        let standard = signature.to_standard();
        Self {
            msg: hex::encode(msg),
            r: hex::encode(&compact[..32]),
            s: hex::encode(&compact[32..]),
            der_signature: hex::encode(standard.serialize_der()),
            recovery_id: format!("{:02x}", recovery_id.to_i32()),
        }
    }

    pub fn from_ed25519(msg: &[u8], signature: &ed25519_dalek::Signature) -> Self {
        let bytes = signature.to_bytes();
        Self {
            msg: hex::encode(msg),
            r: hex::encode(&bytes[..32]),
            s: hex::encode(&bytes[32..]),
            der_signature: String::new(),
            recovery_id: String::new(),
        }
    }

    /// Raw `r ‖ s`
    pub fn signature(&self) -> KeysignResult<[u8; 64]> {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&component(&self.r, "r")?);
        out[32..].copy_from_slice(&component(&self.s, "s")?);
        Ok(out)
    }

    pub fn has_recovery_id(&self) -> bool {
        !self.recovery_id.trim().is_empty()
    }

    pub fn recovery_id(&self) -> KeysignResult<u8> {
        let bytes = hex::decode(self.recovery_id.trim()).map_err(|e| {
            KeysignError::runtime(format!("recovery id {:?} is not hex: {}", self.recovery_id, e))
        })?;
        let value = match bytes.as_slice() {
            [v] => *v,
            _ => {
                return Err(KeysignError::runtime(format!(
                    "recovery id must be one byte, got {}",
                    bytes.len()
                )))
            }
        };
        let value = if value >= 27 { value - 27 } else { value };
        if value > 3 {
            return Err(KeysignError::verification_failed(format!(
                "recovery id {} out of range",
                value
            )));
        }
        Ok(value)
    }

    /// Low-S normalized ECDSA signature, from DER when present, else from r/s
    pub fn ecdsa(&self) -> KeysignResult<Signature> {
        let mut signature = if self.der_signature.trim().is_empty() {
            Signature::from_compact(&self.signature()?)
                .map_err(|e| KeysignError::verification_failed(format!("malformed signature: {}", e)))?
        } else {
            let der = hex::decode(self.der_signature.trim()).map_err(|e| {
                KeysignError::runtime(format!("DER signature is not hex: {}", e))
            })?;
            Signature::from_der(&der)
                .map_err(|e| KeysignError::verification_failed(format!("malformed DER signature: {}", e)))?
        };
        signature.normalize_s();
        Ok(signature)
    }

    /// `r ‖ s ‖ v` with low-S; `v` is flipped when normalization changed `s`
    pub fn signature_with_recovery_id(&self) -> KeysignResult<[u8; 65]> {
        let raw = self.signature()?;
        let parsed = Signature::from_compact(&raw)
            .map_err(|e| KeysignError::verification_failed(format!("malformed signature: {}", e)))?;
        let mut normalized = parsed;
        normalized.normalize_s();

        let mut v = self.recovery_id()?;
        if normalized != parsed {
            v ^= 1;
        }

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&normalized.serialize_compact());
        out[64] = v;
        Ok(out)
    }

    pub fn recoverable(&self) -> KeysignResult<RecoverableSignature> {
        let rsv = self.signature_with_recovery_id()?;
        let id = RecoveryId::from_i32(rsv[64] as i32)
            .map_err(|e| KeysignError::verification_failed(format!("recovery id: {}", e)))?;
        RecoverableSignature::from_compact(&rsv[..64], id)
            .map_err(|e| KeysignError::verification_failed(format!("malformed signature: {}", e)))
    }

    /// Low-S DER encoding
    pub fn der_signature(&self) -> KeysignResult<Vec<u8>> {
        Ok(self.ecdsa()?.serialize_der().to_vec())
    }
}

/// Left-pad a big-endian component to 32 bytes
fn component(value: &str, name: &str) -> KeysignResult<[u8; 32]> {
    let bytes = crate::utils::decode_hex(value)
        .map_err(|e| KeysignError::runtime(format!("signature {} is not hex: {}", name, e)))?;
    if bytes.len() > 32 {
        return Err(KeysignError::verification_failed(format!(
            "signature {} is {} bytes",
            name,
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

/// Lookup of signer responses by the pre-image they sign
pub struct SignatureProvider<'a> {
    signatures: &'a SignatureMap,
}

impl<'a> SignatureProvider<'a> {
    pub fn new(signatures: &'a SignatureMap) -> Self {
        Self { signatures }
    }

    /// Response for `pre_image`; a missing entry is a hard error
    pub fn get(&self, pre_image: &[u8]) -> KeysignResult<&'a KeysignResponse> {
        let key = hex::encode(pre_image);
        self.signatures
            .get(&key)
            .or_else(|| {
                self.signatures
                    .iter()
                    .find(|(k, _)| k.trim_start_matches("0x").eq_ignore_ascii_case(&key))
                    .map(|(_, v)| v)
            })
            .ok_or_else(|| {
                KeysignError::runtime(format!("no signature for pre-image hash {}", key))
            })
    }
}
