//! Signature verification gate
//!
//! Every signature is checked against the derived key and the exact
//! pre-image before it reaches a compiler. A failure aborts the whole call.

use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1};

use super::signature::KeysignResponse;
use crate::error::{KeysignError, KeysignResult};

/// Verify an ECDSA response; when it carries a recovery id the recovered
/// key must also equal `key`. Returns the low-S signature.
pub fn verify_ecdsa(key: &PublicKey, pre_image: &[u8; 32], response: &KeysignResponse) -> KeysignResult<Signature> {
    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*pre_image);
    let signature = response.ecdsa()?;

    secp.verify_ecdsa(&message, &signature, key).map_err(|_| {
        KeysignError::verification_failed(format!(
            "ecdsa signature does not verify for pre-image {}",
            hex::encode(pre_image)
        ))
    })?;

    if response.has_recovery_id() {
        let recoverable = response.recoverable()?;
        if recoverable.to_standard() != signature {
            return Err(KeysignError::verification_failed(
                "DER and compact signatures disagree",
            ));
        }
        let recovered = secp.recover_ecdsa(&message, &recoverable).map_err(|_| {
            KeysignError::verification_failed("public key recovery failed")
        })?;
        if recovered != *key {
            return Err(KeysignError::verification_failed(format!(
                "recovery id {} recovers a different key",
                response.recovery_id
            )));
        }
    }
    Ok(signature)
}

/// Verify an Ed25519 response over `message`; returns the 64-byte signature
pub fn verify_ed25519(key: &VerifyingKey, message: &[u8], response: &KeysignResponse) -> KeysignResult<[u8; 64]> {
    let bytes = response.signature()?;
    let signature = Ed25519Signature::from_bytes(&bytes);
    key.verify(message, &signature).map_err(|_| {
        KeysignError::verification_failed(format!(
            "ed25519 signature does not verify for message {}",
            hex::encode(message)
        ))
    })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use ed25519_dalek::{Signer, SigningKey};
    use secp256k1::SecretKey;

    fn ecdsa_fixture() -> (PublicKey, [u8; 32], KeysignResponse) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x21; 32]).unwrap();
        let hash = [0x42u8; 32];
        let sig = secp.sign_ecdsa_recoverable(&Message::from_digest(hash), &sk);
        (sk.public_key(&secp), hash, KeysignResponse::from_recoverable(&hash, &sig))
    }

    #[test]
    fn test_valid_ecdsa_passes() {
        let (pk, hash, response) = ecdsa_fixture();
        assert!(verify_ecdsa(&pk, &hash, &response).is_ok());
    }

    #[test]
    fn test_flipped_r_bit_fails() {
        let (pk, hash, mut response) = ecdsa_fixture();
        let mut r = hex::decode(&response.r).unwrap();
        r[10] ^= 0x04;
        response.r = hex::encode(r);
        response.der_signature.clear();
        let err = verify_ecdsa(&pk, &hash, &response).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }

    #[test]
    fn test_flipped_der_bit_fails() {
        let (pk, hash, mut response) = ecdsa_fixture();
        let mut der = hex::decode(&response.der_signature).unwrap();
        let last = der.len() - 1;
        der[last] ^= 0x01;
        response.der_signature = hex::encode(der);
        let err = verify_ecdsa(&pk, &hash, &response).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }

    #[test]
    fn test_wrong_recovery_id_fails() {
        let (pk, hash, mut response) = ecdsa_fixture();
        let v = response.recovery_id().unwrap();
        response.recovery_id = format!("{:02x}", v ^ 1);
        let err = verify_ecdsa(&pk, &hash, &response).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }

    #[test]
    fn test_ed25519_gate() {
        let signing = SigningKey::from_bytes(&[5u8; 32]);
        let message = b"pre-image";
        let response = KeysignResponse::from_ed25519(message, &signing.sign(message));
        assert!(verify_ed25519(&signing.verifying_key(), message, &response).is_ok());

        let mut bad = response.clone();
        let mut s = hex::decode(&bad.s).unwrap();
        s[0] ^= 0x80;
        bad.s = hex::encode(s);
        let err = verify_ed25519(&signing.verifying_key(), message, &bad).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }
}
