//! Unified error types for the keysign core
//!
//! Every builder, codec and verifier reports through [`KeysignError`] so a
//! caller (or the UI layer above it) can surface one message verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Chain;

/// Main error type for all keysign operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl KeysignError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach the chain and stage the failure happened in.
    ///
    /// Existing details are kept; the stage context is prepended.
    pub fn in_stage(mut self, chain: Chain, stage: Stage) -> Self {
        let context = format!("chain={} stage={}", chain, stage);
        self.details = Some(match self.details.take() {
            Some(existing) => format!("{}; {}", context, existing),
            None => context,
        });
        self
    }

    pub fn invalid_public_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPublicKey, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuntimeError, msg)
    }

    pub fn verification_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureVerificationFailed, msg)
    }

    /// Payload carries parameters for a different chain family
    pub fn chain_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::runtime(format!(
            "chain mismatch: expected {} parameters, got {}",
            expected, actual
        ))
    }

    pub fn is_code(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for KeysignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for KeysignError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Key material could not be decoded or derived
    InvalidPublicKey,
    /// Malformed input, chain mismatch, missing parameter, unsupported operation
    RuntimeError,
    /// A supplied signature did not verify against the derived key
    SignatureVerificationFailed,
}

/// Pipeline stage used for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Derive,
    Build,
    PreImage,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Derive => "derive",
            Stage::Build => "build",
            Stage::PreImage => "pre_image",
            Stage::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// Result type alias for keysign operations
pub type KeysignResult<T> = Result<T, KeysignError>;

/// Extension for attaching stage context to any keysign result
pub trait ResultExt<T> {
    fn stage(self, chain: Chain, stage: Stage) -> KeysignResult<T>;
}

impl<T> ResultExt<T> for KeysignResult<T> {
    fn stage(self, chain: Chain, stage: Stage) -> KeysignResult<T> {
        self.map_err(|e| e.in_stage(chain, stage))
    }
}

// Conversions from common error types

impl From<serde_json::Error> for KeysignError {
    fn from(e: serde_json::Error) -> Self {
        KeysignError::runtime(format!("JSON error: {}", e))
    }
}

impl From<hex::FromHexError> for KeysignError {
    fn from(e: hex::FromHexError) -> Self {
        KeysignError::runtime(format!("invalid hex: {}", e))
    }
}

impl From<bincode::Error> for KeysignError {
    fn from(e: bincode::Error) -> Self {
        KeysignError::runtime(format!("invalid signing input: {}", e))
    }
}

impl From<base64::DecodeError> for KeysignError {
    fn from(e: base64::DecodeError) -> Self {
        KeysignError::runtime(format!("invalid base64: {}", e))
    }
}

impl From<bs58::decode::Error> for KeysignError {
    fn from(e: bs58::decode::Error) -> Self {
        KeysignError::runtime(format!("invalid base58: {}", e))
    }
}

impl From<std::io::Error> for KeysignError {
    fn from(e: std::io::Error) -> Self {
        KeysignError::runtime(e.to_string())
    }
}

impl From<secp256k1::Error> for KeysignError {
    fn from(e: secp256k1::Error) -> Self {
        KeysignError::runtime(format!("Secp256k1 error: {}", e))
    }
}
