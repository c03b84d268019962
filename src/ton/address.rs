//! TON address representation
//!
//! User-friendly form: `flags ‖ workchain ‖ hash ‖ crc16`, base64 (URL-safe
//! or standard). Raw form: `<workchain>:<hex hash>`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::boc::{BocError, BocResult};

pub const BASE_WORKCHAIN: i32 = 0;
pub const MASTER_WORKCHAIN: i32 = -1;

const FLAG_BOUNCEABLE: u8 = 0x11;
const FLAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TESTNET: u8 = 0x80;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash: [u8; 32],
    pub bounceable: bool,
    pub testnet: bool,
}

impl TonAddress {
    pub fn new(workchain: i32, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: true,
            testnet: false,
        }
    }

    /// Parse user-friendly or raw form
    pub fn parse(s: &str) -> BocResult<Self> {
        let s = s.trim();
        if s.contains(':') {
            return Self::parse_raw(s);
        }
        if s.len() != 48 {
            return Err(BocError::InvalidAddress(format!(
                "expected 48 characters, got {}",
                s.len()
            )));
        }

        let bytes = if s.contains('-') || s.contains('_') {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| BocError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 36 {
            return Err(BocError::InvalidAddress("decoded length is not 36".to_string()));
        }

        let crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc != crc16_ccitt(&bytes[..34]) {
            return Err(BocError::InvalidAddress("checksum mismatch".to_string()));
        }

        let flags = bytes[0];
        let bounceable = match flags & !FLAG_TESTNET {
            FLAG_BOUNCEABLE => true,
            FLAG_NON_BOUNCEABLE => false,
            other => {
                return Err(BocError::InvalidAddress(format!("unknown flags 0x{:02x}", other)))
            }
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self {
            workchain: bytes[1] as i8 as i32,
            hash,
            bounceable,
            testnet: flags & FLAG_TESTNET != 0,
        })
    }

    fn parse_raw(s: &str) -> BocResult<Self> {
        let (wc, hash_hex) = s
            .split_once(':')
            .ok_or_else(|| BocError::InvalidAddress(s.to_string()))?;
        let workchain: i32 = wc
            .parse()
            .map_err(|_| BocError::InvalidAddress(format!("workchain {:?}", wc)))?;
        let hash: [u8; 32] = hex::decode(hash_hex)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| BocError::InvalidAddress(format!("hash {:?}", hash_hex)))?;
        Ok(Self::new(workchain, hash))
    }

    pub fn with_bounceable(mut self, bounceable: bool) -> Self {
        self.bounceable = bounceable;
        self
    }

    /// URL-safe user-friendly form
    pub fn to_user_friendly(&self) -> String {
        let mut data = Vec::with_capacity(36);
        let flags = if self.bounceable { FLAG_BOUNCEABLE } else { FLAG_NON_BOUNCEABLE }
            | if self.testnet { FLAG_TESTNET } else { 0 };
        data.push(flags);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash);
        let crc = crc16_ccitt(&data);
        data.extend_from_slice(&crc.to_be_bytes());
        URL_SAFE.encode(&data)
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_friendly())
    }
}

/// CRC16-CCITT (XModem)
fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
