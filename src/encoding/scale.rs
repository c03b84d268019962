//! SCALE codec helpers for Substrate extrinsics

/// Compact (variable-width) integer
pub fn compact_encode(value: u128) -> Vec<u8> {
    if value < 0x40 {
        vec![(value << 2) as u8]
    } else if value < 0x4000 {
        let v = (value << 2) | 0x01;
        (v as u16).to_le_bytes().to_vec()
    } else if value < 0x4000_0000 {
        let v = (value << 2) | 0x02;
        (v as u32).to_le_bytes().to_vec()
    } else {
        // big integer mode
        let bytes_needed = (128 - value.leading_zeros()).div_ceil(8);
        let mut result = vec![(((bytes_needed - 4) << 2) | 0x03) as u8];
        for i in 0..bytes_needed {
            result.push((value >> (8 * i)) as u8);
        }
        result
    }
}

/// Compact length prefix followed by the bytes
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = compact_encode(data.len() as u128);
    out.extend_from_slice(data);
    out
}

/// Transaction mortality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrinsicEra {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

impl ExtrinsicEra {
    /// Mortal era starting at `current_block`
    pub fn mortal(current_block: u64, period: u64) -> Self {
        let period = period.next_power_of_two().clamp(4, 65536);
        let phase = current_block % period;
        Self::Mortal { period, phase }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Immortal => vec![0x00],
            Self::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                let quantized_phase = phase / quantize_factor * quantize_factor;
                let period_log2 = period.trailing_zeros() as u16;
                let encoded = ((quantized_phase / quantize_factor) as u16) << 4
                    | (period_log2 - 1).clamp(1, 15);
                encoded.to_le_bytes().to_vec()
            }
        }
    }
}
