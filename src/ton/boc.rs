//! Bag-of-cells serialization
//!
//! Writes a single-root BOC without index or checksum:
//!
//! ```text
//! b5ee9c72 | flags:size_bytes | off_bytes | cells | roots=1 | absent=0
//!          | tot_cells_size | root index | cells...
//! ```

use thiserror::Error;

use super::cell::{Cell, CellBuilder};
use crate::error::KeysignError;

pub const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BocError {
    #[error("cell overflow: {bits} bits exceed 1023")]
    CellOverflow { bits: usize },

    #[error("cell already holds 4 references")]
    TooManyRefs,

    #[error("value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: u128, bits: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type BocResult<T> = Result<T, BocError>;

impl From<BocError> for KeysignError {
    fn from(e: BocError) -> Self {
        KeysignError::runtime(format!("ton: {}", e))
    }
}

/// Minimal number of bytes holding `value` (0 for 0)
fn byte_len(value: u128) -> usize {
    (128 - value.leading_zeros() as usize).div_ceil(8)
}

/// TL-B `VarUInteger n`: byte length in `len_bits` bits, then the value
pub fn encode_var_uint(builder: &mut CellBuilder, value: u128, len_bits: usize) -> BocResult<()> {
    let len = byte_len(value);
    if len >= 1 << len_bits {
        return Err(BocError::ValueTooLarge { value, bits: ((1 << len_bits) - 1) * 8 });
    }
    builder.store_uint(len as u128, len_bits)?;
    if len > 0 {
        builder.store_uint(value, len * 8)?;
    }
    Ok(())
}

/// `d1 ‖ d2 ‖ data ‖ ref indices`
pub fn encode_cell(cell: &Cell, ref_indices: &[usize], size_bytes: usize) -> Vec<u8> {
    let mut out = vec![cell.d1(), cell.d2()];
    out.extend_from_slice(&cell.padded_data());
    for idx in ref_indices {
        out.extend_from_slice(&be_bytes(*idx as u64, size_bytes));
    }
    out
}

fn be_bytes(value: u64, width: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - width..].to_vec()
}

/// Pre-order walk: every parent precedes its children
fn collect<'a>(cell: &'a Cell, out: &mut Vec<&'a Cell>, refs: &mut Vec<Vec<usize>>) -> usize {
    let index = out.len();
    out.push(cell);
    refs.push(Vec::new());
    for child in cell.refs() {
        let child_index = collect(child.as_ref(), out, refs);
        refs[index].push(child_index);
    }
    index
}

pub fn encode_boc(root: &Cell) -> Vec<u8> {
    let mut cells = Vec::new();
    let mut refs = Vec::new();
    collect(root, &mut cells, &mut refs);

    let size_bytes = byte_len(cells.len() as u128).max(1);
    let encoded: Vec<Vec<u8>> = cells
        .iter()
        .zip(&refs)
        .map(|(cell, r)| encode_cell(cell, r, size_bytes))
        .collect();
    let total: usize = encoded.iter().map(Vec::len).sum();
    let off_bytes = byte_len(total as u128).max(1);

    let mut out = BOC_MAGIC.to_vec();
    out.push(size_bytes as u8);
    out.push(off_bytes as u8);
    out.extend(be_bytes(cells.len() as u64, size_bytes));
    out.extend(be_bytes(1, size_bytes));
    out.extend(be_bytes(0, size_bytes));
    out.extend(be_bytes(total as u64, off_bytes));
    out.extend(be_bytes(0, size_bytes));
    for cell in encoded {
        out.extend(cell);
    }
    out
}

/// Snake-format text: bytes chained through the first reference of each cell
pub fn snake_text_cell(prefix: Option<u32>, text: &[u8]) -> BocResult<Cell> {
    let first_capacity = if prefix.is_some() { 123 } else { 127 };
    let (head, rest) = text.split_at(text.len().min(first_capacity));

    let mut tail: Option<Cell> = None;
    for chunk in rest.chunks(127).rev() {
        let mut b = CellBuilder::new();
        b.store_bytes(chunk)?;
        if let Some(next) = tail.take() {
            b.store_ref(next)?;
        }
        tail = Some(b.build());
    }

    let mut b = CellBuilder::new();
    if let Some(op) = prefix {
        b.store_uint(op as u128, 32)?;
    }
    b.store_bytes(head)?;
    if let Some(next) = tail {
        b.store_ref(next)?;
    }
    Ok(b.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_uint_lengths() {
        let mut b = CellBuilder::new();
        encode_var_uint(&mut b, 0, 4).unwrap();
        assert_eq!(b.build().bit_len(), 4);

        let mut b = CellBuilder::new();
        encode_var_uint(&mut b, 1_000_000_000, 4).unwrap();
        // 4 bytes: 0100 followed by 0x3b9aca00
        let cell = b.build();
        assert_eq!(cell.bit_len(), 36);
        assert_eq!(cell.padded_data(), vec![0x43, 0xb9, 0xac, 0xa0, 0x08]);
    }

    #[test]
    fn test_var_uint_rejects_overlong() {
        let mut b = CellBuilder::new();
        assert!(encode_var_uint(&mut b, 1 << 64, 3).is_err());
    }

    #[test]
    fn test_empty_cell_boc() {
        let boc = encode_boc(&CellBuilder::new().build());
        assert_eq!(hex::encode(boc), "b5ee9c72010101010002000000");
    }

    #[test]
    fn test_boc_with_reference() {
        let mut child = CellBuilder::new();
        child.store_uint(0xff, 8).unwrap();
        let mut root = CellBuilder::new();
        root.store_uint(0b1, 1).unwrap();
        root.store_ref(child.build()).unwrap();
        let boc = encode_boc(&root.build());

        // header: 2 cells, total size (2+1+1) + (2+1) = 7
        assert_eq!(&boc[..11], &[0xb5, 0xee, 0x9c, 0x72, 1, 1, 2, 1, 0, 7, 0]);
        // root: d1=1 d2=1 data=0b1100_0000 ref=1
        assert_eq!(&boc[11..15], &[0x01, 0x01, 0xc0, 0x01]);
        assert_eq!(&boc[15..], &[0x00, 0x02, 0xff]);
    }

    #[test]
    fn test_snake_text_chains_long_comments() {
        let text = vec![b'a'; 300];
        let cell = snake_text_cell(Some(0), &text).unwrap();
        assert_eq!(cell.bit_len(), 32 + 123 * 8);
        let second = &cell.refs()[0];
        assert_eq!(second.bit_len(), 127 * 8);
        assert_eq!(second.refs()[0].bit_len(), 50 * 8);
    }
}
