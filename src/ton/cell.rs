//! TON cells
//!
//! A cell holds up to 1023 data bits and up to 4 references. Cells are
//! immutable once built; [`CellBuilder`] enforces both limits.

use std::sync::Arc;

use super::boc::{BocError, BocResult};
use super::address::TonAddress;
use crate::utils::sha256;

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Data bits, big-endian within each byte; trailing bits of the last byte are zero
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Refs descriptor: reference count, ordinary cell, level 0
    pub fn d1(&self) -> u8 {
        self.refs.len() as u8
    }

    /// Bits descriptor: `floor(bits / 8) + ceil(bits / 8)`
    pub fn d2(&self) -> u8 {
        (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8
    }

    /// Data bytes with the completion tag: a single 1 bit after the data
    /// when the length is not a multiple of 8
    pub fn padded_data(&self) -> Vec<u8> {
        let mut data = self.data[..self.bit_len.div_ceil(8)].to_vec();
        let rem = self.bit_len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 0x80 >> rem;
            }
        }
        data
    }

    pub fn depth(&self) -> u16 {
        self.refs.iter().map(|r| r.depth() + 1).max().unwrap_or(0)
    }

    /// Representation hash
    pub fn hash(&self) -> [u8; 32] {
        let mut repr = vec![self.d1(), self.d2()];
        repr.extend_from_slice(&self.padded_data());
        for r in &self.refs {
            repr.extend_from_slice(&r.depth().to_be_bytes());
        }
        for r in &self.refs {
            repr.extend_from_slice(&r.hash());
        }
        sha256(&repr)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn store_bit(&mut self, bit: bool) -> BocResult<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(BocError::CellOverflow { bits: self.bit_len + 1 });
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Unsigned integer in exactly `bits` bits
    pub fn store_uint(&mut self, value: u128, bits: usize) -> BocResult<&mut Self> {
        if bits < 128 && value >> bits != 0 {
            return Err(BocError::ValueTooLarge { value, bits });
        }
        if bits > self.remaining_bits() {
            return Err(BocError::CellOverflow { bits: self.bit_len + bits });
        }
        for i in (0..bits).rev() {
            let bit = i < 128 && (value >> i) & 1 == 1;
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> BocResult<&mut Self> {
        if bytes.len() * 8 > self.remaining_bits() {
            return Err(BocError::CellOverflow { bits: self.bit_len + bytes.len() * 8 });
        }
        for byte in bytes {
            self.store_uint(*byte as u128, 8)?;
        }
        Ok(self)
    }

    /// `VarUInteger 16`, the `Coins` type
    pub fn store_coins(&mut self, value: u128) -> BocResult<&mut Self> {
        super::boc::encode_var_uint(self, value, 4)?;
        Ok(self)
    }

    /// `MsgAddressInt` (`addr_std` without anycast), or `addr_none`
    pub fn store_address(&mut self, address: Option<&TonAddress>) -> BocResult<&mut Self> {
        match address {
            None => self.store_uint(0, 2),
            Some(addr) => {
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_uint(addr.workchain as u8 as u128, 8)?;
                self.store_bytes(&addr.hash)
            }
        }
    }

    pub fn store_ref(&mut self, cell: Cell) -> BocResult<&mut Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(BocError::TooManyRefs);
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    /// `Maybe ^Cell`
    pub fn store_maybe_ref(&mut self, cell: Option<Cell>) -> BocResult<&mut Self> {
        match cell {
            Some(c) => {
                self.store_bit(true)?;
                self.store_ref(c)
            }
            None => self.store_bit(false),
        }
    }

    pub fn build(&self) -> Cell {
        Cell {
            data: self.data.clone(),
            bit_len: self.bit_len,
            refs: self.refs.clone(),
        }
    }
}
