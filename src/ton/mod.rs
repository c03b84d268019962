//! TON cells, bag-of-cells serialization and addresses

pub mod address;
pub mod boc;
pub mod cell;

pub use address::TonAddress;
pub use boc::{encode_boc, encode_cell, encode_var_uint, BocError, BocResult};
pub use cell::{Cell, CellBuilder};
