//! Hand-written wire codecs shared by the chain builders

pub mod abi;
pub mod bcs;
pub mod cbor;
pub mod protobuf;
pub mod rlp;
pub mod scale;
pub mod xrpl;
