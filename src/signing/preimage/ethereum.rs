//! Ethereum Pre-Image Hashing
//!
//! Legacy (EIP-155) and EIP-1559 signing hashes.

use serde::{Deserialize, Serialize};

use crate::encoding::rlp;
use crate::utils::keccak256;

/// Ethereum transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EthereumTxType {
    /// Legacy transaction with EIP-155 replay protection
    Legacy,
    /// EIP-1559: Fee market transaction (type 0x02)
    FeeMarket,
}

/// Unsigned Ethereum transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEthereumTransaction {
    pub tx_type: EthereumTxType,
    /// Minimal big-endian chain id
    pub chain_id: Vec<u8>,
    pub nonce: u64,
    /// Gas price (Legacy)
    pub gas_price: u128,
    /// Max priority fee per gas (EIP-1559)
    pub max_priority_fee_per_gas: u128,
    /// Max fee per gas (EIP-1559)
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    /// Recipient or called contract
    pub to: Vec<u8>,
    /// Value in wei
    pub value: u128,
    /// Calldata
    pub data: Vec<u8>,
    /// Compressed sender key the transaction was built for
    pub public_key: Vec<u8>,
}

impl UnsignedEthereumTransaction {
    pub fn chain_id_u64(&self) -> u64 {
        rlp::trim_be(&self.chain_id)
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    /// Fields shared by the signing payload and the signed encoding
    pub(crate) fn rlp_fields(&self) -> Vec<Vec<u8>> {
        match self.tx_type {
            EthereumTxType::Legacy => vec![
                rlp::encode_u64(self.nonce),
                rlp::encode_u128(self.gas_price),
                rlp::encode_u64(self.gas_limit),
                rlp::encode_bytes(&self.to),
                rlp::encode_u128(self.value),
                rlp::encode_bytes(&self.data),
            ],
            EthereumTxType::FeeMarket => vec![
                rlp::encode_bytes(rlp::trim_be(&self.chain_id)),
                rlp::encode_u64(self.nonce),
                rlp::encode_u128(self.max_priority_fee_per_gas),
                rlp::encode_u128(self.max_fee_per_gas),
                rlp::encode_u64(self.gas_limit),
                rlp::encode_bytes(&self.to),
                rlp::encode_u128(self.value),
                rlp::encode_bytes(&self.data),
                // empty access list
                rlp::encode_list(&[]),
            ],
        }
    }
}

/// Bytes whose keccak256 is signed
pub fn signing_payload(tx: &UnsignedEthereumTransaction) -> Vec<u8> {
    let mut items = tx.rlp_fields();
    match tx.tx_type {
        EthereumTxType::Legacy => {
            // EIP-155: [.., chainId, 0, 0]
            items.push(rlp::encode_bytes(rlp::trim_be(&tx.chain_id)));
            items.push(rlp::encode_u64(0));
            items.push(rlp::encode_u64(0));
            rlp::encode_list(&items)
        }
        EthereumTxType::FeeMarket => {
            let mut typed = vec![0x02];
            typed.extend_from_slice(&rlp::encode_list(&items));
            typed
        }
    }
}

/// Get the signing hash for an Ethereum transaction
pub fn get_ethereum_signing_hash(tx: &UnsignedEthereumTransaction) -> [u8; 32] {
    keccak256(&signing_payload(tx))
}
