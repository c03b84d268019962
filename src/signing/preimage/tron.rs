//! Tron Pre-Image Hashing
//!
//! The transaction id is SHA-256 of the protobuf `Transaction.raw`, and it is
//! also what gets signed.

use serde::{Deserialize, Serialize};

use crate::encoding::protobuf::ProtoWriter;
use crate::utils::sha256;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/protocol.";

/// Contract payloads used by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TronContract {
    Transfer {
        owner: Vec<u8>,
        to: Vec<u8>,
        amount: i64,
    },
    /// TRC10
    TransferAsset {
        asset_name: String,
        owner: Vec<u8>,
        to: Vec<u8>,
        amount: i64,
    },
    TriggerSmartContract {
        owner: Vec<u8>,
        contract: Vec<u8>,
        data: Vec<u8>,
    },
    FreezeBalanceV2 {
        owner: Vec<u8>,
        amount: i64,
        resource: i32,
    },
    UnfreezeBalanceV2 {
        owner: Vec<u8>,
        amount: i64,
        resource: i32,
    },
    DelegateResource {
        owner: Vec<u8>,
        receiver: Vec<u8>,
        amount: i64,
        resource: i32,
    },
    UnDelegateResource {
        owner: Vec<u8>,
        receiver: Vec<u8>,
        amount: i64,
        resource: i32,
    },
}

impl TronContract {
    /// `ContractType` enum value
    pub fn contract_type(&self) -> u64 {
        match self {
            TronContract::Transfer { .. } => 1,
            TronContract::TransferAsset { .. } => 2,
            TronContract::TriggerSmartContract { .. } => 31,
            TronContract::FreezeBalanceV2 { .. } => 54,
            TronContract::UnfreezeBalanceV2 { .. } => 55,
            TronContract::DelegateResource { .. } => 57,
            TronContract::UnDelegateResource { .. } => 58,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TronContract::Transfer { .. } => "TransferContract",
            TronContract::TransferAsset { .. } => "TransferAssetContract",
            TronContract::TriggerSmartContract { .. } => "TriggerSmartContract",
            TronContract::FreezeBalanceV2 { .. } => "FreezeBalanceV2Contract",
            TronContract::UnfreezeBalanceV2 { .. } => "UnfreezeBalanceV2Contract",
            TronContract::DelegateResource { .. } => "DelegateResourceContract",
            TronContract::UnDelegateResource { .. } => "UnDelegateResourceContract",
        }
    }

    fn encode_parameter(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        match self {
            TronContract::Transfer { owner, to, amount } => {
                w.bytes(1, owner).bytes(2, to).int64(3, *amount);
            }
            TronContract::TransferAsset { asset_name, owner, to, amount } => {
                w.string(1, asset_name).bytes(2, owner).bytes(3, to).int64(4, *amount);
            }
            TronContract::TriggerSmartContract { owner, contract, data } => {
                w.bytes(1, owner).bytes(2, contract).bytes(4, data);
            }
            TronContract::FreezeBalanceV2 { owner, amount, resource }
            | TronContract::UnfreezeBalanceV2 { owner, amount, resource } => {
                w.bytes(1, owner).int64(2, *amount).int64(3, *resource as i64);
            }
            TronContract::DelegateResource { owner, receiver, amount, resource }
            | TronContract::UnDelegateResource { owner, receiver, amount, resource } => {
                w.bytes(1, owner)
                    .int64(2, *resource as i64)
                    .int64(3, *amount)
                    .bytes(4, receiver);
            }
        }
        w.finish()
    }

    /// `Transaction.Contract`
    pub fn encode(&self) -> Vec<u8> {
        let type_url = format!("{}{}", TYPE_URL_PREFIX, self.type_name());
        ProtoWriter::new()
            .uint64(1, self.contract_type())
            .any(2, &type_url, &self.encode_parameter())
            .finish()
    }
}

/// Reference block the transaction is anchored to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TronBlockHeader {
    pub timestamp: i64,
    pub tx_trie_root: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub number: i64,
    pub witness_address: Vec<u8>,
    pub version: i32,
}

impl TronBlockHeader {
    /// `BlockHeader.raw`
    pub fn raw_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .int64(1, self.timestamp)
            .bytes(2, &self.tx_trie_root)
            .bytes(3, &self.parent_hash)
            .int64(7, self.number)
            .bytes(9, &self.witness_address)
            .int64(10, self.version as i64)
            .finish()
    }

    /// The block id embeds the number in its first 8 bytes, so bytes 8..16
    /// of the header hash identify the block
    pub fn ref_block_hash(&self) -> [u8; 8] {
        let hash = sha256(&self.raw_bytes());
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash[8..16]);
        out
    }

    pub fn ref_block_bytes(&self) -> [u8; 2] {
        let number = self.number.to_be_bytes();
        [number[6], number[7]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTronTransaction {
    pub block_header: TronBlockHeader,
    pub expiration: i64,
    pub timestamp: i64,
    pub fee_limit: i64,
    pub memo: Option<String>,
    pub contract: TronContract,
    /// Uncompressed secp256k1 key
    pub public_key: Vec<u8>,
}

impl UnsignedTronTransaction {
    /// `Transaction.raw`
    pub fn raw_bytes(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        w.bytes(1, &self.block_header.ref_block_bytes())
            .bytes(4, &self.block_header.ref_block_hash())
            .int64(8, self.expiration);
        if let Some(memo) = &self.memo {
            w.string(10, memo);
        }
        w.message(11, &self.contract.encode())
            .int64(14, self.timestamp)
            .int64(18, self.fee_limit);
        w.finish()
    }
}

pub fn get_tron_txid(tx: &UnsignedTronTransaction) -> [u8; 32] {
    sha256(&tx.raw_bytes())
}
