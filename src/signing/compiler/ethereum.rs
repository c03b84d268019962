//! Ethereum transaction compilation

use crate::encoding::rlp;
use crate::signing::preimage::ethereum::{EthereumTxType, UnsignedEthereumTransaction};
use crate::utils::keccak256;

/// Compiled Ethereum transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEthereumTransaction {
    /// RLP-encoded signed transaction
    pub raw_tx: Vec<u8>,
    pub tx_hash: [u8; 32],
}

/// Combine an `r ‖ s ‖ recovery_id` signature with the unsigned transaction
pub fn compile_ethereum_transaction(
    tx: &UnsignedEthereumTransaction,
    rsv: &[u8; 65],
) -> CompiledEthereumTransaction {
    let r = rlp::encode_bytes(rlp::trim_be(&rsv[..32]));
    let s = rlp::encode_bytes(rlp::trim_be(&rsv[32..64]));
    let recovery_id = rsv[64];

    let mut items = tx.rlp_fields();
    let raw_tx = match tx.tx_type {
        EthereumTxType::Legacy => {
            // EIP-155: v = chain_id * 2 + 35 + recovery_id
            let v = tx.chain_id_u64() as u128 * 2 + 35 + recovery_id as u128;
            items.push(rlp::encode_u128(v));
            items.push(r);
            items.push(s);
            rlp::encode_list(&items)
        }
        EthereumTxType::FeeMarket => {
            items.push(rlp::encode_u64(recovery_id as u64));
            items.push(r);
            items.push(s);
            let mut typed = vec![0x02];
            typed.extend_from_slice(&rlp::encode_list(&items));
            typed
        }
    };

    let tx_hash = keccak256(&raw_tx);
    CompiledEthereumTransaction { raw_tx, tx_hash }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(tx_type: EthereumTxType) -> UnsignedEthereumTransaction {
        UnsignedEthereumTransaction {
            tx_type,
            chain_id: vec![1],
            nonce: 0,
            gas_price: 20_000_000_000,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            gas_limit: 21_000,
            to: vec![0x35; 20],
            value: 1,
            data: vec![],
            public_key: vec![],
        }
    }

    #[test]
    fn test_legacy_v_uses_eip155() {
        let mut rsv = [0x11u8; 65];
        rsv[64] = 1;
        let compiled = compile_ethereum_transaction(&tx(EthereumTxType::Legacy), &rsv);
        // v = 1 * 2 + 35 + 1 = 38, followed by r
        let needle = [0x26, 0xa0, 0x11];
        assert!(compiled.raw_tx.windows(3).any(|w| w == needle));
        assert_eq!(compiled.tx_hash, keccak256(&compiled.raw_tx));
    }

    #[test]
    fn test_typed_tx_starts_with_type_byte() {
        let rsv = [0x22u8; 65];
        let mut rsv = rsv;
        rsv[64] = 0;
        let compiled = compile_ethereum_transaction(&tx(EthereumTxType::FeeMarket), &rsv);
        assert_eq!(compiled.raw_tx[0], 0x02);
    }

    #[test]
    fn test_leading_zero_r_is_trimmed() {
        let mut rsv = [0x33u8; 65];
        rsv[0] = 0;
        rsv[64] = 0;
        let compiled = compile_ethereum_transaction(&tx(EthereumTxType::FeeMarket), &rsv);
        // 31-byte r gets a 0x9f header
        assert!(compiled.raw_tx.windows(2).any(|w| w == [0x9f, 0x33]));
    }
}
