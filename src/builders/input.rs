//! Serialized signing input
//!
//! The bytes a builder hands out are a version byte followed by the
//! bincode encoding of [`SigningInput`]. The same bytes come back at
//! assembly time, so the pre-image is always recomputed from exactly what
//! the signer was shown.

use serde::{Deserialize, Serialize};

use crate::error::{KeysignError, KeysignResult};
use crate::signing::preimage::{
    UnsignedCardanoTransaction, UnsignedCosmosTransaction, UnsignedEthereumTransaction,
    UnsignedPolkadotTransaction, UnsignedRippleTransaction, UnsignedSolanaTransaction,
    UnsignedSuiTransaction, UnsignedTonTransaction, UnsignedTronTransaction,
    UnsignedUtxoTransaction,
};
use crate::types::ChainFamily;

pub const INPUT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningInput {
    Ethereum(UnsignedEthereumTransaction),
    Utxo(UnsignedUtxoTransaction),
    Cosmos(UnsignedCosmosTransaction),
    Solana(UnsignedSolanaTransaction),
    Sui(UnsignedSuiTransaction),
    Polkadot(UnsignedPolkadotTransaction),
    Ripple(UnsignedRippleTransaction),
    Ton(UnsignedTonTransaction),
    Tron(UnsignedTronTransaction),
    Cardano(UnsignedCardanoTransaction),
}

impl SigningInput {
    /// Family that owns this input; THORChain and MayaChain share the Cosmos encoding
    pub fn family(&self) -> ChainFamily {
        match self {
            SigningInput::Ethereum(_) => ChainFamily::Evm,
            SigningInput::Utxo(_) => ChainFamily::Utxo,
            SigningInput::Cosmos(tx) => tx.chain.family(),
            SigningInput::Solana(_) => ChainFamily::Solana,
            SigningInput::Sui(_) => ChainFamily::Sui,
            SigningInput::Polkadot(_) => ChainFamily::Polkadot,
            SigningInput::Ripple(_) => ChainFamily::Ripple,
            SigningInput::Ton(_) => ChainFamily::Ton,
            SigningInput::Tron(_) => ChainFamily::Tron,
            SigningInput::Cardano(_) => ChainFamily::Cardano,
        }
    }

    pub fn encode(&self) -> KeysignResult<Vec<u8>> {
        let mut out = vec![INPUT_VERSION];
        out.extend(bincode::serialize(self)?);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> KeysignResult<Self> {
        match bytes.split_first() {
            Some((&INPUT_VERSION, rest)) => Ok(bincode::deserialize(rest)?),
            Some((version, _)) => Err(KeysignError::runtime(format!(
                "unsupported signing input version {}",
                version
            ))),
            None => Err(KeysignError::runtime("empty signing input")),
        }
    }
}

/// Decoders that fail with a chain mismatch on another family's input
macro_rules! input_accessor {
    ($name:ident, $variant:ident, $ty:ty, $family:expr) => {
        pub fn $name(bytes: &[u8]) -> KeysignResult<$ty> {
            match SigningInput::decode(bytes)? {
                SigningInput::$variant(tx) => Ok(tx),
                other => Err(KeysignError::chain_mismatch($family, other.family())),
            }
        }
    };
}

input_accessor!(decode_ethereum, Ethereum, UnsignedEthereumTransaction, ChainFamily::Evm);
input_accessor!(decode_utxo, Utxo, UnsignedUtxoTransaction, ChainFamily::Utxo);
input_accessor!(decode_cosmos, Cosmos, UnsignedCosmosTransaction, ChainFamily::Cosmos);
input_accessor!(decode_solana, Solana, UnsignedSolanaTransaction, ChainFamily::Solana);
input_accessor!(decode_sui, Sui, UnsignedSuiTransaction, ChainFamily::Sui);
input_accessor!(decode_polkadot, Polkadot, UnsignedPolkadotTransaction, ChainFamily::Polkadot);
input_accessor!(decode_ripple, Ripple, UnsignedRippleTransaction, ChainFamily::Ripple);
input_accessor!(decode_ton, Ton, UnsignedTonTransaction, ChainFamily::Ton);
input_accessor!(decode_tron, Tron, UnsignedTronTransaction, ChainFamily::Tron);
input_accessor!(decode_cardano, Cardano, UnsignedCardanoTransaction, ChainFamily::Cardano);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::preimage::cardano::{CardanoInput, CardanoOutput};

    fn cardano() -> SigningInput {
        SigningInput::Cardano(UnsignedCardanoTransaction {
            inputs: vec![CardanoInput { tx_hash: [1; 32], index: 0 }],
            outputs: vec![CardanoOutput { address: vec![0x61; 29], amount: 2_000_000 }],
            fee: 170_000,
            ttl: 1,
            public_key: vec![2; 32],
        })
    }

    #[test]
    fn test_decode_own_variant() {
        let bytes = cardano().encode().unwrap();
        assert_eq!(bytes[0], INPUT_VERSION);
        assert_eq!(decode_cardano(&bytes).unwrap().fee, 170_000);
    }

    #[test]
    fn test_wrong_family_is_chain_mismatch() {
        let bytes = cardano().encode().unwrap();
        let err = decode_tron(&bytes).unwrap_err();
        assert!(err.message.contains("tron"));
        assert!(err.message.contains("cardano"));
    }

    #[test]
    fn test_version_and_truncation() {
        let mut bytes = cardano().encode().unwrap();
        bytes[0] = 9;
        assert!(SigningInput::decode(&bytes).is_err());
        assert!(SigningInput::decode(&[]).is_err());
        let good = cardano().encode().unwrap();
        assert!(SigningInput::decode(&good[..good.len() - 3]).is_err());
    }
}
