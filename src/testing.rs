//! Deterministic vault for tests
//!
//! Holds the private halves of a vault's keys and answers pre-image
//! requests the way the threshold signer does, so builders can be driven
//! end to end.

use bitcoin::bip32::{ChainCode, ChildNumber, Fingerprint, Xpriv};
use bitcoin::NetworkKind;
use ed25519_dalek::{Signer, SigningKey};
use secp256k1::{Message, Secp256k1, SecretKey};

use crate::address;
use crate::keys::{bip32, derive_public_key, DerivedPublicKey};
use crate::signing::{KeysignResponse, SignatureMap};
use crate::ton::TonAddress;
use crate::types::{Chain, ChainFamily, Coin, SignatureScheme, VaultKeys};

pub(crate) struct TestVault {
    root: SecretKey,
    chain_code: [u8; 32],
    eddsa: SigningKey,
}

impl TestVault {
    pub fn new() -> Self {
        Self {
            root: SecretKey::from_slice(&[0x5a; 32]).unwrap(),
            chain_code: [0x3c; 32],
            eddsa: SigningKey::from_bytes(&[0x7e; 32]),
        }
    }

    pub fn keys(&self) -> VaultKeys {
        let secp = Secp256k1::new();
        VaultKeys {
            public_key_ecdsa: hex::encode(self.root.public_key(&secp).serialize()),
            public_key_eddsa: hex::encode(self.eddsa.verifying_key().to_bytes()),
            hex_chain_code: hex::encode(self.chain_code),
        }
    }

    /// Private counterpart of CKDpub along `path`
    fn child_secret(&self, path: &str) -> SecretKey {
        let secp = Secp256k1::new();
        let root = Xpriv {
            network: NetworkKind::Main,
            depth: 0,
            parent_fingerprint: Fingerprint::default(),
            child_number: ChildNumber::Normal { index: 0 },
            private_key: self.root,
            chain_code: ChainCode::from(self.chain_code),
        };
        root.derive_priv(&secp, &bip32::parse_path(path).unwrap()).unwrap().private_key
    }

    pub fn derived(&self, chain: Chain) -> DerivedPublicKey {
        derive_public_key(&Coin::native(chain, "", ""), &self.keys()).unwrap()
    }

    /// Native coin on `chain` owned by this vault, with its real address
    pub fn coin(&self, chain: Chain) -> Coin {
        let key = self.derived(chain);
        let (address, public_key) = match key {
            DerivedPublicKey::Secp256k1 { key, .. } => {
                let compressed = key.serialize();
                let address = match chain.family() {
                    ChainFamily::Evm => {
                        address::eip55_checksum(&address::evm_address_from_pubkey(&key))
                    }
                    ChainFamily::Utxo => address::utxo_address_from_pubkey(chain, &compressed).unwrap(),
                    ChainFamily::Cosmos | ChainFamily::Thorchain => {
                        address::cosmos_address_from_pubkey(chain, &compressed).unwrap()
                    }
                    ChainFamily::Ripple => address::ripple_address_from_pubkey(&compressed),
                    ChainFamily::Tron => address::tron_address_from_pubkey(&key),
                    other => panic!("{} is not an ECDSA family", other),
                };
                (address, hex::encode(compressed))
            }
            DerivedPublicKey::Ed25519(key) | DerivedPublicKey::CardanoExtended { key, .. } => {
                let raw = key.to_bytes();
                let address = match chain {
                    Chain::Solana => bs58::encode(raw).into_string(),
                    Chain::Sui => format!("0x{}", hex::encode(address::sui_address_from_pubkey(&raw))),
                    Chain::Polkadot => address::ss58_address_from_pubkey(&raw),
                    Chain::Cardano => address::cardano_enterprise_address(&raw).unwrap(),
                    Chain::Ton => TonAddress::new(0, crate::utils::sha256(&raw)).to_user_friendly(),
                    other => panic!("{} is not an EdDSA chain", other),
                };
                (address, hex::encode(raw))
            }
        };
        Coin::native(chain, address, public_key)
    }

    /// Sign every requested pre-image with the key `chain` uses
    pub fn sign(&self, chain: Chain, pre_images: &[String]) -> SignatureMap {
        let mut signatures = SignatureMap::new();
        for hash_hex in pre_images {
            let message = hex::decode(hash_hex).unwrap();
            let response = match chain.signature_scheme() {
                SignatureScheme::Ecdsa => {
                    let secp = Secp256k1::new();
                    let secret = self.child_secret(chain.derivation_path().unwrap());
                    let digest: [u8; 32] = message.as_slice().try_into().unwrap();
                    let signature = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), &secret);
                    KeysignResponse::from_recoverable(&message, &signature)
                }
                SignatureScheme::Eddsa => {
                    KeysignResponse::from_ed25519(&message, &self.eddsa.sign(&message))
                }
            };
            signatures.insert(hash_hex.clone(), response);
        }
        signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_secret_matches_public_derivation() {
        let vault = TestVault::new();
        let secp = Secp256k1::new();
        let secret = vault.child_secret("m/44'/60'/0'/0/0");
        assert_eq!(
            DerivedPublicKey::Secp256k1 { key: secret.public_key(&secp), uncompressed: false },
            vault.derived(Chain::Ethereum)
        );
    }
}
