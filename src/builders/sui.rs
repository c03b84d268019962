//! Sui transaction builder
//!
//! Native SUI only: every SUI coin object the caller lists pays for gas,
//! the amount is split off the gas coin and sent to the recipient.

use super::input::{decode_sui, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{parse_sui_address, sui_address_from_pubkey};
use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{BlockchainSpecific, KeysignPayload, SuiCoin};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_sui_transaction;
use crate::signing::preimage::sui::SuiObjectRef;
use crate::signing::preimage::{get_sui_signing_digest, UnsignedSuiTransaction};
use crate::signing::{verify_ed25519, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::ChainFamily;

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

fn is_sui_coin(coin_type: &str) -> bool {
    coin_type == SUI_COIN_TYPE || coin_type.ends_with("::sui::SUI")
}

fn object_ref(coin: &SuiCoin) -> KeysignResult<SuiObjectRef> {
    let object_id = parse_sui_address(&coin.coin_object_id)?;
    let digest: [u8; 32] = bs58::decode(&coin.digest)
        .into_vec()
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| KeysignError::runtime(format!("invalid object digest {}", coin.digest)))?;
    Ok(SuiObjectRef { object_id, version: coin.version, digest })
}

pub struct SuiBuilder {
    config: KeysignConfig,
}

impl SuiBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl ChainTransactionBuilder for SuiBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Sui
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Sui)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let (gas_price, coins) = match &payload.chain_specific {
            BlockchainSpecific::Sui { reference_gas_price, coins } => (*reference_gas_price, coins),
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Sui, other.name())),
        };
        if !payload.coin.is_native_token {
            return Err(KeysignError::runtime(format!(
                "{} transfers are not supported on Sui, only SUI",
                payload.coin.ticker
            )));
        }

        let sender = parse_sui_address(&payload.coin.address)?;
        let public_key = payload.hex_public_key()?;
        let key: [u8; 32] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| KeysignError::invalid_public_key("Sui public key must be 32 bytes"))?;
        if sui_address_from_pubkey(&key) != sender {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the address of public key {}",
                payload.coin.address, payload.coin.hex_public_key
            )));
        }

        let gas_coins = coins
            .iter()
            .filter(|c| is_sui_coin(&c.coin_type))
            .map(object_ref)
            .collect::<KeysignResult<Vec<_>>>()?;
        if gas_coins.is_empty() {
            return Err(KeysignError::runtime("no SUI coin objects to pay with"));
        }
        let amount = u64::try_from(payload.to_amount)
            .map_err(|_| KeysignError::runtime(format!("amount {} exceeds u64", payload.to_amount)))?;

        log_debug!("sui", payload.coin.chain, "building pay transaction",
            coins = gas_coins.len(), gas_price = gas_price);

        SigningInput::Sui(UnsignedSuiTransaction {
            sender,
            recipient: parse_sui_address(&payload.to_address)?,
            amount,
            coins: gas_coins,
            gas_price,
            gas_budget: self.config.sui.gas_budget,
            public_key,
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_sui(unsigned)?;
        Ok(hex_all([get_sui_signing_digest(&tx)?]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_sui(unsigned)?;
        key.ensure_matches(&tx.public_key)?;
        let verifying_key = key.ed25519()?;

        let digest = get_sui_signing_digest(&tx)?;
        let response = SignatureProvider::new(signatures).get(&digest)?;
        let signature = verify_ed25519(verifying_key, &digest, response)?;

        let compiled = compile_sui_transaction(tx.transaction_data()?, &signature, &verifying_key.to_bytes());
        Ok(SignedTransactionResult::new(compiled.tx_bytes_base64(), compiled.digest())
            .with_signature(compiled.signature_base64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::TestVault;
    use crate::types::Chain;
    use base64::Engine;

    const RECIPIENT: &str = "0x7d20dcdb2bca4f508ea9613994683eb4e76e9c4ed371169677c1be02aaf0b58e";

    fn sui_coin(id_byte: u8, coin_type: &str) -> SuiCoin {
        SuiCoin {
            coin_type: coin_type.to_string(),
            coin_object_id: format!("0x{}", hex::encode([id_byte; 32])),
            version: 42,
            digest: bs58::encode([id_byte ^ 0xff; 32]).into_string(),
            balance: 5_000_000_000,
        }
    }

    fn payload(vault: &TestVault, coins: Vec<SuiCoin>) -> KeysignPayload {
        KeysignPayload {
            coin: vault.coin(Chain::Sui),
            to_address: RECIPIENT.to_string(),
            to_amount: 1_000_000_000,
            chain_specific: BlockchainSpecific::Sui { reference_gas_price: 750, coins },
            utxos: vec![],
            memo: None,
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn builder() -> SuiBuilder {
        SuiBuilder::new(&KeysignConfig::default())
    }

    #[test]
    fn test_pay_sui_signs_end_to_end() {
        let vault = TestVault::new();
        let p = payload(&vault, vec![sui_coin(1, SUI_COIN_TYPE), sui_coin(2, SUI_COIN_TYPE)]);
        let b = builder();

        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes[0].len(), 64);

        let signed = b.get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Sui, &hashes)).unwrap();
        let signature = base64::engine::general_purpose::STANDARD
            .decode(signed.signature.as_deref().unwrap())
            .unwrap();
        assert_eq!(signature.len(), 97);
        assert_eq!(signature[0], 0x00);
        assert_eq!(hex::encode(&signature[65..]), vault.coin(Chain::Sui).hex_public_key);
        assert_eq!(bs58::decode(&signed.transaction_hash).into_vec().unwrap().len(), 32);
    }

    #[test]
    fn test_only_sui_objects_pay_gas() {
        let vault = TestVault::new();
        let p = payload(
            &vault,
            vec![sui_coin(1, SUI_COIN_TYPE), sui_coin(2, "0xdba3::usdc::USDC")],
        );
        let tx = decode_sui(&builder().build_unsigned(&p).unwrap()).unwrap();
        assert_eq!(tx.coins.len(), 1);
        assert_eq!(tx.coins[0].object_id, [1; 32]);
        assert_eq!(tx.gas_budget, 3_000_000);
        assert_eq!(tx.gas_price, 750);
    }

    #[test]
    fn test_no_coins_rejected() {
        let vault = TestVault::new();
        let err = builder().build_unsigned(&payload(&vault, vec![])).unwrap_err();
        assert!(err.message.contains("coin objects"));
    }

    #[test]
    fn test_token_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, vec![sui_coin(1, SUI_COIN_TYPE)]);
        p.coin.is_native_token = false;
        p.coin.ticker = "USDC".into();
        assert!(builder().build_unsigned(&p).is_err());
    }

    #[test]
    fn test_bad_digest_rejected() {
        let vault = TestVault::new();
        let mut coin = sui_coin(1, SUI_COIN_TYPE);
        coin.digest = "not-base58!".into();
        let err = builder().build_unsigned(&payload(&vault, vec![coin])).unwrap_err();
        assert!(err.message.contains("digest"));
    }

    #[test]
    fn test_foreign_address_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, vec![sui_coin(1, SUI_COIN_TYPE)]);
        p.coin.address = RECIPIENT.to_string();
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.is_code(ErrorCode::InvalidPublicKey));
    }

    #[test]
    fn test_signature_over_wrong_digest_fails() {
        let vault = TestVault::new();
        let p = payload(&vault, vec![sui_coin(1, SUI_COIN_TYPE)]);
        let b = builder();
        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let forged = vault.sign(Chain::Sui, &[hex::encode([0u8; 32])]);
        let mut signatures = SignatureMap::new();
        signatures.insert(hashes[0].clone(), forged.values().next().unwrap().clone());

        let err = b.get_signed_transaction(&p, &vault.keys(), &signatures).unwrap_err();
        assert!(err.is_code(ErrorCode::SignatureVerificationFailed));
    }
}
