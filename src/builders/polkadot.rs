//! Polkadot transaction builder
//!
//! Balance transfers on the relay chain. `transfer_keep_alive` is used
//! unless the whole balance leaves the account; a memo wraps the transfer
//! and a `remark_with_event` in `utility.batch_all`.

use super::input::{decode_polkadot, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{parse_ss58_address, ss58_address_from_pubkey};
use crate::config::{KeysignConfig, PolkadotConfig};
use crate::encoding::scale::{compact_encode, encode_bytes};
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_polkadot_transaction;
use crate::signing::preimage::{get_polkadot_signing_payload, UnsignedPolkadotTransaction};
use crate::signing::{verify_ed25519, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::ChainFamily;
use crate::utils::decode_hex_array;

/// `MultiAddress::Id`
const MULTI_ADDRESS_ID: u8 = 0x00;

/// `Balances` transfer call
pub fn transfer_call(call_index: [u8; 2], destination: &[u8; 32], value: u128) -> Vec<u8> {
    let mut call = call_index.to_vec();
    call.push(MULTI_ADDRESS_ID);
    call.extend_from_slice(destination);
    call.extend_from_slice(&compact_encode(value));
    call
}

/// `utility.batch_all([transfer, system.remark_with_event(memo)])`
fn with_remark(config: &PolkadotConfig, transfer: Vec<u8>, memo: &str) -> Vec<u8> {
    let mut remark = config.remark_with_event.to_vec();
    remark.extend_from_slice(&encode_bytes(memo.as_bytes()));

    let mut call = config.batch_all.to_vec();
    call.extend_from_slice(&compact_encode(2));
    call.extend_from_slice(&transfer);
    call.extend_from_slice(&remark);
    call
}

pub struct PolkadotBuilder {
    config: KeysignConfig,
}

impl PolkadotBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Pick the transfer call for the balance left behind
    fn call_index(&self, raw_balance: u128, amount: u128) -> KeysignResult<[u8; 2]> {
        let config = &self.config.polkadot;
        if raw_balance == 0 {
            return Ok(config.transfer_keep_alive);
        }
        match raw_balance.checked_sub(amount) {
            Some(0) => Ok(config.transfer_allow_death),
            Some(remaining) if remaining < config.existential_deposit => Err(KeysignError::runtime(format!(
                "transfer would leave {} planck, below the existential deposit of {}",
                remaining, config.existential_deposit
            ))),
            Some(_) => Ok(config.transfer_keep_alive),
            None => Err(KeysignError::runtime(format!(
                "amount {} exceeds balance {}",
                amount, raw_balance
            ))),
        }
    }
}

impl ChainTransactionBuilder for PolkadotBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Polkadot
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Polkadot)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let (block_hash, nonce, current_block, spec_version, transaction_version, genesis_hash) =
            match &payload.chain_specific {
                BlockchainSpecific::Polkadot {
                    recent_block_hash,
                    nonce,
                    current_block_number,
                    spec_version,
                    transaction_version,
                    genesis_hash,
                } => (
                    decode_hex_array::<32>(recent_block_hash, "recent block hash")?,
                    *nonce,
                    *current_block_number,
                    *spec_version,
                    *transaction_version,
                    decode_hex_array::<32>(genesis_hash, "genesis hash")?,
                ),
                other => return Err(KeysignError::chain_mismatch(ChainFamily::Polkadot, other.name())),
            };

        let public_key = payload.hex_public_key()?;
        let key: [u8; 32] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| KeysignError::invalid_public_key("Polkadot public key must be 32 bytes"))?;
        if parse_ss58_address(&payload.coin.address)? != key {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the address of public key {}, expected {}",
                payload.coin.address,
                payload.coin.hex_public_key,
                ss58_address_from_pubkey(&key)
            )));
        }

        let destination = parse_ss58_address(&payload.to_address)?;
        let call_index = self.call_index(payload.coin.raw_balance, payload.to_amount)?;
        let transfer = transfer_call(call_index, &destination, payload.to_amount);
        let call = match payload.memo() {
            Some(memo) => with_remark(&self.config.polkadot, transfer, memo),
            None => transfer,
        };
        log_debug!("polkadot", payload.coin.chain, "building transfer",
            call_index = hex::encode(call_index), nonce = nonce, block = current_block);

        SigningInput::Polkadot(UnsignedPolkadotTransaction {
            call,
            current_block,
            era_period: self.config.polkadot.era_period,
            nonce,
            tip: 0,
            spec_version,
            transaction_version,
            genesis_hash,
            block_hash,
            public_key,
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_polkadot(unsigned)?;
        Ok(hex_all([get_polkadot_signing_payload(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_polkadot(unsigned)?;
        key.ensure_matches(&tx.public_key)?;
        let verifying_key = key.ed25519()?;

        let pre_image = get_polkadot_signing_payload(&tx);
        let response = SignatureProvider::new(signatures).get(&pre_image)?;
        let signature = verify_ed25519(verifying_key, &pre_image, response)?;

        let compiled = compile_polkadot_transaction(&tx, &verifying_key.to_bytes(), &signature);
        Ok(SignedTransactionResult::new(hex::encode(&compiled.extrinsic), hex::encode(compiled.hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::TestVault;
    use crate::types::Chain;
    use crate::utils::blake2b_256;

    const GENESIS: &str = "91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";
    const BLOCK_HASH: &str = "0x5d2143bb808626d63ad7e1cda70fa8697059d670a992e82cd440fbb95ea40351";

    fn recipient() -> String {
        ss58_address_from_pubkey(&[0x42; 32])
    }

    fn payload(vault: &TestVault, raw_balance: u128, amount: u128) -> KeysignPayload {
        let mut coin = vault.coin(Chain::Polkadot);
        coin.raw_balance = raw_balance;
        KeysignPayload {
            coin,
            to_address: recipient(),
            to_amount: amount,
            chain_specific: BlockchainSpecific::Polkadot {
                recent_block_hash: BLOCK_HASH.to_string(),
                nonce: 4,
                current_block_number: 21_000_123,
                spec_version: 1_003_000,
                transaction_version: 26,
                genesis_hash: GENESIS.to_string(),
            },
            utxos: vec![],
            memo: None,
            swap_payload: None,
            approve_payload: None,
            wasm_execute_contract_payload: None,
        }
    }

    fn builder() -> PolkadotBuilder {
        PolkadotBuilder::new(&KeysignConfig::default())
    }

    fn unsigned(p: &KeysignPayload) -> UnsignedPolkadotTransaction {
        decode_polkadot(&builder().build_unsigned(p).unwrap()).unwrap()
    }

    #[test]
    fn test_transfer_signs_end_to_end() {
        let vault = TestVault::new();
        let p = payload(&vault, 50_000_000_000, 10_000_000_000);
        let b = builder();

        let hashes = b.get_pre_signed_image_hash(&p).unwrap();
        let signed = b.get_signed_transaction(&p, &vault.keys(), &vault.sign(Chain::Polkadot, &hashes)).unwrap();

        let extrinsic = hex::decode(&signed.raw_transaction).unwrap();
        assert_eq!(signed.transaction_hash, hex::encode(blake2b_256(&extrinsic)));
        // compact length, then the signed v4 marker and signer id
        assert_eq!(&extrinsic[2..4], &[0x84, 0x00]);
        assert_eq!(hex::encode(&extrinsic[4..36]), vault.coin(Chain::Polkadot).hex_public_key);
    }

    #[test]
    fn test_keep_alive_for_partial_send() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, 50_000_000_000, 10_000_000_000));
        assert_eq!(&tx.call[..3], &[5, 3, MULTI_ADDRESS_ID]);
        assert_eq!(&tx.call[3..35], &[0x42; 32]);
        assert_eq!(&tx.call[35..], &compact_encode(10_000_000_000)[..]);
        assert_eq!(tx.era_period, 64);
    }

    #[test]
    fn test_allow_death_for_full_balance() {
        let vault = TestVault::new();
        let tx = unsigned(&payload(&vault, 20_000_000_000, 20_000_000_000));
        assert_eq!(&tx.call[..2], &[5, 0]);
    }

    #[test]
    fn test_dust_remainder_rejected() {
        let vault = TestVault::new();
        let err = builder()
            .build_unsigned(&payload(&vault, 20_000_000_000, 19_000_000_000))
            .unwrap_err();
        assert!(err.message.contains("existential deposit"));
    }

    #[test]
    fn test_memo_batches_remark() {
        let vault = TestVault::new();
        let mut p = payload(&vault, 0, 10_000_000_000);
        p.memo = Some("invoice 7".into());
        let tx = unsigned(&p);
        // batch_all with two calls
        assert_eq!(&tx.call[..3], &[26, 2, 0x08]);
        let mut remark = vec![0, 7];
        remark.extend_from_slice(&encode_bytes(b"invoice 7"));
        assert!(tx.call.ends_with(&remark));
    }

    #[test]
    fn test_bad_genesis_hash_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, 0, 1);
        if let BlockchainSpecific::Polkadot { genesis_hash, .. } = &mut p.chain_specific {
            *genesis_hash = "91b1".into();
        }
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.message.contains("genesis hash"));
    }

    #[test]
    fn test_foreign_sender_rejected() {
        let vault = TestVault::new();
        let mut p = payload(&vault, 0, 1);
        p.coin.address = recipient();
        let err = builder().build_unsigned(&p).unwrap_err();
        assert!(err.is_code(ErrorCode::InvalidPublicKey));
    }

    #[test]
    fn test_assemble_with_another_key_rejected() {
        let vault = TestVault::new();
        let p = payload(&vault, 0, 1);
        let b = builder();
        let unsigned = b.get_pre_signed_input_data(&p).unwrap();
        let hashes = b.pre_image_hashes(&unsigned).unwrap();
        let other = ed25519_dalek::SigningKey::from_bytes(&[0x11; 32]).verifying_key();

        let err = b
            .assemble(&unsigned, &vault.sign(Chain::Polkadot, &hashes), &DerivedPublicKey::Ed25519(other))
            .unwrap_err();
        assert!(err.is_code(ErrorCode::InvalidPublicKey));
    }
}
