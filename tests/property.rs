use ed25519_dalek::{Signer, SigningKey};
use keysign_core::address::ss58_address_from_pubkey;
use keysign_core::builders::cosmos::parse_ibc_timeout;
use keysign_core::payload::{send_max_guard, BlockchainSpecific};
use keysign_core::ton::cell::MAX_CELL_BITS;
use keysign_core::ton::{encode_var_uint, CellBuilder};
use keysign_core::utils::blake2b_256;
use keysign_core::{
    BuilderRegistry, Chain, Coin, ErrorCode, KeysignConfig, KeysignPayload, KeysignResponse,
    SignatureMap, VaultKeys,
};
use proptest::prelude::*;

fn signer() -> SigningKey {
    SigningKey::from_bytes(&[0x7e; 32])
}

fn vault() -> VaultKeys {
    VaultKeys {
        public_key_ecdsa: "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".into(),
        public_key_eddsa: hex::encode(signer().verifying_key().to_bytes()),
        hex_chain_code: hex::encode([0x3c; 32]),
    }
}

fn polkadot_payload(amount: u128, nonce: u64) -> KeysignPayload {
    let key = signer().verifying_key().to_bytes();
    KeysignPayload {
        coin: Coin::native(Chain::Polkadot, ss58_address_from_pubkey(&key), hex::encode(key)),
        to_address: ss58_address_from_pubkey(&[0x42; 32]),
        to_amount: amount,
        chain_specific: BlockchainSpecific::Polkadot {
            recent_block_hash: hex::encode([0x5d; 32]),
            nonce,
            current_block_number: 21_000_123,
            spec_version: 1_003_000,
            transaction_version: 26,
            genesis_hash: "91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3".into(),
        },
        utxos: vec![],
        memo: None,
        swap_payload: None,
        approve_payload: None,
        wasm_execute_contract_payload: None,
    }
}

/// Answer every pre-image the way the threshold signer would
fn sign_all(hashes: &[String]) -> SignatureMap {
    let key = signer();
    hashes
        .iter()
        .map(|hash| {
            let message = hex::decode(hash).expect("pre-image is hex");
            let signature = key.sign(&message);
            (hash.clone(), KeysignResponse::from_ed25519(&message, &signature))
        })
        .collect()
}

proptest! {
    #[test]
    fn send_max_requires_exact_full_balance(
        send_max in any::<bool>(),
        balance in 0u128..1_000_000,
        amount in 0u128..1_000_000,
    ) {
        let expected = send_max && balance > 0 && balance == amount;
        prop_assert_eq!(send_max_guard(send_max, balance, amount), expected);
        prop_assert_eq!(send_max_guard(send_max, balance, balance), send_max && balance > 0);
    }

    #[test]
    fn assemble_is_deterministic(amount in 1u128..1_000_000_000_000_000, nonce in 0u64..10_000) {
        let registry = BuilderRegistry::new(&KeysignConfig::default());
        let payload = polkadot_payload(amount, nonce);
        let hashes = registry.pre_image_hashes(&payload).expect("hashes");
        prop_assert_eq!(hashes.len(), 1);
        let signatures = sign_all(&hashes);

        let first = registry.sign(&payload, &vault(), &signatures).expect("first sign");
        let second = registry.sign(&payload, &vault(), &signatures).expect("second sign");
        prop_assert_eq!(&first, &second);

        let raw = hex::decode(&first.transaction().raw_transaction).expect("raw is hex");
        prop_assert_eq!(&first.transaction().transaction_hash, &hex::encode(blake2b_256(&raw)));
    }

    #[test]
    fn flipped_signature_bit_fails_verification(byte in 0usize..64, bit in 0u8..8) {
        let registry = BuilderRegistry::new(&KeysignConfig::default());
        let payload = polkadot_payload(10_000_000_000, 1);
        let hashes = registry.pre_image_hashes(&payload).expect("hashes");
        let mut signatures = sign_all(&hashes);

        let response = signatures.get_mut(&hashes[0]).expect("response");
        let (field, index) = if byte < 32 { (&mut response.r, byte) } else { (&mut response.s, byte - 32) };
        let mut bytes = hex::decode(field.as_str()).expect("component is hex");
        bytes[index] ^= 1 << bit;
        *field = hex::encode(bytes);

        let err = registry.sign(&payload, &vault(), &signatures).expect_err("tampered signature");
        prop_assert!(err.is_code(ErrorCode::SignatureVerificationFailed), "{}", err);
    }

    #[test]
    fn ibc_timeout_adds_offset(height in 1u64..=u64::MAX, timestamp in any::<u64>(), offset in 0u64..10_000) {
        let parsed = parse_ibc_timeout(&format!("{}_{}", height, timestamp), offset);
        match height.checked_add(offset) {
            Some(expected) => {
                let timeout = parsed.expect("valid timeout");
                prop_assert_eq!(timeout.revision_height, expected);
                prop_assert_eq!(timeout.timestamp_ns, timestamp);
            }
            None => {
                let err = parsed.expect_err("overflowing timeout height");
                prop_assert!(err.is_code(ErrorCode::RuntimeError), "{}", err);
            }
        }
    }

    #[test]
    fn ibc_timeout_near_max_height(gap in 0u64..10_000, offset in 0u64..10_000) {
        let height = u64::MAX - gap;
        let parsed = parse_ibc_timeout(&format!("{}_1", height), offset);
        prop_assert_eq!(parsed.is_ok(), offset <= gap);
    }

    #[test]
    fn ibc_timeout_rejects_zero_height(timestamp in any::<u64>()) {
        let raw = format!("0_{}", timestamp);
        prop_assert!(parse_ibc_timeout(&raw, 1000).is_err());
    }

    #[test]
    fn var_uint_prefixes_minimal_byte_length(value in 0u128..(1u128 << 120)) {
        let mut builder = CellBuilder::new();
        encode_var_uint(&mut builder, value, 4).expect("fits in 15 bytes");
        let byte_len = (128 - value.leading_zeros() as usize).div_ceil(8);
        prop_assert_eq!(MAX_CELL_BITS - builder.remaining_bits(), 4 + byte_len * 8);
    }

    #[test]
    fn cell_descriptors_follow_bit_length(bits in 0usize..=MAX_CELL_BITS) {
        let mut builder = CellBuilder::new();
        for i in 0..bits {
            builder.store_bit(i % 3 == 0).expect("within capacity");
        }
        let cell = builder.build();
        prop_assert_eq!(cell.bit_len(), bits);
        prop_assert_eq!(cell.d1(), 0);
        prop_assert_eq!(cell.d2() as usize, bits / 8 + bits.div_ceil(8));
        prop_assert_eq!(cell.d2() % 2 == 1, bits % 8 != 0);
        prop_assert_eq!(cell.padded_data().len(), bits.div_ceil(8));
    }
}
