//! Chain transaction builders
//!
//! One [`ChainTransactionBuilder`] per chain family turns a
//! [`KeysignPayload`] into unsigned signing input, reports the pre-image
//! hashes the threshold signer must sign, and assembles verified
//! signatures into a broadcast-ready transaction.
//!
//! ```text
//! payload ──build_unsigned──▶ input bytes ──pre_image_hashes──▶ [hex]
//!                                 │                               │ (signer)
//!                                 └──────────assemble◀────── SignatureMap
//! ```
//!
//! [`BuilderRegistry`] maps every chain to its builder once; callers go
//! through the registry so swap and approve payloads are routed the same
//! way for every chain.

pub mod cardano;
pub mod cosmos;
pub mod evm;
pub mod input;
pub mod polkadot;
pub mod ripple;
pub mod solana;
pub mod sui;
pub mod ton;
pub mod tron;
pub mod utxo;

use std::sync::OnceLock;

use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult, ResultExt, Stage};
use crate::keys::{derive_public_key, DerivedPublicKey};
use crate::payload::KeysignPayload;
use crate::result::{SignedTransactionResult, SignedTransactionType};
use crate::signing::SignatureMap;
use crate::types::{Chain, ChainFamily, VaultKeys};

pub use cardano::CardanoBuilder;
pub use cosmos::CosmosBuilder;
pub use evm::EvmBuilder;
pub use input::SigningInput;
pub use polkadot::PolkadotBuilder;
pub use ripple::RippleBuilder;
pub use solana::SolanaBuilder;
pub use sui::SuiBuilder;
pub use ton::TonBuilder;
pub use tron::TronBuilder;
pub use utxo::UtxoBuilder;

/// Uniform contract implemented once per chain family
pub trait ChainTransactionBuilder: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Serialize the unsigned transaction for `payload`
    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>>;

    /// Lowercase hex of every pre-image the signer must sign, in the order
    /// the chain reports them
    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>>;

    /// Verify `signatures` against `key` and compile the final transaction
    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult>;

    fn get_pre_signed_input_data(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        self.build_unsigned(payload).stage(payload.coin.chain, Stage::Build)
    }

    fn get_pre_signed_image_hash(&self, payload: &KeysignPayload) -> KeysignResult<Vec<String>> {
        let chain = payload.coin.chain;
        let unsigned = self.get_pre_signed_input_data(payload)?;
        self.pre_image_hashes(&unsigned).stage(chain, Stage::PreImage)
    }

    fn get_signed_transaction(
        &self,
        payload: &KeysignPayload,
        vault: &VaultKeys,
        signatures: &SignatureMap,
    ) -> KeysignResult<SignedTransactionResult> {
        let chain = payload.coin.chain;
        let key = derive_public_key(&payload.coin, vault).stage(chain, Stage::Derive)?;
        let unsigned = self.get_pre_signed_input_data(payload)?;
        self.assemble(&unsigned, signatures, &key).stage(chain, Stage::Assemble)
    }
}

/// Chain to builder lookup, built once from a configuration
pub struct BuilderRegistry {
    evm: EvmBuilder,
    utxo: UtxoBuilder,
    cosmos: CosmosBuilder,
    solana: SolanaBuilder,
    sui: SuiBuilder,
    polkadot: PolkadotBuilder,
    ripple: RippleBuilder,
    ton: TonBuilder,
    tron: TronBuilder,
    cardano: CardanoBuilder,
}

impl BuilderRegistry {
    pub fn new(config: &KeysignConfig) -> Self {
        Self {
            evm: EvmBuilder::new(config),
            utxo: UtxoBuilder::new(config),
            cosmos: CosmosBuilder::new(config),
            solana: SolanaBuilder::new(config),
            sui: SuiBuilder::new(config),
            polkadot: PolkadotBuilder::new(config),
            ripple: RippleBuilder::new(config),
            ton: TonBuilder::new(config),
            tron: TronBuilder::new(config),
            cardano: CardanoBuilder::new(config),
        }
    }

    /// Registry over [`KeysignConfig::default`]
    pub fn global() -> &'static BuilderRegistry {
        static REGISTRY: OnceLock<BuilderRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| BuilderRegistry::new(&KeysignConfig::default()))
    }

    pub fn for_chain(&self, chain: Chain) -> &dyn ChainTransactionBuilder {
        match chain.family() {
            ChainFamily::Evm => &self.evm,
            ChainFamily::Utxo => &self.utxo,
            ChainFamily::Cosmos | ChainFamily::Thorchain => &self.cosmos,
            ChainFamily::Solana => &self.solana,
            ChainFamily::Sui => &self.sui,
            ChainFamily::Polkadot => &self.polkadot,
            ChainFamily::Ripple => &self.ripple,
            ChainFamily::Ton => &self.ton,
            ChainFamily::Tron => &self.tron,
            ChainFamily::Cardano => &self.cardano,
        }
    }

    pub fn evm(&self) -> &EvmBuilder {
        &self.evm
    }

    /// Builder for the chain the payload spends from; for swaps this is the
    /// source coin's chain, which must be the payload's own coin
    fn source_builder(&self, payload: &KeysignPayload) -> KeysignResult<&dyn ChainTransactionBuilder> {
        let chain = payload.coin.chain;
        if let Some(swap) = &payload.swap_payload {
            let from = swap.from_coin().chain;
            if from != chain {
                return Err(KeysignError::chain_mismatch(from, chain).in_stage(chain, Stage::Build));
            }
        }
        Ok(self.for_chain(chain))
    }

    /// Approval to sign ahead of the main transaction, if the payload needs one
    fn approve_input(&self, payload: &KeysignPayload) -> KeysignResult<Option<Vec<u8>>> {
        match &payload.approve_payload {
            Some(approve) => self
                .evm
                .build_approve(payload, approve)
                .stage(payload.coin.chain, Stage::Build)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Every pre-image hash for the payload, approval first
    pub fn pre_image_hashes(&self, payload: &KeysignPayload) -> KeysignResult<Vec<String>> {
        let chain = payload.coin.chain;
        let builder = self.source_builder(payload)?;
        log_debug!("builders", chain, "computing pre-image hashes", family = builder.family());

        let mut hashes = Vec::new();
        if let Some(approve) = self.approve_input(payload)? {
            hashes.extend(self.evm.pre_image_hashes(&approve).stage(chain, Stage::PreImage)?);
        }
        hashes.extend(builder.get_pre_signed_image_hash(payload)?);
        Ok(hashes)
    }

    /// Sign the payload; an approval, when present, is returned ahead of the
    /// transaction it unlocks
    pub fn sign(
        &self,
        payload: &KeysignPayload,
        vault: &VaultKeys,
        signatures: &SignatureMap,
    ) -> KeysignResult<SignedTransactionType> {
        let chain = payload.coin.chain;
        let builder = self.source_builder(payload)?;
        log_debug!("builders", chain, "assembling", family = builder.family(), responses = signatures.len());

        let transaction = builder
            .get_signed_transaction(payload, vault, signatures)
            .inspect_err(|e| log_error!("builders", chain, "signing failed", code = format!("{:?}", e.code)))?;
        log_info!("builders", chain, "transaction signed", family = builder.family());
        match self.approve_input(payload)? {
            Some(approve) => {
                let key = derive_public_key(&payload.coin, vault).stage(chain, Stage::Derive)?;
                let approve = self
                    .evm
                    .assemble(&approve, signatures, &key)
                    .stage(chain, Stage::Assemble)?;
                Ok(SignedTransactionType::RegularWithApprove { approve, transaction })
            }
            None => Ok(SignedTransactionType::Regular { transaction }),
        }
    }
}

/// Pre-image hashes for `payload` under the default configuration
pub fn pre_image_hashes(payload: &KeysignPayload) -> KeysignResult<Vec<String>> {
    BuilderRegistry::global().pre_image_hashes(payload)
}

/// Sign `payload` under the default configuration
pub fn sign(
    payload: &KeysignPayload,
    vault: &VaultKeys,
    signatures: &SignatureMap,
) -> KeysignResult<SignedTransactionType> {
    BuilderRegistry::global().sign(payload, vault, signatures)
}

/// Lowercase hex of each pre-image
pub(crate) fn hex_all<I, T>(hashes: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    hashes.into_iter().map(hex::encode).collect()
}
