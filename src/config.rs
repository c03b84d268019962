//! Keysign configuration
//!
//! One immutable value holding every per-chain economic constant (gas
//! limits, fee constants, dust thresholds, affiliate settings). Builders
//! receive it at construction and never read global state afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{KeysignError, KeysignResult};
use crate::types::Chain;

/// Root configuration. Every section falls back to defaults when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeysignConfig {
    pub evm: EvmConfig,
    pub utxo: UtxoConfig,
    pub cosmos: CosmosConfig,
    pub thorchain: ThorchainConfig,
    pub mayachain: MayachainConfig,
    pub solana: SolanaConfig,
    pub sui: SuiConfig,
    pub polkadot: PolkadotConfig,
    pub ripple: RippleConfig,
    pub ton: TonConfig,
    pub tron: TronConfig,
    pub cardano: CardanoConfig,
}

impl KeysignConfig {
    pub fn from_json_str(json: &str) -> KeysignResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> KeysignResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KeysignError::runtime(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Reject values that would silently produce unbroadcastable transactions
    pub fn validate(&self) -> KeysignResult<()> {
        if self.polkadot.era_period < 4 || !self.polkadot.era_period.is_power_of_two() {
            return Err(KeysignError::runtime(format!(
                "polkadot era period must be a power of two >= 4, got {}",
                self.polkadot.era_period
            )));
        }
        if self.thorchain.affiliate_fee_bps > 10_000 {
            return Err(KeysignError::runtime("affiliate fee above 100%"));
        }
        if self.ripple.fee_drops == 0 {
            return Err(KeysignError::runtime("ripple fee must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmConfig {
    pub transfer_gas_limit: u64,
    pub erc20_gas_limit: u64,
    pub swap_gas_limit: u64,
    pub default_swap_gas_price_wei: u128,
    pub sepolia_chain_id: u64,
    pub kyber_gas_multiplier_ethereum: f64,
    pub kyber_gas_multiplier_l2: f64,
    pub kyber_gas_multiplier_default: f64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            transfer_gas_limit: 23_000,
            erc20_gas_limit: 120_000,
            swap_gas_limit: 600_000,
            default_swap_gas_price_wei: 20_000_000_000,
            sepolia_chain_id: 11_155_111,
            kyber_gas_multiplier_ethereum: 1.4,
            kyber_gas_multiplier_l2: 2.0,
            kyber_gas_multiplier_default: 1.6,
        }
    }
}

impl EvmConfig {
    pub fn kyber_gas_multiplier(&self, chain: Chain) -> f64 {
        match chain {
            Chain::Ethereum => self.kyber_gas_multiplier_ethereum,
            Chain::Arbitrum
            | Chain::Optimism
            | Chain::Base
            | Chain::Blast
            | Chain::Bsc
            | Chain::Avalanche
            | Chain::Polygon => self.kyber_gas_multiplier_l2,
            _ => self.kyber_gas_multiplier_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtxoConfig {
    pub dust_bitcoin: u64,
    pub dust_litecoin: u64,
    pub dust_bitcoin_cash: u64,
    pub dust_dogecoin: u64,
    pub dust_dash: u64,
    pub dust_zcash: u64,
    pub zcash_branch_id: u32,
    pub zcash_expiry_height: u32,
    /// ZIP-317 marginal fee per logical action
    pub zcash_marginal_fee: u64,
}

impl Default for UtxoConfig {
    fn default() -> Self {
        Self {
            dust_bitcoin: 546,
            dust_litecoin: 1_000,
            dust_bitcoin_cash: 1_000,
            dust_dogecoin: 1_000_000,
            dust_dash: 1_000,
            dust_zcash: 1_000,
            zcash_branch_id: 0x4DEC_4DF0,
            zcash_expiry_height: 0,
            zcash_marginal_fee: 5_000,
        }
    }
}

impl UtxoConfig {
    pub fn dust_threshold(&self, chain: Chain) -> u64 {
        match chain {
            Chain::Bitcoin => self.dust_bitcoin,
            Chain::Litecoin => self.dust_litecoin,
            Chain::BitcoinCash => self.dust_bitcoin_cash,
            Chain::Dogecoin => self.dust_dogecoin,
            Chain::Dash => self.dust_dash,
            Chain::Zcash => self.dust_zcash,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmosConfig {
    pub gaia_gas_limit: u64,
    pub kujira_gas_limit: u64,
    pub osmosis_gas_limit: u64,
    pub terra_gas_limit: u64,
    pub terra_classic_gas_limit: u64,
    pub dydx_gas_limit: u64,
    pub noble_gas_limit: u64,
    /// Blocks added to the reported height for IBC timeouts
    pub ibc_timeout_height_offset: u64,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            gaia_gas_limit: 200_000,
            kujira_gas_limit: 200_000,
            osmosis_gas_limit: 200_000,
            terra_gas_limit: 300_000,
            terra_classic_gas_limit: 300_000,
            dydx_gas_limit: 200_000,
            noble_gas_limit: 200_000,
            ibc_timeout_height_offset: 1_000,
        }
    }
}

impl CosmosConfig {
    pub fn gas_limit(&self, chain: Chain) -> u64 {
        match chain {
            Chain::Gaia => self.gaia_gas_limit,
            Chain::Kujira => self.kujira_gas_limit,
            Chain::Osmosis => self.osmosis_gas_limit,
            Chain::Terra => self.terra_gas_limit,
            Chain::TerraClassic => self.terra_classic_gas_limit,
            Chain::Dydx => self.dydx_gas_limit,
            Chain::Noble => self.noble_gas_limit,
            _ => self.gaia_gas_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThorchainConfig {
    pub gas_limit: u64,
    pub chain_id: String,
    /// Chain id reported by the network at startup; wins when non-empty
    pub network_chain_id: Option<String>,
    pub affiliate_address: String,
    pub affiliate_fee_bps: u32,
}

impl Default for ThorchainConfig {
    fn default() -> Self {
        Self {
            gas_limit: 20_000_000,
            chain_id: "thorchain-1".to_string(),
            network_chain_id: None,
            affiliate_address: "vi".to_string(),
            affiliate_fee_bps: 50,
        }
    }
}

impl ThorchainConfig {
    pub fn effective_chain_id(&self) -> &str {
        match self.network_chain_id.as_deref() {
            Some(id) if !id.is_empty() && id != self.chain_id => id,
            _ => &self.chain_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MayachainConfig {
    pub gas_limit: u64,
    pub chain_id: String,
}

impl Default for MayachainConfig {
    fn default() -> Self {
        Self {
            gas_limit: 2_000_000_000,
            chain_id: "mayachain-mainnet-v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolanaConfig {
    /// Micro-lamports per compute unit
    pub compute_unit_price: u64,
    pub compute_unit_limit: u32,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            compute_unit_price: 1_000_000,
            compute_unit_limit: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiConfig {
    pub gas_budget: u64,
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self { gas_budget: 3_000_000 }
    }
}

/// Call indexes for the Polkadot relay chain runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolkadotConfig {
    pub era_period: u64,
    pub transfer_allow_death: [u8; 2],
    pub transfer_keep_alive: [u8; 2],
    pub batch_all: [u8; 2],
    pub remark_with_event: [u8; 2],
    pub existential_deposit: u128,
}

impl Default for PolkadotConfig {
    fn default() -> Self {
        Self {
            era_period: 64,
            transfer_allow_death: [5, 0],
            transfer_keep_alive: [5, 3],
            batch_all: [26, 2],
            remark_with_event: [0, 7],
            existential_deposit: 10_000_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    pub fee_drops: u64,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self { fee_drops: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TonConfig {
    pub wallet_id: u32,
    pub jetton_attached_amount: u64,
    pub jetton_forward_amount: u64,
    pub staking_gas_limit: u64,
    pub unstake_attached_amount: u64,
}

impl Default for TonConfig {
    fn default() -> Self {
        Self {
            wallet_id: 698_983_191,
            jetton_attached_amount: 100_000_000,
            jetton_forward_amount: 1,
            staking_gas_limit: 100_000,
            unstake_attached_amount: 200_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TronConfig {
    pub trc20_fee_limit: u64,
    /// Used when the chain parameters carry no expiration
    pub expiration_offset_ms: u64,
}

impl Default for TronConfig {
    fn default() -> Self {
        Self {
            trc20_fee_limit: 100_000_000,
            expiration_offset_ms: 10 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardanoConfig {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub min_utxo_lovelace: u64,
}

impl Default for CardanoConfig {
    fn default() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            min_utxo_lovelace: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = KeysignConfig::from_json_str(
            r#"{"ripple": {"fee_drops": 12}, "thorchain": {"network_chain_id": "thorchain-stagenet-2"}}"#,
        )
        .unwrap();

        assert_eq!(config.ripple.fee_drops, 12);
        assert_eq!(config.evm.transfer_gas_limit, 23_000);
        assert_eq!(config.thorchain.effective_chain_id(), "thorchain-stagenet-2");
        assert_eq!(config.thorchain.affiliate_address, "vi");
    }

    #[test]
    fn test_empty_network_chain_id_is_ignored() {
        let mut config = ThorchainConfig::default();
        config.network_chain_id = Some(String::new());
        assert_eq!(config.effective_chain_id(), "thorchain-1");
    }

    #[test]
    fn test_invalid_era_rejected() {
        let err = KeysignConfig::from_json_str(r#"{"polkadot": {"era_period": 63}}"#).unwrap_err();
        assert!(err.message.contains("era period"));
    }

    #[test]
    fn test_kyber_multipliers() {
        let evm = EvmConfig::default();
        assert_eq!(evm.kyber_gas_multiplier(Chain::Ethereum), 1.4);
        assert_eq!(evm.kyber_gas_multiplier(Chain::Arbitrum), 2.0);
        assert_eq!(evm.kyber_gas_multiplier(Chain::Zksync), 1.6);
    }
}
