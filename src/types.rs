//! Shared types for the keysign core
//!
//! Chain identifiers, assets and vault key material that cross module
//! boundaries live here so every builder serializes them the same way.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Chain Types
// =============================================================================

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    // UTXO
    Bitcoin,
    Litecoin,
    BitcoinCash,
    Dogecoin,
    Dash,
    Zcash,
    // EVM
    Ethereum,
    EthereumSepolia,
    Bsc,
    Avalanche,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Blast,
    Cronos,
    Zksync,
    Mantle,
    Hyperliquid,
    Sei,
    // Cosmos SDK
    Gaia,
    Kujira,
    Osmosis,
    Terra,
    TerraClassic,
    Dydx,
    Noble,
    Thorchain,
    Mayachain,
    // Others
    Solana,
    Sui,
    Polkadot,
    Ripple,
    Ton,
    Tron,
    Cardano,
}

/// Chain families sharing one transaction builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    Evm,
    Utxo,
    Cosmos,
    Thorchain,
    Solana,
    Sui,
    Polkadot,
    Ripple,
    Ton,
    Tron,
    Cardano,
}

/// Signature scheme the vault signs with for a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ecdsa,
    Eddsa,
}

impl Chain {
    pub const ALL: [Chain; 36] = [
        Chain::Bitcoin,
        Chain::Litecoin,
        Chain::BitcoinCash,
        Chain::Dogecoin,
        Chain::Dash,
        Chain::Zcash,
        Chain::Ethereum,
        Chain::EthereumSepolia,
        Chain::Bsc,
        Chain::Avalanche,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
        Chain::Blast,
        Chain::Cronos,
        Chain::Zksync,
        Chain::Mantle,
        Chain::Hyperliquid,
        Chain::Sei,
        Chain::Gaia,
        Chain::Kujira,
        Chain::Osmosis,
        Chain::Terra,
        Chain::TerraClassic,
        Chain::Dydx,
        Chain::Noble,
        Chain::Thorchain,
        Chain::Mayachain,
        Chain::Solana,
        Chain::Sui,
        Chain::Polkadot,
        Chain::Ripple,
        Chain::Ton,
        Chain::Tron,
        Chain::Cardano,
    ];

    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin
            | Chain::Litecoin
            | Chain::BitcoinCash
            | Chain::Dogecoin
            | Chain::Dash
            | Chain::Zcash => ChainFamily::Utxo,
            Chain::Ethereum
            | Chain::EthereumSepolia
            | Chain::Bsc
            | Chain::Avalanche
            | Chain::Polygon
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::Base
            | Chain::Blast
            | Chain::Cronos
            | Chain::Zksync
            | Chain::Mantle
            | Chain::Hyperliquid
            | Chain::Sei => ChainFamily::Evm,
            Chain::Gaia
            | Chain::Kujira
            | Chain::Osmosis
            | Chain::Terra
            | Chain::TerraClassic
            | Chain::Dydx
            | Chain::Noble => ChainFamily::Cosmos,
            Chain::Thorchain | Chain::Mayachain => ChainFamily::Thorchain,
            Chain::Solana => ChainFamily::Solana,
            Chain::Sui => ChainFamily::Sui,
            Chain::Polkadot => ChainFamily::Polkadot,
            Chain::Ripple => ChainFamily::Ripple,
            Chain::Ton => ChainFamily::Ton,
            Chain::Tron => ChainFamily::Tron,
            Chain::Cardano => ChainFamily::Cardano,
        }
    }

    pub fn is_evm(&self) -> bool {
        self.family() == ChainFamily::Evm
    }

    pub fn is_utxo(&self) -> bool {
        self.family() == ChainFamily::Utxo
    }

    pub fn signature_scheme(&self) -> SignatureScheme {
        match self.family() {
            ChainFamily::Solana
            | ChainFamily::Sui
            | ChainFamily::Polkadot
            | ChainFamily::Ton
            | ChainFamily::Cardano => SignatureScheme::Eddsa,
            _ => SignatureScheme::Ecdsa,
        }
    }

    /// Decimal chain id as the coin-type table reports it.
    ///
    /// Sepolia shares Ethereum's coin type, so this reports mainnet's id;
    /// the EVM builder overrides it from configuration.
    pub fn default_chain_id(&self) -> Option<&'static str> {
        match self {
            Chain::Ethereum | Chain::EthereumSepolia => Some("1"),
            Chain::Bsc => Some("56"),
            Chain::Avalanche => Some("43114"),
            Chain::Polygon => Some("137"),
            Chain::Arbitrum => Some("42161"),
            Chain::Optimism => Some("10"),
            Chain::Base => Some("8453"),
            Chain::Blast => Some("81457"),
            Chain::Cronos => Some("25"),
            Chain::Zksync => Some("324"),
            Chain::Mantle => Some("5000"),
            Chain::Hyperliquid => Some("999"),
            Chain::Sei => Some("1329"),
            _ => None,
        }
    }

    /// BIP44 path used for ECDSA child key derivation
    pub fn derivation_path(&self) -> Option<&'static str> {
        match self.family() {
            ChainFamily::Evm => Some("m/44'/60'/0'/0/0"),
            _ => match self {
                Chain::Bitcoin => Some("m/84'/0'/0'/0/0"),
                Chain::Litecoin => Some("m/84'/2'/0'/0/0"),
                Chain::BitcoinCash => Some("m/44'/145'/0'/0/0"),
                Chain::Dogecoin => Some("m/44'/3'/0'/0/0"),
                Chain::Dash => Some("m/44'/5'/0'/0/0"),
                Chain::Zcash => Some("m/44'/133'/0'/0/0"),
                Chain::Gaia
                | Chain::Kujira
                | Chain::Osmosis
                | Chain::Dydx
                | Chain::Noble => Some("m/44'/118'/0'/0/0"),
                Chain::Terra | Chain::TerraClassic => Some("m/44'/330'/0'/0/0"),
                Chain::Thorchain | Chain::Mayachain => Some("m/44'/931'/0'/0/0"),
                Chain::Ripple => Some("m/44'/144'/0'/0/0"),
                Chain::Tron => Some("m/44'/195'/0'/0/0"),
                _ => None,
            },
        }
    }

    pub fn ticker(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Litecoin => "LTC",
            Chain::BitcoinCash => "BCH",
            Chain::Dogecoin => "DOGE",
            Chain::Dash => "DASH",
            Chain::Zcash => "ZEC",
            Chain::Ethereum
            | Chain::EthereumSepolia
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::Base
            | Chain::Blast
            | Chain::Zksync => "ETH",
            Chain::Bsc => "BNB",
            Chain::Avalanche => "AVAX",
            Chain::Polygon => "POL",
            Chain::Cronos => "CRO",
            Chain::Mantle => "MNT",
            Chain::Hyperliquid => "HYPE",
            Chain::Sei => "SEI",
            Chain::Gaia => "ATOM",
            Chain::Kujira => "KUJI",
            Chain::Osmosis => "OSMO",
            Chain::Terra => "LUNA",
            Chain::TerraClassic => "LUNC",
            Chain::Dydx => "DYDX",
            Chain::Noble => "USDC",
            Chain::Thorchain => "RUNE",
            Chain::Mayachain => "CACAO",
            Chain::Solana => "SOL",
            Chain::Sui => "SUI",
            Chain::Polkadot => "DOT",
            Chain::Ripple => "XRP",
            Chain::Ton => "TON",
            Chain::Tron => "TRX",
            Chain::Cardano => "ADA",
        }
    }

    /// Asset chain prefix used in THORChain / MayaChain memos
    pub fn swap_asset_prefix(&self) -> Option<&'static str> {
        match self {
            Chain::Bitcoin => Some("BTC"),
            Chain::Litecoin => Some("LTC"),
            Chain::BitcoinCash => Some("BCH"),
            Chain::Dogecoin => Some("DOGE"),
            Chain::Dash => Some("DASH"),
            Chain::Zcash => Some("ZEC"),
            Chain::Ethereum => Some("ETH"),
            Chain::Bsc => Some("BSC"),
            Chain::Avalanche => Some("AVAX"),
            Chain::Arbitrum => Some("ARB"),
            Chain::Base => Some("BASE"),
            Chain::Gaia => Some("GAIA"),
            Chain::Kujira => Some("KUJI"),
            Chain::Thorchain => Some("THOR"),
            Chain::Mayachain => Some("MAYA"),
            Chain::Ripple => Some("XRP"),
            Chain::Tron => Some("TRON"),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // kebab-case, identical to the serde representation
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&name)
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Utxo => "utxo",
            ChainFamily::Cosmos => "cosmos",
            ChainFamily::Thorchain => "thorchain",
            ChainFamily::Solana => "solana",
            ChainFamily::Sui => "sui",
            ChainFamily::Polkadot => "polkadot",
            ChainFamily::Ripple => "ripple",
            ChainFamily::Ton => "ton",
            ChainFamily::Tron => "tron",
            ChainFamily::Cardano => "cardano",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Asset & Key Types
// =============================================================================

/// An asset on a chain, immutable for the duration of a signing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub chain: Chain,
    pub ticker: String,
    /// Sender address on `chain`
    pub address: String,
    pub decimals: u8,
    /// Token contract / mint / denom; empty for the native asset
    #[serde(default)]
    pub contract_address: String,
    pub is_native_token: bool,
    /// Spendable balance in the smallest unit
    #[serde(default)]
    pub raw_balance: u128,
    /// Chain-appropriate public key as hex (compressed secp256k1 or raw ed25519)
    pub hex_public_key: String,
    /// Overrides the chain's default derivation path
    #[serde(default)]
    pub derivation_path: Option<String>,
}

impl Coin {
    pub fn native(chain: Chain, address: impl Into<String>, hex_public_key: impl Into<String>) -> Self {
        Self {
            chain,
            ticker: chain.ticker().to_string(),
            address: address.into(),
            decimals: 0,
            contract_address: String::new(),
            is_native_token: true,
            raw_balance: 0,
            hex_public_key: hex_public_key.into(),
            derivation_path: None,
        }
    }

    pub fn derivation_path(&self) -> Option<&str> {
        self.derivation_path
            .as_deref()
            .or_else(|| self.chain.derivation_path())
    }
}

/// Spendable output reference supplied by a UTXO indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInfo {
    /// Transaction id in display (big-endian) hex
    pub hash: String,
    pub amount: u64,
    pub index: u32,
}

/// Vault-held public key material, never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultKeys {
    pub public_key_ecdsa: String,
    pub public_key_eddsa: String,
    pub hex_chain_code: String,
}
