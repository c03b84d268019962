//! Keysign payload: the chain-agnostic transaction request
//!
//! `chain_specific` carries exactly one family's parameters; builders reject
//! a variant that does not belong to `coin.chain`'s family.

use serde::{Deserialize, Serialize};

use crate::error::{KeysignError, KeysignResult};
use crate::operation::Operation;
use crate::types::{ChainFamily, Coin, UtxoInfo};

/// Cosmos / THORChain message selector supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Unspecified,
    Vote,
    IbcTransfer,
    Switch,
    ThorMerge,
    ThorUnmerge,
    GenericContract,
}

/// IBC route and timeout resolved by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcDenomTrace {
    /// `port/channel`, e.g. `transfer/channel-0`
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub base_denom: String,
    /// `<block height>_<timeout timestamp ns>`
    pub height: Option<String>,
}

/// Spendable Sui coin object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiCoin {
    pub coin_type: String,
    pub coin_object_id: String,
    pub version: u64,
    /// base58 object digest
    pub digest: String,
    pub balance: u128,
}

/// Per-family chain parameters resolved by the caller before signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockchainSpecific {
    Ethereum {
        max_fee_per_gas_wei: u128,
        priority_fee_wei: u128,
        nonce: u64,
        gas_limit: u64,
    },
    Utxo {
        byte_fee: u64,
        send_max_amount: bool,
    },
    Cosmos {
        account_number: u64,
        sequence: u64,
        /// Fee amount in the chain's fee denom
        gas: u64,
        #[serde(default)]
        transaction_type: TransactionType,
        #[serde(default)]
        ibc_denom_trace: Option<IbcDenomTrace>,
    },
    Thorchain {
        account_number: u64,
        sequence: u64,
        #[serde(default)]
        fee: u64,
        is_deposit: bool,
        #[serde(default)]
        transaction_type: TransactionType,
    },
    Maya {
        account_number: u64,
        sequence: u64,
        is_deposit: bool,
    },
    Solana {
        recent_block_hash: String,
        priority_fee: u64,
        #[serde(default)]
        priority_limit: u32,
        /// Sender's associated token account
        #[serde(default)]
        from_address_pub_key: Option<String>,
        /// Receiver's associated token account, when it already exists
        #[serde(default)]
        to_address_pub_key: Option<String>,
        /// Token-2022 mint
        #[serde(default)]
        has_program_id: bool,
    },
    Sui {
        reference_gas_price: u64,
        coins: Vec<SuiCoin>,
    },
    Polkadot {
        recent_block_hash: String,
        nonce: u64,
        current_block_number: u64,
        spec_version: u32,
        transaction_version: u32,
        genesis_hash: String,
    },
    Ripple {
        sequence: u32,
        #[serde(default)]
        gas: u64,
        last_ledger_sequence: u32,
    },
    Ton {
        sequence_number: u32,
        expire_at: u32,
        bounceable: bool,
        #[serde(default)]
        send_max_amount: bool,
        /// Sender's jetton wallet for token transfers
        #[serde(default)]
        jetton_address: String,
    },
    Tron {
        timestamp: u64,
        expiration: u64,
        block_header_timestamp: u64,
        block_header_number: u64,
        block_header_version: u32,
        block_header_tx_trie_root: String,
        block_header_parent_hash: String,
        block_header_witness_address: String,
        #[serde(default)]
        gas_fee_estimation: u64,
    },
    Cardano {
        byte_fee: u64,
        send_max_amount: bool,
        ttl: u64,
    },
}

impl BlockchainSpecific {
    pub fn family(&self) -> ChainFamily {
        match self {
            BlockchainSpecific::Ethereum { .. } => ChainFamily::Evm,
            BlockchainSpecific::Utxo { .. } => ChainFamily::Utxo,
            BlockchainSpecific::Cosmos { .. } => ChainFamily::Cosmos,
            BlockchainSpecific::Thorchain { .. } | BlockchainSpecific::Maya { .. } => {
                ChainFamily::Thorchain
            }
            BlockchainSpecific::Solana { .. } => ChainFamily::Solana,
            BlockchainSpecific::Sui { .. } => ChainFamily::Sui,
            BlockchainSpecific::Polkadot { .. } => ChainFamily::Polkadot,
            BlockchainSpecific::Ripple { .. } => ChainFamily::Ripple,
            BlockchainSpecific::Ton { .. } => ChainFamily::Ton,
            BlockchainSpecific::Tron { .. } => ChainFamily::Tron,
            BlockchainSpecific::Cardano { .. } => ChainFamily::Cardano,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockchainSpecific::Ethereum { .. } => "Ethereum",
            BlockchainSpecific::Utxo { .. } => "UTXO",
            BlockchainSpecific::Cosmos { .. } => "Cosmos",
            BlockchainSpecific::Thorchain { .. } => "THORChain",
            BlockchainSpecific::Maya { .. } => "MayaChain",
            BlockchainSpecific::Solana { .. } => "Solana",
            BlockchainSpecific::Sui { .. } => "Sui",
            BlockchainSpecific::Polkadot { .. } => "Polkadot",
            BlockchainSpecific::Ripple { .. } => "Ripple",
            BlockchainSpecific::Ton { .. } => "Ton",
            BlockchainSpecific::Tron { .. } => "Tron",
            BlockchainSpecific::Cardano { .. } => "Cardano",
        }
    }
}

/// One coin amount attached to a wasm contract call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosCoinAmount {
    pub denom: String,
    pub amount: String,
}

/// Generic CosmWasm execute call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmExecuteContractPayload {
    pub sender_address: String,
    pub contract_address: String,
    /// JSON message body, passed through verbatim
    pub execute_msg: String,
    #[serde(default)]
    pub coins: Vec<CosmosCoinAmount>,
}

/// ERC20 spend approval preceding a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovePayload {
    pub amount: u128,
    pub spender: String,
}

/// THORChain / MayaChain swap quote resolved by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThorchainSwapPayload {
    pub from_address: String,
    pub from_coin: Coin,
    pub to_coin: Coin,
    pub vault_address: String,
    #[serde(default)]
    pub router_address: Option<String>,
    pub from_amount: u128,
    #[serde(default)]
    pub to_amount_limit: String,
    #[serde(default)]
    pub streaming_interval: u32,
    #[serde(default)]
    pub streaming_quantity: u32,
    pub expiration_time: u64,
    #[serde(default)]
    pub is_affiliate: bool,
}

/// Pre-built EVM call returned by an aggregator quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmQuoteTransaction {
    pub from: String,
    pub to: String,
    /// 0x-prefixed calldata
    pub data: String,
    /// Decimal wei string
    #[serde(default)]
    pub value: String,
    /// Decimal wei string
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub gas: u64,
}

/// 1inch / ElDorito / Kyber quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorSwapPayload {
    pub from_coin: Coin,
    pub to_coin: Coin,
    pub from_amount: u128,
    #[serde(default)]
    pub to_amount_decimal: String,
    pub tx: EvmQuoteTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPayload {
    Thorchain(ThorchainSwapPayload),
    Mayachain(ThorchainSwapPayload),
    OneInch(AggregatorSwapPayload),
    Kyber(AggregatorSwapPayload),
    ElDorito(AggregatorSwapPayload),
}

impl SwapPayload {
    pub fn from_coin(&self) -> &Coin {
        match self {
            SwapPayload::Thorchain(p) | SwapPayload::Mayachain(p) => &p.from_coin,
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) | SwapPayload::ElDorito(p) => {
                &p.from_coin
            }
        }
    }

    pub fn to_coin(&self) -> &Coin {
        match self {
            SwapPayload::Thorchain(p) | SwapPayload::Mayachain(p) => &p.to_coin,
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) | SwapPayload::ElDorito(p) => {
                &p.to_coin
            }
        }
    }

    pub fn from_amount(&self) -> u128 {
        match self {
            SwapPayload::Thorchain(p) | SwapPayload::Mayachain(p) => p.from_amount,
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) | SwapPayload::ElDorito(p) => {
                p.from_amount
            }
        }
    }

    /// Address the source asset is sent to
    pub fn vault_address(&self) -> &str {
        match self {
            SwapPayload::Thorchain(p) | SwapPayload::Mayachain(p) => p
                .router_address
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(&p.vault_address),
            SwapPayload::OneInch(p) | SwapPayload::Kyber(p) | SwapPayload::ElDorito(p) => &p.tx.to,
        }
    }
}

/// The normalized transaction request consumed by every builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignPayload {
    pub coin: Coin,
    pub to_address: String,
    pub to_amount: u128,
    pub chain_specific: BlockchainSpecific,
    #[serde(default)]
    pub utxos: Vec<UtxoInfo>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub swap_payload: Option<SwapPayload>,
    #[serde(default)]
    pub approve_payload: Option<ApprovePayload>,
    #[serde(default)]
    pub wasm_execute_contract_payload: Option<WasmExecuteContractPayload>,
}

impl KeysignPayload {
    /// Memo trimmed of surrounding whitespace, `None` when empty
    pub fn memo(&self) -> Option<&str> {
        self.memo
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Parse the memo once into a structured operation for this chain family
    pub fn operation(&self) -> KeysignResult<Operation> {
        Operation::parse(self.coin.chain.family(), self.memo()).map_err(KeysignError::from)
    }

    /// Fail unless `chain_specific` belongs to `family` and the coin does too
    pub fn require_family(&self, family: ChainFamily) -> KeysignResult<()> {
        if self.coin.chain.family() != family {
            return Err(KeysignError::chain_mismatch(
                family,
                format!("coin on {}", self.coin.chain),
            ));
        }
        let actual = self.chain_specific.family();
        if actual != family {
            return Err(KeysignError::chain_mismatch(
                family,
                self.chain_specific.name(),
            ));
        }
        Ok(())
    }

    pub fn hex_public_key(&self) -> KeysignResult<Vec<u8>> {
        crate::utils::decode_hex(&self.coin.hex_public_key).map_err(|e| {
            KeysignError::invalid_public_key(format!(
                "coin public key {} is not hex: {}",
                self.coin.hex_public_key, e
            ))
        })
    }
}

/// Send-max guard shared by UTXO-style builders.
///
/// Sending "max" is only honored when the requested amount is exactly the
/// full balance; a rounded amount never drains the wallet.
pub fn send_max_guard(send_max_amount: bool, raw_balance: u128, to_amount: u128) -> bool {
    send_max_amount && raw_balance > 0 && raw_balance == to_amount
}
