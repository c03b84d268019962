//! Cosmos-SDK transaction builder
//!
//! Serves the generic Cosmos chains (Gaia, Kujira, Osmosis, Terra, Terra
//! Classic, dYdX, Noble) and the THORChain family (THORChain, MayaChain).
//! Every transaction carries exactly one message:
//!
//! | payload                                   | message               |
//! |-------------------------------------------|-----------------------|
//! | native coin, bank denom, `switch:` memo   | `MsgSend`             |
//! | IBC transfer / `ibc/` token with a trace  | `MsgTransfer`         |
//! | Terra CW20, merge, unmerge, generic call  | `MsgExecuteContract`  |
//! | `DYDX_VOTE:` memo                         | `MsgVote`             |
//! | THORChain / MayaChain deposit             | `/types.MsgDeposit`   |
//! | THORChain / MayaChain transfer            | `/types.MsgSend`      |

use super::input::{decode_cosmos, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::{cosmos_hrp, parse_bech32_account};
use crate::config::KeysignConfig;
use crate::encoding::protobuf::ProtoWriter;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::operation::{Operation, VoteOption};
use crate::payload::{BlockchainSpecific, IbcDenomTrace, KeysignPayload, TransactionType};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_cosmos_transaction;
use crate::signing::preimage::cosmos::{CosmosCoin, CosmosFee, CosmosMessage};
use crate::signing::preimage::{get_cosmos_sign_doc_hash, UnsignedCosmosTransaction};
use crate::signing::{verify_ecdsa, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::{Chain, ChainFamily};

const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
const MSG_TRANSFER: &str = "/ibc.applications.transfer.v1.MsgTransfer";
const MSG_EXECUTE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
const MSG_VOTE: &str = "/cosmos.gov.v1beta1.MsgVote";
const THOR_MSG_DEPOSIT: &str = "/types.MsgDeposit";
const THOR_MSG_SEND: &str = "/types.MsgSend";

const IBC_TRANSFER_PORT: &str = "transfer";
const IBC_REVISION_NUMBER: u64 = 1;
const THOR_ASSET_DECIMALS: i64 = 8;

/// Chain id and fee denom of a generic Cosmos chain
fn chain_params(chain: Chain) -> KeysignResult<(&'static str, &'static str)> {
    match chain {
        Chain::Gaia => Ok(("cosmoshub-4", "uatom")),
        Chain::Kujira => Ok(("kaiyo-1", "ukuji")),
        Chain::Osmosis => Ok(("osmosis-1", "uosmo")),
        Chain::Terra => Ok(("phoenix-1", "uluna")),
        Chain::TerraClassic => Ok(("columbus-5", "uluna")),
        Chain::Dydx => Ok(("dydx-mainnet-1", "adydx")),
        Chain::Noble => Ok(("noble-1", "uusdc")),
        other => Err(KeysignError::runtime(format!("{} is not a Cosmos-SDK chain", other))),
    }
}

/// IBC timeout resolved from an `<height>_<timestamp ns>` string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IbcTimeout {
    pub revision_number: u64,
    pub revision_height: u64,
    pub timestamp_ns: u64,
}

/// Parse the caller's `<block height>_<timeout timestamp ns>` string.
///
/// A missing, malformed or zero block height is rejected; the timeout
/// height is the reported height plus `height_offset` blocks.
pub fn parse_ibc_timeout(height: &str, height_offset: u64) -> KeysignResult<IbcTimeout> {
    let mut parts = height.split('_');
    let block_height = parts
        .next()
        .and_then(|h| h.trim().parse::<u64>().ok())
        .filter(|h| *h > 0)
        .ok_or_else(|| KeysignError::runtime(format!("IBC block height in {:?} is invalid", height)))?;
    let timestamp_ns = parts
        .last()
        .and_then(|t| t.trim().parse::<u64>().ok())
        .ok_or_else(|| KeysignError::runtime(format!("IBC timeout timestamp in {:?} is invalid", height)))?;

    let revision_height = block_height.checked_add(height_offset).ok_or_else(|| {
        KeysignError::runtime(format!("IBC timeout height {} + {} overflows", block_height, height_offset))
    })?;

    Ok(IbcTimeout { revision_number: IBC_REVISION_NUMBER, revision_height, timestamp_ns })
}

/// Account and sequencing fields shared by both families
struct AccountParams {
    account_number: u64,
    sequence: u64,
}

pub struct CosmosBuilder {
    config: KeysignConfig,
}

impl CosmosBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    fn build_cosmos(&self, payload: &KeysignPayload) -> KeysignResult<UnsignedCosmosTransaction> {
        let chain = payload.coin.chain;
        let (account_number, sequence, fee_amount, transaction_type, trace) = match &payload.chain_specific {
            BlockchainSpecific::Cosmos { account_number, sequence, gas, transaction_type, ibc_denom_trace } => {
                (*account_number, *sequence, *gas, *transaction_type, ibc_denom_trace.as_ref())
            }
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Cosmos, other.name())),
        };
        let (chain_id, fee_denom) = chain_params(chain)?;
        let operation = payload.operation()?;
        let mut memo = payload.memo().unwrap_or_default().to_string();

        let message = match (&operation, transaction_type) {
            (Operation::DydxVote { option, proposal_id }, _) => {
                if chain != Chain::Dydx {
                    return Err(KeysignError::runtime(format!("governance votes are not supported on {}", chain)));
                }
                // the vote is the whole transaction; the DYDX_VOTE memo stays off chain
                memo.clear();
                vote_message(&payload.coin.address, *option, *proposal_id)
            }
            (_, TransactionType::IbcTransfer) => {
                let (message, inner_memo) = self.ibc_memo_transfer(payload, fee_denom, trace)?;
                memo = inner_memo;
                message
            }
            (_, TransactionType::GenericContract) => wasm_payload_message(payload)?,
            (_, TransactionType::Vote) => {
                return Err(KeysignError::runtime("vote transaction needs a DYDX_VOTE memo"));
            }
            _ => self.transfer_message(payload, &operation, fee_denom, trace)?,
        };
        log_debug!("cosmos", chain, "building transaction", message = message.type_url.as_str(), seq = sequence);

        Ok(UnsignedCosmosTransaction {
            chain,
            chain_id: chain_id.to_string(),
            account_number,
            sequence,
            messages: vec![message],
            memo,
            fee: CosmosFee {
                amount: vec![CosmosCoin { denom: fee_denom.to_string(), amount: fee_amount.to_string() }],
                gas: self.config.cosmos.gas_limit(chain),
            },
            public_key: compressed_key(payload)?,
        })
    }

    /// Bank send, CW20 transfer or IBC transfer of the payload's coin
    fn transfer_message(
        &self,
        payload: &KeysignPayload,
        operation: &Operation,
        fee_denom: &str,
        trace: Option<&IbcDenomTrace>,
    ) -> KeysignResult<CosmosMessage> {
        let coin = &payload.coin;
        if coin.is_native_token {
            validate_recipient(payload)?;
            return Ok(send_message(&coin.address, &payload.to_address, fee_denom, payload.to_amount));
        }

        let contract = coin.contract_address.trim();
        let lower = contract.to_lowercase();
        if lower.starts_with("ibc/") {
            if let Some(trace) = trace.filter(|t| !t.path.trim().is_empty()) {
                return self.ibc_trace_transfer(payload, contract, trace);
            }
        }
        let bank_denom = lower.starts_with("ibc/") || lower.starts_with("factory/") || lower.starts_with('u');
        if bank_denom || matches!(operation, Operation::Switch(_)) {
            validate_recipient(payload)?;
            return Ok(send_message(&coin.address, &payload.to_address, contract, payload.to_amount));
        }
        if matches!(coin.chain, Chain::Terra | Chain::TerraClassic) && lower.starts_with("terra1") {
            validate_recipient(payload)?;
            let msg = serde_json::json!({
                "transfer": {
                    "amount": payload.to_amount.to_string(),
                    "recipient": payload.to_address,
                }
            });
            return Ok(execute_contract_message(&coin.address, contract, &msg.to_string(), &[]));
        }
        Err(KeysignError::runtime(format!(
            "{} must be a native token or a valid IBC token, got {:?}",
            coin.ticker, contract
        )))
    }

    /// `MsgTransfer` routed by the caller's denom trace
    fn ibc_trace_transfer(
        &self,
        payload: &KeysignPayload,
        denom: &str,
        trace: &IbcDenomTrace,
    ) -> KeysignResult<CosmosMessage> {
        let mut hops = trace.path.split('/').filter(|s| !s.is_empty());
        let port = hops.next();
        let channel = hops.last();
        let (port, channel) = match (port, channel) {
            (Some(port), Some(channel)) => (port, channel),
            _ => return Err(KeysignError::runtime(format!("IBC path {:?} is not port/channel", trace.path))),
        };
        if trace.base_denom.trim().is_empty() {
            return Err(KeysignError::runtime("IBC transfer needs a base denom"));
        }
        let height = trace
            .height
            .as_deref()
            .ok_or_else(|| KeysignError::runtime("IBC transfer needs a timeout height"))?;
        let timeout = parse_ibc_timeout(height, self.config.cosmos.ibc_timeout_height_offset)?;
        log_debug!("cosmos", payload.coin.chain, "ibc transfer", channel = channel, timeout_height = timeout.revision_height);

        Ok(transfer_message(
            port,
            channel,
            &CosmosCoin { denom: denom.to_string(), amount: payload.to_amount.to_string() },
            &payload.coin.address,
            &payload.to_address,
            Some(&timeout),
            timeout.timestamp_ns,
        ))
    }

    /// `MsgTransfer` described by a `<chain>:<channel>:<receiver>[:<memo>]`
    /// memo; returns the message and the memo to forward
    fn ibc_memo_transfer(
        &self,
        payload: &KeysignPayload,
        fee_denom: &str,
        trace: Option<&IbcDenomTrace>,
    ) -> KeysignResult<(CosmosMessage, String)> {
        let memo = payload
            .memo()
            .ok_or_else(|| KeysignError::runtime("IBC transfer needs a chain:channel:receiver memo"))?;
        let parts: Vec<&str> = memo.split(':').collect();
        let channel = parts
            .get(1)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| KeysignError::runtime(format!("IBC memo {:?} has no channel", memo)))?;
        let forwarded = if parts.len() == 4 { parts[3].to_string() } else { String::new() };

        let timestamp_ns = trace
            .and_then(|t| t.height.as_deref())
            .and_then(|h| h.split('_').last())
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(0);
        let coin = &payload.coin;
        let denom = if coin.is_native_token { fee_denom } else { coin.contract_address.trim() };

        let message = transfer_message(
            IBC_TRANSFER_PORT,
            channel,
            &CosmosCoin { denom: denom.to_string(), amount: payload.to_amount.to_string() },
            &coin.address,
            &payload.to_address,
            None,
            timestamp_ns,
        );
        Ok((message, forwarded))
    }

    fn build_thorchain(&self, payload: &KeysignPayload) -> KeysignResult<UnsignedCosmosTransaction> {
        let chain = payload.coin.chain;
        let (account, is_deposit, transaction_type) = match &payload.chain_specific {
            BlockchainSpecific::Thorchain { account_number, sequence, is_deposit, transaction_type, .. }
                if chain == Chain::Thorchain =>
            {
                let account = AccountParams { account_number: *account_number, sequence: *sequence };
                (account, *is_deposit, *transaction_type)
            }
            BlockchainSpecific::Maya { account_number, sequence, is_deposit } if chain == Chain::Mayachain => {
                let account = AccountParams { account_number: *account_number, sequence: *sequence };
                (account, *is_deposit, TransactionType::Unspecified)
            }
            other => return Err(KeysignError::chain_mismatch(chain, other.name())),
        };
        let hrp = cosmos_hrp(chain).unwrap_or_default();
        let signer = parse_bech32_account(chain, &payload.coin.address, Some(hrp))?;
        let operation = payload.operation()?;
        let mut memo = payload.memo().unwrap_or_default().to_string();

        let message = match (&operation, transaction_type) {
            (Operation::Merge { denom }, _) => {
                memo.clear();
                let funds = [CosmosCoin { denom: denom.clone(), amount: payload.to_amount.to_string() }];
                execute_contract_message(&payload.coin.address, &payload.to_address, r#"{"deposit":{}}"#, &funds)
            }
            (Operation::Unmerge { shares, .. }, _) => {
                memo.clear();
                let msg = serde_json::json!({ "withdraw": { "share_amount": shares } });
                execute_contract_message(&payload.coin.address, &payload.to_address, &msg.to_string(), &[])
            }
            (_, TransactionType::ThorMerge | TransactionType::ThorUnmerge) => {
                return Err(KeysignError::runtime(format!(
                    "{:?} needs a merge:<denom> or unmerge:<denom>:<shares> memo",
                    transaction_type
                )));
            }
            (_, TransactionType::GenericContract) => wasm_payload_message(payload)?,
            _ if is_deposit => {
                deposit_message(payload, &signer, &memo)
            }
            _ => {
                let to = parse_bech32_account(chain, &payload.to_address, Some(hrp))?;
                let denom = if payload.coin.is_native_token {
                    payload.coin.ticker.to_lowercase()
                } else {
                    payload.coin.contract_address.trim().to_lowercase()
                };
                let amount = CosmosCoin { denom, amount: payload.to_amount.to_string() };
                let value = ProtoWriter::new()
                    .bytes(1, &signer)
                    .bytes(2, &to)
                    .message(3, &encode_coin(&amount))
                    .finish();
                CosmosMessage { type_url: THOR_MSG_SEND.to_string(), value }
            }
        };

        let (chain_id, fee) = if chain == Chain::Thorchain {
            let thorchain = &self.config.thorchain;
            (thorchain.effective_chain_id().to_string(), CosmosFee { amount: vec![], gas: thorchain.gas_limit })
        } else {
            let maya = &self.config.mayachain;
            let amount = vec![CosmosCoin { denom: "cacao".to_string(), amount: maya.gas_limit.to_string() }];
            (maya.chain_id.clone(), CosmosFee { amount, gas: maya.gas_limit })
        };
        log_debug!("cosmos", chain, "building transaction",
            message = message.type_url.as_str(), deposit = is_deposit, network = chain_id.as_str());

        Ok(UnsignedCosmosTransaction {
            chain,
            chain_id,
            account_number: account.account_number,
            sequence: account.sequence,
            messages: vec![message],
            memo,
            fee,
            public_key: compressed_key(payload)?,
        })
    }
}

impl ChainTransactionBuilder for CosmosBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Cosmos
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        let tx = match payload.coin.chain.family() {
            ChainFamily::Cosmos => {
                payload.require_family(ChainFamily::Cosmos)?;
                let payload = swap::resolve_transfer(payload, &self.config)?;
                self.build_cosmos(&payload)?
            }
            ChainFamily::Thorchain => {
                payload.require_family(ChainFamily::Thorchain)?;
                let payload = swap::resolve_transfer(payload, &self.config)?;
                self.build_thorchain(&payload)?
            }
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Cosmos, other)),
        };
        SigningInput::Cosmos(tx).encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_cosmos(unsigned)?;
        Ok(hex_all([get_cosmos_sign_doc_hash(&tx)]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_cosmos(unsigned)?;
        key.ensure_matches(&tx.public_key)?;
        let public_key = key.secp256k1()?;

        let hash = get_cosmos_sign_doc_hash(&tx);
        let response = SignatureProvider::new(signatures).get(&hash)?;
        let signature = verify_ecdsa(public_key, &hash, response)?;

        let compiled = compile_cosmos_transaction(&tx, &signature.serialize_compact());
        let raw = serde_json::to_string(&compiled.envelope)?;
        Ok(SignedTransactionResult::new(raw, compiled.tx_hash()))
    }
}

fn compressed_key(payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
    let key = payload.hex_public_key()?;
    if key.len() != 33 {
        return Err(KeysignError::invalid_public_key(format!(
            "{} needs a compressed public key, got {} bytes",
            payload.coin.chain,
            key.len()
        )));
    }
    Ok(key)
}

/// Same-chain recipients must be well-formed accounts with the chain's prefix
fn validate_recipient(payload: &KeysignPayload) -> KeysignResult<()> {
    let chain = payload.coin.chain;
    parse_bech32_account(chain, &payload.to_address, cosmos_hrp(chain)).map(|_| ())
}

fn encode_coin(coin: &CosmosCoin) -> Vec<u8> {
    ProtoWriter::new().string(1, &coin.denom).string(2, &coin.amount).finish()
}

fn send_message(from: &str, to: &str, denom: &str, amount: u128) -> CosmosMessage {
    let coin = CosmosCoin { denom: denom.to_string(), amount: amount.to_string() };
    let value = ProtoWriter::new()
        .string(1, from)
        .string(2, to)
        .message(3, &encode_coin(&coin))
        .finish();
    CosmosMessage { type_url: MSG_SEND.to_string(), value }
}

fn transfer_message(
    port: &str,
    channel: &str,
    token: &CosmosCoin,
    sender: &str,
    receiver: &str,
    timeout: Option<&IbcTimeout>,
    timeout_timestamp: u64,
) -> CosmosMessage {
    let height = match timeout {
        Some(t) => ProtoWriter::new()
            .uint64(1, t.revision_number)
            .uint64(2, t.revision_height)
            .finish(),
        None => Vec::new(),
    };
    let value = ProtoWriter::new()
        .string(1, port)
        .string(2, channel)
        .message(3, &encode_coin(token))
        .string(4, sender)
        .string(5, receiver)
        .message(6, &height)
        .uint64(7, timeout_timestamp)
        .finish();
    CosmosMessage { type_url: MSG_TRANSFER.to_string(), value }
}

fn execute_contract_message(sender: &str, contract: &str, msg: &str, funds: &[CosmosCoin]) -> CosmosMessage {
    let mut value = ProtoWriter::new();
    value.string(1, sender).string(2, contract).bytes(3, msg.as_bytes());
    for coin in funds {
        value.message(5, &encode_coin(coin));
    }
    CosmosMessage { type_url: MSG_EXECUTE_CONTRACT.to_string(), value: value.finish() }
}

fn wasm_payload_message(payload: &KeysignPayload) -> KeysignResult<CosmosMessage> {
    let wasm = payload
        .wasm_execute_contract_payload
        .as_ref()
        .ok_or_else(|| KeysignError::runtime("generic contract call needs a wasm execute payload"))?;
    if wasm.sender_address != payload.coin.address {
        return Err(KeysignError::runtime(format!(
            "wasm sender {} is not the signing account {}",
            wasm.sender_address, payload.coin.address
        )));
    }
    let funds: Vec<CosmosCoin> = wasm
        .coins
        .iter()
        .map(|c| CosmosCoin { denom: c.denom.clone(), amount: c.amount.clone() })
        .collect();
    Ok(execute_contract_message(&wasm.sender_address, &wasm.contract_address, &wasm.execute_msg, &funds))
}

fn vote_message(voter: &str, option: VoteOption, proposal_id: u64) -> CosmosMessage {
    let value = ProtoWriter::new()
        .uint64(1, proposal_id)
        .string(2, voter)
        .uint64(3, option as u64)
        .finish();
    CosmosMessage { type_url: MSG_VOTE.to_string(), value }
}

/// `/types.MsgDeposit` of the native asset, or of a THORChain token
fn deposit_message(payload: &KeysignPayload, signer: &[u8], memo: &str) -> CosmosMessage {
    let coin = &payload.coin;
    let (chain, native) = match coin.chain {
        Chain::Mayachain => ("MAYA", "CACAO"),
        _ => ("THOR", "RUNE"),
    };
    let symbol = if coin.is_native_token { native.to_string() } else { coin.ticker.to_uppercase() };
    let asset = ProtoWriter::new()
        .string(1, chain)
        .string(2, &symbol)
        .string(3, &symbol)
        .finish();

    let mut thor_coin = ProtoWriter::new();
    thor_coin.message(1, &asset);
    if payload.to_amount > 0 {
        thor_coin
            .string(2, &payload.to_amount.to_string())
            .int64(3, THOR_ASSET_DECIMALS);
    }
    let value = ProtoWriter::new()
        .message(1, &thor_coin.finish())
        .string(2, memo)
        .bytes(3, signer)
        .finish();
    CosmosMessage { type_url: THOR_MSG_DEPOSIT.to_string(), value }
}
