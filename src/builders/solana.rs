//! Solana transaction builder
//!
//! Three shapes, all v0 messages with compute budget instructions in front:
//! a native system transfer, an SPL/Token-2022 `TransferChecked` between
//! existing token accounts, and the same transfer preceded by creating the
//! recipient's associated token account when it does not exist yet.
//!
//! The vault signs the serialized message itself, so the "pre-image hash"
//! reported for Solana is the hex of the whole message.

use curve25519_dalek::edwards::CompressedEdwardsY;

use super::input::{decode_solana, SigningInput};
use super::{hex_all, ChainTransactionBuilder};
use crate::address::parse_solana_address;
use crate::config::KeysignConfig;
use crate::error::{KeysignError, KeysignResult};
use crate::keys::DerivedPublicKey;
use crate::payload::{BlockchainSpecific, KeysignPayload};
use crate::result::SignedTransactionResult;
use crate::signing::compiler::compile_solana_transaction;
use crate::signing::preimage::solana::{Pubkey, SolanaAccountMeta, SolanaInstruction};
use crate::signing::preimage::{get_solana_message, UnsignedSolanaTransaction};
use crate::signing::{verify_ed25519, SignatureMap, SignatureProvider};
use crate::swap;
use crate::types::ChainFamily;
use crate::utils::sha256;

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ASSOCIATED_TOKEN_PROGRAM: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const MEMO_PROGRAM: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

const SYSTEM_TRANSFER: u32 = 2;
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;
const TOKEN_TRANSFER_CHECKED: u8 = 12;
const ATA_CREATE_IDEMPOTENT: u8 = 1;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

fn program(id: &str) -> KeysignResult<Pubkey> {
    parse_solana_address(id)
}

/// True when `bytes` is not a valid compressed Ed25519 point
fn is_off_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_none()
}

/// `find_program_address`: the first off-curve hash counting the bump
/// seed down from 255
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> KeysignResult<(Pubkey, u8)> {
    for bump in (0..=u8::MAX).rev() {
        let mut data = Vec::new();
        for seed in seeds {
            data.extend_from_slice(seed);
        }
        data.push(bump);
        data.extend_from_slice(program_id);
        data.extend_from_slice(PDA_MARKER);
        let candidate = sha256(&data);
        if is_off_curve(&candidate) {
            return Ok((candidate, bump));
        }
    }
    Err(KeysignError::runtime("no viable bump seed for program address"))
}

/// Associated token account of `owner` for `mint` under `token_program`
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> KeysignResult<Pubkey> {
    let ata_program = program(ASSOCIATED_TOKEN_PROGRAM)?;
    let (address, _) = find_program_address(&[owner, token_program, mint], &ata_program)?;
    Ok(address)
}

/// Chain parameters read from `BlockchainSpecific::Solana`
struct SolanaParams<'a> {
    recent_block_hash: &'a str,
    priority_limit: u32,
    from_token_account: Option<&'a str>,
    to_token_account: Option<&'a str>,
    token_2022: bool,
}

pub struct SolanaBuilder {
    config: KeysignConfig,
}

impl SolanaBuilder {
    pub fn new(config: &KeysignConfig) -> Self {
        Self { config: config.clone() }
    }

    fn compute_budget(&self, priority_limit: u32) -> KeysignResult<Vec<SolanaInstruction>> {
        let budget = program(COMPUTE_BUDGET_PROGRAM)?;
        let limit = if priority_limit > 0 { priority_limit } else { self.config.solana.compute_unit_limit };

        let mut limit_data = vec![SET_COMPUTE_UNIT_LIMIT];
        limit_data.extend_from_slice(&limit.to_le_bytes());
        let mut price_data = vec![SET_COMPUTE_UNIT_PRICE];
        price_data.extend_from_slice(&self.config.solana.compute_unit_price.to_le_bytes());

        Ok(vec![
            SolanaInstruction { program_id: budget, accounts: vec![], data: limit_data },
            SolanaInstruction { program_id: budget, accounts: vec![], data: price_data },
        ])
    }

    /// `TransferChecked`, creating the recipient's token account first when
    /// the caller found none
    fn token_instructions(
        &self,
        payload: &KeysignPayload,
        owner: Pubkey,
        params: &SolanaParams<'_>,
    ) -> KeysignResult<Vec<SolanaInstruction>> {
        let coin = &payload.coin;
        let source = params
            .from_token_account
            .ok_or_else(|| {
                KeysignError::runtime(format!(
                    "sender has no associated token account for {}",
                    coin.ticker
                ))
            })
            .and_then(parse_solana_address)?;
        let mint = parse_solana_address(&coin.contract_address)?;
        let token_program = program(if params.token_2022 { TOKEN_2022_PROGRAM } else { TOKEN_PROGRAM })?;

        let mut instructions = Vec::new();
        let destination = match params.to_token_account {
            Some(existing) => parse_solana_address(existing)?,
            None => {
                let recipient = parse_solana_address(&payload.to_address)?;
                let ata = associated_token_address(&recipient, &mint, &token_program)?;
                log_debug!("solana", coin.chain, "creating recipient token account", legacy = !params.token_2022);
                instructions.push(SolanaInstruction {
                    program_id: program(ASSOCIATED_TOKEN_PROGRAM)?,
                    accounts: vec![
                        SolanaAccountMeta::writable(owner, true),
                        SolanaAccountMeta::writable(ata, false),
                        SolanaAccountMeta::readonly(recipient, false),
                        SolanaAccountMeta::readonly(mint, false),
                        SolanaAccountMeta::readonly(program(SYSTEM_PROGRAM)?, false),
                        SolanaAccountMeta::readonly(token_program, false),
                    ],
                    data: vec![ATA_CREATE_IDEMPOTENT],
                });
                ata
            }
        };

        let amount = u64::try_from(payload.to_amount)
            .map_err(|_| KeysignError::runtime(format!("amount {} exceeds u64", payload.to_amount)))?;
        let mut data = vec![TOKEN_TRANSFER_CHECKED];
        data.extend_from_slice(&amount.to_le_bytes());
        data.push(coin.decimals);
        instructions.push(SolanaInstruction {
            program_id: token_program,
            accounts: vec![
                SolanaAccountMeta::writable(source, false),
                SolanaAccountMeta::readonly(mint, false),
                SolanaAccountMeta::writable(destination, false),
                SolanaAccountMeta::readonly(owner, true),
            ],
            data,
        });
        Ok(instructions)
    }
}

impl ChainTransactionBuilder for SolanaBuilder {
    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    fn build_unsigned(&self, payload: &KeysignPayload) -> KeysignResult<Vec<u8>> {
        payload.require_family(ChainFamily::Solana)?;
        let payload = swap::resolve_transfer(payload, &self.config)?;
        let payload = payload.as_ref();
        let params = match &payload.chain_specific {
            BlockchainSpecific::Solana {
                recent_block_hash,
                priority_limit,
                from_address_pub_key,
                to_address_pub_key,
                has_program_id,
                ..
            } => SolanaParams {
                recent_block_hash,
                priority_limit: *priority_limit,
                from_token_account: from_address_pub_key.as_deref().filter(|s| !s.trim().is_empty()),
                to_token_account: to_address_pub_key.as_deref().filter(|s| !s.trim().is_empty()),
                token_2022: *has_program_id,
            },
            other => return Err(KeysignError::chain_mismatch(ChainFamily::Solana, other.name())),
        };

        let owner = parse_solana_address(&payload.coin.address)?;
        let public_key = payload.hex_public_key()?;
        if public_key != owner {
            return Err(KeysignError::invalid_public_key(format!(
                "{} is not the address of public key {}",
                payload.coin.address, payload.coin.hex_public_key
            )));
        }
        let recent_blockhash = parse_solana_address(params.recent_block_hash)
            .map_err(|e| KeysignError::runtime(format!("recent block hash: {}", e.message)))?;

        let mut instructions = self.compute_budget(params.priority_limit)?;
        if payload.coin.is_native_token {
            let to = parse_solana_address(&payload.to_address)?;
            let lamports = u64::try_from(payload.to_amount)
                .map_err(|_| KeysignError::runtime(format!("amount {} exceeds u64", payload.to_amount)))?;
            let mut data = SYSTEM_TRANSFER.to_le_bytes().to_vec();
            data.extend_from_slice(&lamports.to_le_bytes());
            instructions.push(SolanaInstruction {
                program_id: program(SYSTEM_PROGRAM)?,
                accounts: vec![SolanaAccountMeta::writable(owner, true), SolanaAccountMeta::writable(to, false)],
                data,
            });
            if let Some(memo) = payload.memo() {
                instructions.push(SolanaInstruction {
                    program_id: program(MEMO_PROGRAM)?,
                    accounts: vec![SolanaAccountMeta::readonly(owner, true)],
                    data: memo.as_bytes().to_vec(),
                });
            }
        } else {
            instructions.extend(self.token_instructions(payload, owner, &params)?);
        }
        log_debug!("solana", payload.coin.chain, "building transaction",
            instructions = instructions.len(), native = payload.coin.is_native_token);

        SigningInput::Solana(UnsignedSolanaTransaction {
            recent_blockhash,
            fee_payer: owner,
            instructions,
            public_key,
        })
        .encode()
    }

    fn pre_image_hashes(&self, unsigned: &[u8]) -> KeysignResult<Vec<String>> {
        let tx = decode_solana(unsigned)?;
        Ok(hex_all([get_solana_message(&tx)?]))
    }

    fn assemble(
        &self,
        unsigned: &[u8],
        signatures: &SignatureMap,
        key: &DerivedPublicKey,
    ) -> KeysignResult<SignedTransactionResult> {
        let tx = decode_solana(unsigned)?;
        key.ensure_matches(&tx.public_key)?;

        let message = get_solana_message(&tx)?;
        let response = SignatureProvider::new(signatures).get(&message)?;
        let signature = verify_ed25519(key.ed25519()?, &message, response)?;

        let compiled = compile_solana_transaction(&message, &signature);
        let hash = compiled
            .signature_id()
            .ok_or_else(|| KeysignError::runtime("compiled transaction carries no signature"))?;
        Ok(SignedTransactionResult::new(compiled.encoded(), hash))
    }
}
