//! Solana Pre-Image
//!
//! Ed25519 signs the serialized v0 message itself, no digest is applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{PreImageError, PreImageResult};

/// Solana public key (32 bytes)
pub type Pubkey = [u8; 32];

/// Solana account meta for instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolanaAccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self { pubkey, is_signer, is_writable: true }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self { pubkey, is_signer, is_writable: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<SolanaAccountMeta>,
    pub data: Vec<u8>,
}

/// Unsigned Solana transaction, single signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedSolanaTransaction {
    pub recent_blockhash: [u8; 32],
    /// Fee payer and only signer
    pub fee_payer: Pubkey,
    pub instructions: Vec<SolanaInstruction>,
    pub public_key: Vec<u8>,
}

/// Serialized v0 message (no address lookup tables)
pub fn get_solana_message(tx: &UnsignedSolanaTransaction) -> PreImageResult<Vec<u8>> {
    if tx.instructions.is_empty() {
        return Err(PreImageError::MissingField("instructions".to_string()));
    }

    let mut message = vec![0x80];

    let (accounts, header) = compile_accounts(tx);
    message.push(header.num_required_signatures);
    message.push(header.num_readonly_signed_accounts);
    message.push(header.num_readonly_unsigned_accounts);

    write_compact_u16(accounts.len() as u16, &mut message);
    for account in &accounts {
        message.extend_from_slice(account);
    }

    message.extend_from_slice(&tx.recent_blockhash);

    let index_of = |key: &Pubkey| {
        accounts
            .iter()
            .position(|a| a == key)
            .map(|i| i as u8)
            .ok_or_else(|| PreImageError::InvalidTransaction("Account not found".to_string()))
    };

    write_compact_u16(tx.instructions.len() as u16, &mut message);
    for ix in &tx.instructions {
        message.push(index_of(&ix.program_id)?);

        write_compact_u16(ix.accounts.len() as u16, &mut message);
        for acc in &ix.accounts {
            message.push(index_of(&acc.pubkey)?);
        }

        write_compact_u16(ix.data.len() as u16, &mut message);
        message.extend_from_slice(&ix.data);
    }

    // address table lookups
    write_compact_u16(0, &mut message);

    Ok(message)
}

struct MessageHeader {
    num_required_signatures: u8,
    num_readonly_signed_accounts: u8,
    num_readonly_unsigned_accounts: u8,
}

/// Order accounts: writable signers (fee payer first), readonly signers,
/// writable non-signers, readonly non-signers
fn compile_accounts(tx: &UnsignedSolanaTransaction) -> (Vec<Pubkey>, MessageHeader) {
    let mut writable_signers: BTreeSet<Pubkey> = BTreeSet::new();
    let mut readonly_signers: BTreeSet<Pubkey> = BTreeSet::new();
    let mut writable_non_signers: BTreeSet<Pubkey> = BTreeSet::new();
    let mut readonly_non_signers: BTreeSet<Pubkey> = BTreeSet::new();

    writable_signers.insert(tx.fee_payer);

    for ix in &tx.instructions {
        readonly_non_signers.insert(ix.program_id);

        for acc in &ix.accounts {
            match (acc.is_signer, acc.is_writable) {
                (true, true) => writable_signers.insert(acc.pubkey),
                (true, false) => readonly_signers.insert(acc.pubkey),
                (false, true) => writable_non_signers.insert(acc.pubkey),
                (false, false) => readonly_non_signers.insert(acc.pubkey),
            };
        }
    }

    // higher privilege wins
    for pk in &writable_signers {
        readonly_signers.remove(pk);
        writable_non_signers.remove(pk);
        readonly_non_signers.remove(pk);
    }
    for pk in &readonly_signers {
        writable_non_signers.remove(pk);
        readonly_non_signers.remove(pk);
    }
    for pk in &writable_non_signers {
        readonly_non_signers.remove(pk);
    }

    let mut accounts = vec![tx.fee_payer];
    accounts.extend(writable_signers.into_iter().filter(|pk| *pk != tx.fee_payer));
    let num_writable_signers = accounts.len();

    accounts.extend(readonly_signers);
    let num_signers = accounts.len();

    accounts.extend(writable_non_signers);
    let num_writable_non_signers = accounts.len() - num_signers;

    accounts.extend(readonly_non_signers);
    let num_readonly_unsigned = accounts.len() - num_signers - num_writable_non_signers;

    let header = MessageHeader {
        num_required_signatures: num_signers as u8,
        num_readonly_signed_accounts: (num_signers - num_writable_signers) as u8,
        num_readonly_unsigned_accounts: num_readonly_unsigned as u8,
    };
    (accounts, header)
}

/// Write compact-u16 encoding (Solana's variable-length integer)
pub(crate) fn write_compact_u16(value: u16, buf: &mut Vec<u8>) {
    if value < 0x80 {
        buf.push(value as u8);
    } else if value < 0x4000 {
        buf.push((value & 0x7f) as u8 | 0x80);
        buf.push((value >> 7) as u8);
    } else {
        buf.push((value & 0x7f) as u8 | 0x80);
        buf.push(((value >> 7) & 0x7f) as u8 | 0x80);
        buf.push((value >> 14) as u8);
    }
}
