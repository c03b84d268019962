//! Structured memo operations
//!
//! Human-composed memos such as `FREEZE:ENERGY:1000000`, `merge:thor.kuji`
//! or `DYDX_VOTE:YES:42` are parsed exactly once, per chain family, into an
//! [`Operation`]. Builders match on the enum instead of re-splitting strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::KeysignError;
use crate::types::ChainFamily;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("memo {memo:?}: missing field {field}")]
    MissingField { memo: String, field: &'static str },

    #[error("memo {memo:?}: invalid {field} {value:?}")]
    InvalidField {
        memo: String,
        field: &'static str,
        value: String,
    },
}

impl From<OperationError> for KeysignError {
    fn from(e: OperationError) -> Self {
        KeysignError::runtime(e.to_string())
    }
}

/// Tron staking resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TronResource {
    Bandwidth = 0,
    Energy = 1,
}

/// Governance vote option, numbered as in `cosmos.gov.v1beta1.VoteOption`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    Yes = 1,
    Abstain = 2,
    No = 3,
    NoWithVeto = 4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// No memo
    None,
    /// Free-form memo carried as-is
    Plain(String),
    TronFreeze {
        resource: TronResource,
        amount: Option<u128>,
        receiver: Option<String>,
    },
    TronUnfreeze {
        resource: TronResource,
        amount: Option<u128>,
        receiver: Option<String>,
    },
    /// THORChain `merge:<denom>`
    Merge { denom: String },
    /// THORChain `unmerge:<denom>:<shares>`
    Unmerge { denom: String, shares: String },
    /// dYdX `DYDX_VOTE:<option>:<proposal>`
    DydxVote { option: VoteOption, proposal_id: u64 },
    /// Cosmos `switch:` memo, forces a bank send
    Switch(String),
    TonStake,
    /// `TON_UNSTAKE[:amount]`; no amount withdraws everything
    TonUnstake { amount: Option<u128> },
}

impl Operation {
    /// Parse `memo` for the given chain family.
    ///
    /// Only the family's own structured prefixes are recognized; any other
    /// memo is returned as [`Operation::Plain`]. A recognized prefix with
    /// malformed fields is an error, never a plain memo.
    pub fn parse(family: ChainFamily, memo: Option<&str>) -> Result<Operation, OperationError> {
        let memo = match memo.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => m,
            None => return Ok(Operation::None),
        };

        match family {
            ChainFamily::Tron => parse_tron(memo),
            ChainFamily::Thorchain => parse_thorchain(memo),
            ChainFamily::Cosmos => parse_cosmos(memo),
            ChainFamily::Ton => parse_ton(memo),
            _ => Ok(Operation::Plain(memo.to_string())),
        }
    }

    /// Memo text to place in the transaction, if any
    pub fn memo_text(&self) -> Option<&str> {
        match self {
            Operation::Plain(m) | Operation::Switch(m) => Some(m),
            _ => None,
        }
    }
}

fn parse_tron(memo: &str) -> Result<Operation, OperationError> {
    let upper = memo.to_uppercase();
    let freeze = upper.starts_with("FREEZE:");
    let unfreeze = upper.starts_with("UNFREEZE:");
    if !freeze && !unfreeze {
        return Ok(Operation::Plain(memo.to_string()));
    }

    let parts: Vec<&str> = memo.split(':').collect();
    let resource_str = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(memo, "resource"))?;
    let resource = match resource_str.to_uppercase().as_str() {
        "BANDWIDTH" => TronResource::Bandwidth,
        "ENERGY" => TronResource::Energy,
        other => return Err(invalid(memo, "resource", other)),
    };

    let amount = match parts.get(2).filter(|s| !s.is_empty()) {
        Some(a) => Some(a.parse::<u128>().map_err(|_| invalid(memo, "amount", a))?),
        None => None,
    };
    let receiver = parts
        .get(3)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    if parts.len() > 4 {
        return Err(invalid(memo, "field count", &parts.len().to_string()));
    }

    Ok(if freeze {
        Operation::TronFreeze { resource, amount, receiver }
    } else {
        Operation::TronUnfreeze { resource, amount, receiver }
    })
}

fn parse_thorchain(memo: &str) -> Result<Operation, OperationError> {
    let lower = memo.to_lowercase();
    if lower.starts_with("unmerge:") {
        let parts: Vec<&str> = memo.split(':').collect();
        let denom = parts
            .get(1)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(memo, "denom"))?;
        let shares = parts
            .get(2)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(memo, "shares"))?;
        if !shares.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(memo, "shares", shares));
        }
        return Ok(Operation::Unmerge {
            denom: denom.to_lowercase(),
            shares: shares.to_string(),
        });
    }
    if lower.starts_with("merge:") {
        let denom = memo.get(6..).unwrap_or("").trim();
        if denom.is_empty() {
            return Err(missing(memo, "denom"));
        }
        return Ok(Operation::Merge { denom: denom.to_lowercase() });
    }
    Ok(Operation::Plain(memo.to_string()))
}

fn parse_cosmos(memo: &str) -> Result<Operation, OperationError> {
    if memo.starts_with("DYDX_VOTE:") {
        let parts: Vec<&str> = memo.split(':').collect();
        let option_str = parts
            .get(1)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(memo, "vote option"))?;
        let option = match option_str.to_uppercase().as_str() {
            "YES" | "VOTE_OPTION_YES" => VoteOption::Yes,
            "ABSTAIN" | "VOTE_OPTION_ABSTAIN" => VoteOption::Abstain,
            "NO" | "VOTE_OPTION_NO" => VoteOption::No,
            "NO_WITH_VETO" | "NOWITHVETO" | "VOTE_OPTION_NO_WITH_VETO" => VoteOption::NoWithVeto,
            other => return Err(invalid(memo, "vote option", other)),
        };
        let id_str = parts
            .get(2)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(memo, "proposal id"))?;
        let proposal_id = id_str
            .parse::<u64>()
            .map_err(|_| invalid(memo, "proposal id", id_str))?;
        return Ok(Operation::DydxVote { option, proposal_id });
    }
    if memo.to_lowercase().starts_with("switch:") {
        return Ok(Operation::Switch(memo.to_string()));
    }
    Ok(Operation::Plain(memo.to_string()))
}

fn parse_ton(memo: &str) -> Result<Operation, OperationError> {
    if memo == "TON_STAKE" {
        return Ok(Operation::TonStake);
    }
    if memo == "TON_UNSTAKE" {
        return Ok(Operation::TonUnstake { amount: None });
    }
    if let Some(rest) = memo.strip_prefix("TON_UNSTAKE:") {
        let amount = rest
            .trim()
            .parse::<u128>()
            .map_err(|_| invalid(memo, "amount", rest))?;
        return Ok(Operation::TonUnstake { amount: Some(amount) });
    }
    Ok(Operation::Plain(memo.to_string()))
}

fn missing(memo: &str, field: &'static str) -> OperationError {
    OperationError::MissingField { memo: memo.to_string(), field }
}

fn invalid(memo: &str, field: &'static str, value: &str) -> OperationError {
    OperationError::InvalidField {
        memo: memo.to_string(),
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tron_freeze_with_amount_and_receiver() {
        let op = Operation::parse(ChainFamily::Tron, Some("FREEZE:ENERGY:1000000:TXYZ")).unwrap();
        assert_eq!(
            op,
            Operation::TronFreeze {
                resource: TronResource::Energy,
                amount: Some(1_000_000),
                receiver: Some("TXYZ".to_string()),
            }
        );
    }

    #[test]
    fn test_tron_unfreeze_without_amount() {
        let op = Operation::parse(ChainFamily::Tron, Some("UNFREEZE:BANDWIDTH")).unwrap();
        assert_eq!(
            op,
            Operation::TronUnfreeze {
                resource: TronResource::Bandwidth,
                amount: None,
                receiver: None,
            }
        );
    }

    #[test]
    fn test_tron_bad_resource_is_error() {
        let err = Operation::parse(ChainFamily::Tron, Some("FREEZE:WATER:1")).unwrap_err();
        assert!(matches!(err, OperationError::InvalidField { field: "resource", .. }));
    }

    #[test]
    fn test_tron_bad_amount_is_error() {
        assert!(Operation::parse(ChainFamily::Tron, Some("FREEZE:ENERGY:1e6")).is_err());
    }

    #[test]
    fn test_freeze_memo_on_other_chain_is_plain() {
        let op = Operation::parse(ChainFamily::Utxo, Some("FREEZE:ENERGY:1")).unwrap();
        assert_eq!(op, Operation::Plain("FREEZE:ENERGY:1".to_string()));
    }

    #[test]
    fn test_merge_and_unmerge() {
        assert_eq!(
            Operation::parse(ChainFamily::Thorchain, Some("merge:THOR.KUJI")).unwrap(),
            Operation::Merge { denom: "thor.kuji".to_string() }
        );
        assert_eq!(
            Operation::parse(ChainFamily::Thorchain, Some("unmerge:thor.kuji:1500")).unwrap(),
            Operation::Unmerge {
                denom: "thor.kuji".to_string(),
                shares: "1500".to_string(),
            }
        );
        assert!(Operation::parse(ChainFamily::Thorchain, Some("unmerge:thor.kuji")).is_err());
    }

    #[test]
    fn test_swap_memo_is_plain_on_thorchain() {
        let memo = "=:ETH.ETH:0xabc:0/1/0:vi:50";
        assert_eq!(
            Operation::parse(ChainFamily::Thorchain, Some(memo)).unwrap(),
            Operation::Plain(memo.to_string())
        );
    }

    #[test]
    fn test_dydx_vote() {
        assert_eq!(
            Operation::parse(ChainFamily::Cosmos, Some("DYDX_VOTE:NO_WITH_VETO:42")).unwrap(),
            Operation::DydxVote { option: VoteOption::NoWithVeto, proposal_id: 42 }
        );
        assert!(Operation::parse(ChainFamily::Cosmos, Some("DYDX_VOTE:YES:x")).is_err());
    }

    #[test]
    fn test_switch_memo() {
        let op = Operation::parse(ChainFamily::Cosmos, Some("switch:thor1abc")).unwrap();
        assert_eq!(op.memo_text(), Some("switch:thor1abc"));
    }

    #[test]
    fn test_ton_staking() {
        assert_eq!(Operation::parse(ChainFamily::Ton, Some("TON_STAKE")).unwrap(), Operation::TonStake);
        assert_eq!(
            Operation::parse(ChainFamily::Ton, Some("TON_UNSTAKE:5000")).unwrap(),
            Operation::TonUnstake { amount: Some(5000) }
        );
        assert!(Operation::parse(ChainFamily::Ton, Some("TON_UNSTAKE:all")).is_err());
    }

    #[test]
    fn test_empty_memo() {
        assert_eq!(Operation::parse(ChainFamily::Ton, Some("   ")).unwrap(), Operation::None);
        assert_eq!(Operation::parse(ChainFamily::Evm, None).unwrap(), Operation::None);
    }
}
