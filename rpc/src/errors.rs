//! Client error types
//!
//! Contract reverts, transport failures and transaction lifecycle failures
//! are distinct variants, so callers can decide what to retry without
//! parsing strings.

use std::fmt;

use battle_contract::BattleError;
use thiserror::Error;

use crate::types::TxHash;

/// Contract precondition that rejected a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertKind {
    AlreadyVoted,
    BattleNotActive,
    BattleStillActive,
    NotAuthorized,
    InvalidOperator,
    InvalidDuration,
    /// Unrecognised revert reason, kept verbatim
    Other(String),
}

impl RevertKind {
    /// Custom errors the contract declares, in ABI order
    pub const KNOWN: [RevertKind; 6] = [
        RevertKind::AlreadyVoted,
        RevertKind::BattleNotActive,
        RevertKind::BattleStillActive,
        RevertKind::NotAuthorized,
        RevertKind::InvalidOperator,
        RevertKind::InvalidDuration,
    ];

    /// Solidity error signature, the preimage of the 4-byte selector
    pub fn signature(&self) -> &str {
        match self {
            RevertKind::AlreadyVoted => "AlreadyVoted()",
            RevertKind::BattleNotActive => "BattleNotActive()",
            RevertKind::BattleStillActive => "BattleStillActive()",
            RevertKind::NotAuthorized => "NotAuthorized()",
            RevertKind::InvalidOperator => "InvalidOperator()",
            RevertKind::InvalidDuration => "InvalidDuration()",
            RevertKind::Other(reason) => reason,
        }
    }

    /// Classify a free-form revert message
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("alreadyvoted") || lower.contains("already voted") {
            RevertKind::AlreadyVoted
        } else if lower.contains("battlestillactive") || lower.contains("battle still active") {
            RevertKind::BattleStillActive
        } else if lower.contains("battlenotactive") || lower.contains("battle not active") {
            RevertKind::BattleNotActive
        } else if lower.contains("notauthorized")
            || lower.contains("not authorized")
            || lower.contains("only operator")
            || lower.contains("only owner")
        {
            RevertKind::NotAuthorized
        } else if lower.contains("invalidoperator") || lower.contains("invalid operator") {
            RevertKind::InvalidOperator
        } else if lower.contains("invalidduration") || lower.contains("invalid duration") {
            RevertKind::InvalidDuration
        } else {
            RevertKind::Other(message.to_string())
        }
    }
}

impl fmt::Display for RevertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertKind::Other(reason) => write!(f, "{reason}"),
            known => write!(f, "{}", known.signature().trim_end_matches("()")),
        }
    }
}

impl From<&BattleError> for RevertKind {
    fn from(err: &BattleError) -> Self {
        match err {
            BattleError::AlreadyVoted => RevertKind::AlreadyVoted,
            BattleError::BattleNotActive => RevertKind::BattleNotActive,
            BattleError::BattleStillActive => RevertKind::BattleStillActive,
            BattleError::NotAuthorized => RevertKind::NotAuthorized,
            BattleError::InvalidOperator => RevertKind::InvalidOperator,
            BattleError::InvalidDuration(_) => RevertKind::InvalidDuration,
            other => RevertKind::Other(other.to_string()),
        }
    }
}

/// Where a transaction ran out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    /// Waiting for the node to accept the transaction
    Submission,
    /// Waiting for a receipt
    Confirmation,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStage::Submission => write!(f, "submission"),
            TxStage::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// How loudly a failure should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Chain client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Call reverted: {0}")]
    Reverted(RevertKind),

    #[error("Transaction {hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    TransactionReverted { hash: TxHash, reason: Option<String> },

    #[error("Transaction timed out during {stage}")]
    TransactionTimeout { stage: TxStage },

    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Nonce conflict")]
    NonceConflict,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client is read-only")]
    ReadOnly,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Classify a provider or wallet error message
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("nonce too low")
            || lower.contains("nonce too high")
            || lower.contains("replacement transaction underpriced")
            || lower.contains("already known")
        {
            ClientError::NonceConflict
        } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            ClientError::InsufficientFunds
        } else if lower.contains("user rejected") || lower.contains("user denied") {
            ClientError::UserRejected
        } else if lower.contains("revert") {
            ClientError::Reverted(RevertKind::from_message(message))
        } else {
            ClientError::Network(message.to_string())
        }
    }

    /// Revert reason, if this is a contract revert
    pub fn revert_kind(&self) -> Option<&RevertKind> {
        match self {
            ClientError::Reverted(kind) => Some(kind),
            _ => None,
        }
    }

    /// Transport failures are the only ones worth an automatic retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    pub fn severity(&self) -> Severity {
        match self {
            ClientError::UserRejected => Severity::Info,
            ClientError::Reverted(
                RevertKind::AlreadyVoted | RevertKind::BattleNotActive | RevertKind::BattleStillActive,
            )
            | ClientError::TransactionTimeout { .. }
            | ClientError::NonceConflict => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Short message fit for an end user
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Reverted(RevertKind::AlreadyVoted) => {
                "You have already submitted a vote for this battle.".into()
            }
            ClientError::Reverted(RevertKind::BattleNotActive) => {
                "The current battle has ended. Please wait for the next battle to start.".into()
            }
            ClientError::Reverted(RevertKind::NotAuthorized) => {
                "This account is not allowed to perform that action.".into()
            }
            ClientError::Reverted(kind) => format!("The contract rejected the call ({kind})."),
            ClientError::TransactionReverted { .. } => "The transaction failed on chain.".into(),
            ClientError::TransactionTimeout { stage: TxStage::Submission } => {
                "The network did not accept the transaction in time.".into()
            }
            ClientError::TransactionTimeout { stage: TxStage::Confirmation } => {
                "Transaction took too long to confirm. It may still be processing.".into()
            }
            ClientError::UserRejected => "Transaction was cancelled.".into(),
            ClientError::NonceConflict => {
                "Multiple transactions detected. Please wait a few seconds and try again.".into()
            }
            ClientError::InsufficientFunds => "Not enough ETH to pay for the transaction.".into(),
            ClientError::Network(_) => "Unable to reach the network. Please check your connection.".into(),
            ClientError::InvalidResponse(_) => {
                "The contract answered in an unexpected format. It may be incompatible.".into()
            }
            ClientError::ReadOnly => "Connect a wallet to send transactions.".into(),
            ClientError::Config(msg) => msg.clone(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
