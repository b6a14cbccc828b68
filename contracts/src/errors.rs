//! Error types for the battle contract

use battle_fhe::FheError;
use thiserror::Error;

/// Reasons a contract call reverts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("AlreadyVoted: voter already has a ballot in this battle")]
    AlreadyVoted,

    #[error("BattleNotActive: voting is closed")]
    BattleNotActive,

    #[error("BattleStillActive: battle has not reached its end time")]
    BattleStillActive,

    #[error("NotAuthorized: caller lacks the required role")]
    NotAuthorized,

    #[error("InvalidOperator: operator must not be the zero address")]
    InvalidOperator,

    #[error("InvalidDuration: {0} seconds is outside [60, 604800]")]
    InvalidDuration(u64),

    #[error("InvalidTemplateCount: {0} is outside [2, 10]")]
    InvalidTemplateCount(u8),

    #[error("InvalidCaptionCount: {0} is outside [2, 256]")]
    InvalidCaptionCount(u16),

    #[error("InvalidProof: {0}")]
    InvalidProof(String),

    #[error("UnknownDecryptionRequest: {0}")]
    UnknownDecryptionRequest(u64),

    #[error("InvalidDecryption: expected {expected} plaintexts, got {got}")]
    InvalidDecryption { expected: usize, got: usize },

    #[error("HistoryNotFound: no completed battle #{0}")]
    HistoryNotFound(u64),

    #[error("FHE operation failed: {0}")]
    Fhe(FheError),
}

impl BattleError {
    /// Revert reason name as it appears on the wire
    pub fn revert_name(&self) -> &'static str {
        match self {
            BattleError::AlreadyVoted => "AlreadyVoted",
            BattleError::BattleNotActive => "BattleNotActive",
            BattleError::BattleStillActive => "BattleStillActive",
            BattleError::NotAuthorized => "NotAuthorized",
            BattleError::InvalidOperator => "InvalidOperator",
            BattleError::InvalidDuration(_) => "InvalidDuration",
            BattleError::InvalidTemplateCount(_) => "InvalidTemplateCount",
            BattleError::InvalidCaptionCount(_) => "InvalidCaptionCount",
            BattleError::InvalidProof(_) => "InvalidProof",
            BattleError::UnknownDecryptionRequest(_) => "UnknownDecryptionRequest",
            BattleError::InvalidDecryption { .. } => "InvalidDecryption",
            BattleError::HistoryNotFound(_) => "HistoryNotFound",
            BattleError::Fhe(_) => "FheError",
        }
    }
}

impl From<FheError> for BattleError {
    fn from(err: FheError) -> Self {
        match err {
            FheError::InvalidProof(msg) => BattleError::InvalidProof(msg),
            other => BattleError::Fhe(other),
        }
    }
}
