//! Encrypted vote submission
//!
//! One ballot goes through four bounded steps: pre-flight reads, client-side
//! encryption, broadcast and confirmation. A submitter handles one ballot at
//! a time and always becomes available again, whatever the outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use battle_contract::ContractCall;
use battle_fhe::{EncryptionGateway, FheError, FheType};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::client::{BattleReads, ChainClient};
use crate::errors::{ClientError, RevertKind, Severity};
use crate::timed::TimedClient;
use crate::types::Receipt;

/// Default ceiling on client-side encryption
pub const ENCRYPTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Vote submission failures
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("A vote submission is already in progress")]
    SubmissionInProgress,

    #[error("Already voted in battle #{0}")]
    AlreadyVoted(u64),

    #[error("Battle is not accepting votes")]
    BattleNotActive,

    #[error("Invalid {what} id {value}, must be below {limit}")]
    InvalidSelection { what: &'static str, value: u64, limit: u64 },

    #[error("Encryption timed out")]
    EncryptionTimeout,

    #[error("Encryption failed: {0}")]
    Encryption(#[from] FheError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl VoteError {
    pub fn severity(&self) -> Severity {
        match self {
            VoteError::SubmissionInProgress | VoteError::AlreadyVoted(_) | VoteError::BattleNotActive => {
                Severity::Warning
            }
            VoteError::InvalidSelection { .. } => Severity::Warning,
            VoteError::EncryptionTimeout | VoteError::Encryption(_) => Severity::Error,
            VoteError::Client(err) => err.severity(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            VoteError::SubmissionInProgress => "Please wait for your current vote to finish.".into(),
            VoteError::AlreadyVoted(_) => "You have already submitted a vote for this battle.".into(),
            VoteError::BattleNotActive => {
                "The current battle has ended. Please wait for the next battle to start.".into()
            }
            VoteError::InvalidSelection { what, .. } => format!("Please pick a valid {what}."),
            VoteError::EncryptionTimeout => "Encrypting your vote took too long. Please try again.".into(),
            VoteError::Encryption(_) => "Your vote could not be encrypted.".into(),
            VoteError::Client(err) => err.user_message(),
        }
    }
}

/// Releases the busy flag however the submission ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Submits encrypted ballots for the client's sender
pub struct VoteSubmitter<C, G> {
    client: TimedClient<C>,
    gateway: G,
    encryption_timeout: Duration,
    busy: AtomicBool,
}

impl<C: ChainClient, G: EncryptionGateway> VoteSubmitter<C, G> {
    pub fn new(client: TimedClient<C>, gateway: G) -> Self {
        Self {
            client,
            gateway,
            encryption_timeout: ENCRYPTION_TIMEOUT,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_encryption_timeout(mut self, limit: Duration) -> Self {
        self.encryption_timeout = limit;
        self
    }

    pub fn client(&self) -> &TimedClient<C> {
        &self.client
    }

    /// Whether a submission is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Vote for `template` with `caption`, `now` being the caller's clock.
    /// Returns the confirmed receipt.
    pub async fn submit(&self, template: u8, caption: u16, now: u64) -> Result<Receipt, VoteError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(VoteError::SubmissionInProgress)?;
        let voter = self.client.sender();

        let info = self.client.battle_info().await?;
        if !info.accepts_votes(now) {
            return Err(VoteError::BattleNotActive);
        }
        if template >= info.template_count {
            return Err(VoteError::InvalidSelection {
                what: "template",
                value: u64::from(template),
                limit: u64::from(info.template_count),
            });
        }
        if caption >= info.caption_count {
            return Err(VoteError::InvalidSelection {
                what: "caption",
                value: u64::from(caption),
                limit: u64::from(info.caption_count),
            });
        }
        if self.client.has_user_voted(voter).await? {
            return Err(VoteError::AlreadyVoted(info.battle_number));
        }

        let contract = self.client.contract_address();
        let encrypt = async {
            let t = self.gateway.encrypt(u64::from(template), FheType::Uint8, contract, voter).await?;
            let c = self.gateway.encrypt(u64::from(caption), FheType::Uint16, contract, voter).await?;
            Ok::<_, FheError>((t, c))
        };
        let (template_input, caption_input) = timeout(self.encryption_timeout, encrypt)
            .await
            .map_err(|_| VoteError::EncryptionTimeout)??;

        let call = ContractCall::SubmitVote {
            template: template_input,
            caption: caption_input,
        };
        let pending = self.client.submit(call).await.map_err(|err| match err {
            ClientError::Reverted(RevertKind::AlreadyVoted) => VoteError::AlreadyVoted(info.battle_number),
            other => VoteError::Client(other),
        })?;
        let hash = pending.hash();

        match pending.wait().await {
            Ok(receipt) => {
                info!(battle = info.battle_number, %voter, %hash, "Vote confirmed");
                Ok(receipt)
            }
            Err(err) => {
                warn!(battle = info.battle_number, %voter, %hash, error = %err, "Vote not confirmed");
                Err(err.into())
            }
        }
    }
}
