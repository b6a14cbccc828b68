//! Meme Battle Operator Worker
//!
//! A cron-style loop that ends expired battles. Several workers may run
//! against the same contract; the contract's `endBattle` precondition is
//! what keeps the effect exactly-once, the worker only avoids wasting
//! transactions.
//!
//! # Tick
//!
//! ```text
//!   in-flight tx? ──yes──> receipt? ──none──────────> wait
//!        │                    ├──success──> processed + cooldown
//!        │                    ├──reverted/stale──┐
//!        │                    └──query error──> wait
//!        no <────────────────────────────────────┘
//!        │
//!   cooldown? ──yes──> skip
//!        │
//!   read battle ──> processed / not expired? ──> skip
//!        │
//!   submit endBattle ──> in-flight
//! ```
//!
//! The branching lives in [`decide`] as pure functions; [`OperatorWorker`]
//! only performs the reads and writes.

pub mod config;
pub mod decide;
pub mod errors;
pub mod state;
pub mod worker;

pub use config::WorkerConfig;
pub use decide::{Plan, ReceiptObservation, ReceiptOutcome, SkipReason, SubmitOutcome};
pub use errors::{WorkerError, WorkerResult};
pub use state::{InFlight, Processed, WorkerState};
pub use worker::{unix_now, OperatorWorker, TickOutcome};
