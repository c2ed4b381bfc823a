//! Business logic layer
//!
//! Each service wraps the storage repositories with one ledger concern:
//! envelopes, transactions, splits, transfers, rollover, incomes, and
//! savings goals. Every mutating operation validates first, commits its
//! balance arithmetic atomically, and fails without partial effect.

pub mod envelope;
pub mod goal;
pub mod income;
pub mod rollover;
pub mod split;
pub mod transaction;
pub mod transfer;

pub use envelope::{EnvelopeService, MAX_ENVELOPES_PER_MONTH};
pub use goal::{
    AppliedContribution, CreateGoalInput, GoalPatch, GoalProgress, GoalService,
    PlannedContribution,
};
pub use income::{DeficitPlan, DeleteIncomeOutcome, IncomeService};
pub use rollover::{OverdraftWarning, RolloverOutcome, RolloverReport, RolloverService};
pub use split::SplitService;
pub use transaction::{
    AddOutcome, AddTransactionInput, SpendingAlert, TransactionPatch, TransactionService,
};
pub use transfer::{TransferOutcome, TransferService};
