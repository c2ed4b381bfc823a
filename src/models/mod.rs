//! Core data models for the envelope ledger
//!
//! This module contains all the data structures that represent the budgeting
//! domain: envelopes, incomes, transactions, split legs, savings goals, and
//! rollover records.

pub mod envelope;
pub mod goal;
pub mod ids;
pub mod income;
pub mod money;
pub mod month;
pub mod rollover;
pub mod transaction;

pub use envelope::{Envelope, EnvelopeCategory, EnvelopeIcon};
pub use goal::{GoalPriority, SavingsGoal};
pub use ids::{EnvelopeId, IncomeId, TransactionId};
pub use income::Income;
pub use money::Money;
pub use month::MonthKey;
pub use rollover::{RolloverHistoryEntry, RolloverStrategy};
pub use transaction::{SplitLeg, Transaction, SPLIT_TOLERANCE_CENTS};
