//! envelope-ledger - household envelope-budgeting ledger core
//!
//! This library implements the invariant-preserving core of an envelope
//! budgeting system: income is assigned to named envelopes, expenses are
//! recorded against them (optionally split across several), unspent
//! allocation moves between envelopes or carries into the next month under
//! configurable rollover strategies, and savings goals cap and auto-fund
//! envelopes.
//!
//! The central invariant is that a month's "to be budgeted" figure is never
//! stored: it is always recomputed as total income minus total allocation,
//! and every operation that could move it re-validates its bounds at commit
//! time, inside the storage layer's atomic sections, so concurrent household
//! members cannot race it out of consistency.
//!
//! # Architecture
//!
//! - `config`: path resolution and tenancy scoping
//! - `error`: the ledger error taxonomy
//! - `models`: domain types (envelopes, transactions, goals, money, months)
//! - `storage`: JSON repositories with atomic writes and the balance
//!   arithmetic primitives, plus the append-only rollover history log
//! - `services`: the ledger operations themselves
//!
//! # Example
//!
//! ```rust,no_run
//! use envelope_ledger::config::{LedgerPaths, Scope};
//! use envelope_ledger::models::{EnvelopeCategory, EnvelopeIcon, Money, MonthKey};
//! use envelope_ledger::services::{EnvelopeService, IncomeService};
//! use envelope_ledger::storage::Storage;
//!
//! # fn main() -> Result<(), envelope_ledger::LedgerError> {
//! let paths = LedgerPaths::new()?.scoped(&Scope::solo("alice"));
//! let mut storage = Storage::new(paths)?;
//! storage.load_all()?;
//!
//! let month = MonthKey::current();
//! IncomeService::new(&storage).add(
//!     Money::from_units(2000, 0),
//!     "Salary",
//!     month.start_date(),
//! )?;
//!
//! let envelopes = EnvelopeService::new(&storage);
//! let groceries = envelopes.create(
//!     month,
//!     "Groceries",
//!     EnvelopeIcon::Basket,
//!     "#4caf50",
//!     EnvelopeCategory::Essential,
//! )?;
//! envelopes.allocate(month, groceries.id, Money::from_units(500, 0))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
