//! Identifier newtypes
//!
//! Envelopes, transactions, and incomes each carry their own UUID-backed id
//! type, so an id of one kind can never stand in for another.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_ids {
    ($($(#[$meta:meta])* $name:ident => $prefix:literal),+ $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        // Short prefixed form for logs and error messages
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let hex = self.0.simple().to_string();
                write!(f, concat!($prefix, "-{}"), &hex[..8])
            }
        }
    )+};
}

entity_ids! {
    /// Identity of an envelope, stable across the months it rolls into
    EnvelopeId => "env",
    /// Identity of a recorded expense
    TransactionId => "txn",
    /// Identity of an income record
    IncomeId => "inc",
}
