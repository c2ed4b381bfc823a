//! Change notification channel
//!
//! Mutating services publish a `ChangeEvent` after each committed operation
//! so display layers can refresh the affected views. Subscribers receive
//! events over std mpsc channels; a dropped receiver unsubscribes itself on
//! the next publish. Events carry keys, never state - readers query the
//! ledger for current values.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::models::{EnvelopeId, MonthKey};

/// What part of the ledger changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A month's envelopes changed (created, deleted, allocation or spent moved)
    Envelopes(MonthKey),
    /// A month's transactions changed
    Transactions(MonthKey),
    /// A month's incomes changed
    Incomes(MonthKey),
    /// An envelope's savings goal changed
    Goal(EnvelopeId),
    /// A month advance seeded the target month
    MonthAdvanced {
        source: MonthKey,
        target: MonthKey,
    },
}

/// Fan-out bus for change events
pub struct ChangeBus {
    subscribers: Mutex<Vec<Sender<ChangeEvent>>>,
}

impl ChangeBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to all future change events
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (sender, receiver) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        receiver
    }

    /// Publish an event to every live subscriber
    ///
    /// Never fails the operation that triggered it; subscribers whose
    /// receiver is gone are dropped here.
    pub fn publish(&self, event: ChangeEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
