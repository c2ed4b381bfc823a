//! Split service
//!
//! Distributes one expense across several envelopes. The primary envelope
//! was already credited with the full amount when the expense was recorded,
//! so creating a split reverses that credit and applies every leg's share in
//! the same atomic commit - the naive approach of crediting legs on top
//! double-counts the primary envelope.

use log::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    EnvelopeId, Money, MonthKey, SplitLeg, Transaction, TransactionId, SPLIT_TOLERANCE_CENTS,
};
use crate::storage::{ChangeEvent, Storage};

/// Service for split transaction management
pub struct SplitService<'a> {
    storage: &'a Storage,
}

impl<'a> SplitService<'a> {
    /// Create a new split service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Distribute an existing transaction across several envelopes
    ///
    /// Validates everything before touching any envelope: at least two legs,
    /// positive leg amounts, every envelope present in the transaction's
    /// month, and leg total matching `total` within one cent. Then, in one
    /// commit, the primary envelope's initial full-amount credit reverses
    /// and each leg's share applies. The transaction's amount becomes
    /// `total` and the first leg's envelope becomes its primary.
    pub fn create_split(
        &self,
        parent_id: TransactionId,
        total: Money,
        legs: Vec<SplitLeg>,
    ) -> LedgerResult<Transaction> {
        let mut txn = self.get_parent(parent_id)?;

        if txn.is_split() {
            return Err(LedgerError::Validation(
                "Transaction is already split; use update_split".into(),
            ));
        }

        self.validate_legs(txn.month, total, &legs)?;

        // Reverse the primary credit, apply every leg, one commit
        let mut moves: Vec<(MonthKey, EnvelopeId, Money)> =
            vec![(txn.month, txn.envelope_id, -txn.amount)];
        moves.extend(legs.iter().map(|leg| (txn.month, leg.envelope_id, leg.amount)));
        self.storage.envelopes.commit_spent_moves(&moves)?;

        txn.amount = total;
        txn.envelope_id = legs[0].envelope_id;
        txn.splits = legs;
        txn.updated_at = chrono::Utc::now();

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.envelopes.save()?;
        self.storage.transactions.save()?;
        self.storage.events.publish(ChangeEvent::Transactions(txn.month));
        self.storage.events.publish(ChangeEvent::Envelopes(txn.month));

        info!(
            "split transaction {} across {} envelopes",
            txn.id,
            txn.splits.len()
        );
        Ok(txn)
    }

    /// Replace a split's distribution
    ///
    /// Validates the new legs against the new total before any reversal, so
    /// a bad update leaves no partial state; then every old leg reverses and
    /// every new leg applies in one commit.
    pub fn update_split(
        &self,
        parent_id: TransactionId,
        new_total: Money,
        new_legs: Vec<SplitLeg>,
    ) -> LedgerResult<Transaction> {
        let mut txn = self.get_parent(parent_id)?;

        if !txn.is_split() {
            return Err(LedgerError::Validation(
                "Transaction is not split; use create_split".into(),
            ));
        }

        self.validate_legs(txn.month, new_total, &new_legs)?;

        let mut moves: Vec<(MonthKey, EnvelopeId, Money)> = txn
            .splits
            .iter()
            .map(|leg| (txn.month, leg.envelope_id, -leg.amount))
            .collect();
        moves.extend(
            new_legs
                .iter()
                .map(|leg| (txn.month, leg.envelope_id, leg.amount)),
        );
        self.storage.envelopes.commit_spent_moves(&moves)?;

        txn.amount = new_total;
        txn.envelope_id = new_legs[0].envelope_id;
        txn.splits = new_legs;
        txn.updated_at = chrono::Utc::now();

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.envelopes.save()?;
        self.storage.transactions.save()?;
        self.storage.events.publish(ChangeEvent::Transactions(txn.month));
        self.storage.events.publish(ChangeEvent::Envelopes(txn.month));

        info!("redistributed split transaction {}", txn.id);
        Ok(txn)
    }

    /// Each leg's share of the total, as display percentages
    ///
    /// A derived view; nothing is stored.
    pub fn leg_percentages(txn: &Transaction) -> Vec<(EnvelopeId, f64)> {
        if txn.amount.is_zero() {
            return Vec::new();
        }
        txn.splits
            .iter()
            .map(|leg| {
                (
                    leg.envelope_id,
                    leg.amount.cents() as f64 * 100.0 / txn.amount.cents() as f64,
                )
            })
            .collect()
    }

    fn get_parent(&self, parent_id: TransactionId) -> LedgerResult<Transaction> {
        self.storage
            .transactions
            .get(parent_id)?
            .ok_or_else(|| LedgerError::transaction_not_found(parent_id.to_string()))
    }

    /// Fail-fast validation, before any mutation
    fn validate_legs(&self, month: MonthKey, total: Money, legs: &[SplitLeg]) -> LedgerResult<()> {
        if !total.is_positive() {
            return Err(LedgerError::Validation(
                "Split total must be positive".into(),
            ));
        }

        if legs.len() < 2 {
            return Err(LedgerError::Validation(
                "A split needs at least two legs".into(),
            ));
        }

        if legs.iter().any(|leg| !leg.amount.is_positive()) {
            return Err(LedgerError::Validation(
                "Split leg amounts must be positive".into(),
            ));
        }

        let legs_total: Money = legs.iter().map(|leg| leg.amount).sum();
        if (legs_total - total).abs().cents() > SPLIT_TOLERANCE_CENTS {
            return Err(LedgerError::SplitMismatch {
                expected: total,
                actual: legs_total,
            });
        }

        for leg in legs {
            if self.storage.envelopes.get(month, leg.envelope_id)?.is_none() {
                return Err(LedgerError::envelope_not_found(leg.envelope_id.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{Envelope, EnvelopeCategory, EnvelopeIcon, Income};
    use crate::services::transaction::{AddTransactionInput, TransactionService};
    use crate::services::EnvelopeService;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn month() -> MonthKey {
        MonthKey::new(2025, 1)
    }

    fn setup_envelope(storage: &Storage, name: &str, allocated_cents: i64) -> Envelope {
        let envelope = EnvelopeService::new(storage)
            .create(
                month(),
                name,
                EnvelopeIcon::Basket,
                "#4caf50",
                EnvelopeCategory::Essential,
            )
            .unwrap();
        if allocated_cents > 0 {
            storage
                .incomes
                .upsert(Income::new(
                    Money::from_cents(allocated_cents),
                    "Funding",
                    month().start_date(),
                ))
                .unwrap();
            EnvelopeService::new(storage)
                .allocate(month(), envelope.id, Money::from_cents(allocated_cents))
                .unwrap();
        }
        envelope
    }

    fn add_expense(storage: &Storage, envelope_id: EnvelopeId, cents: i64) -> TransactionId {
        TransactionService::new(storage)
            .add(AddTransactionInput {
                envelope_id,
                amount: Money::from_cents(cents),
                description: "Mixed basket".into(),
                merchant: None,
                date: Some(month().start_date()),
                notes: None,
            })
            .unwrap()
            .transaction
            .id
    }

    fn spent(storage: &Storage, envelope_id: EnvelopeId) -> i64 {
        storage
            .envelopes
            .get(month(), envelope_id)
            .unwrap()
            .unwrap()
            .spent
            .cents()
    }

    #[test]
    fn test_split_does_not_double_count_primary() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let service = SplitService::new(&storage);

        // pre-existing spending of 90.00, then a 50.00 expense
        add_expense(&storage, groceries.id, 9000);
        let parent = add_expense(&storage, groceries.id, 5000);
        assert_eq!(spent(&storage, groceries.id), 14000);

        // redistribute 30.00 to groceries and 20.00 to leisure
        let txn = service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap();

        // 90 + 30, not 90 + 50 + 30
        assert_eq!(spent(&storage, groceries.id), 12000);
        assert_eq!(spent(&storage, leisure.id), 2000);
        assert!(txn.is_split());
        assert_eq!(txn.amount.cents(), 5000);
    }

    #[test]
    fn test_split_mismatch_rejected_before_any_mutation() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);

        let err = service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(leisure.id, Money::from_cents(1000)),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::SplitMismatch { .. }));

        // nothing moved
        assert_eq!(spent(&storage, groceries.id), 5000);
        assert_eq!(spent(&storage, leisure.id), 0);
    }

    #[test]
    fn test_split_within_one_cent_tolerance() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);

        // 49.99 split against a 50.00 total is accepted
        service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(2999)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap();
        assert_eq!(spent(&storage, groceries.id), 2999);
        assert_eq!(spent(&storage, leisure.id), 2000);
    }

    #[test]
    fn test_split_requires_two_legs_and_known_envelopes() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);

        let err = service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![SplitLeg::new(groceries.id, Money::from_cents(5000))],
            )
            .unwrap_err();
        assert!(err.is_validation());

        let err = service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(EnvelopeId::new(), Money::from_cents(2000)),
                ],
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(spent(&storage, groceries.id), 5000);
    }

    #[test]
    fn test_update_split_reverses_old_legs() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let transport = setup_envelope(&storage, "Transport", 0);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);
        service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap();

        // re-split with a new total and a third envelope
        let txn = service
            .update_split(
                parent,
                Money::from_cents(6000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(1000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2500)),
                    SplitLeg::new(transport.id, Money::from_cents(2500)),
                ],
            )
            .unwrap();

        assert_eq!(spent(&storage, groceries.id), 1000);
        assert_eq!(spent(&storage, leisure.id), 2500);
        assert_eq!(spent(&storage, transport.id), 2500);
        assert_eq!(txn.amount.cents(), 6000);
        assert_eq!(txn.splits.len(), 3);
    }

    #[test]
    fn test_update_split_fail_fast_leaves_state_untouched() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);
        service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap();

        let err = service
            .update_split(
                parent,
                Money::from_cents(6000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(1000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::SplitMismatch { .. }));

        assert_eq!(spent(&storage, groceries.id), 3000);
        assert_eq!(spent(&storage, leisure.id), 2000);
    }

    #[test]
    fn test_leg_percentages() {
        let (_tmp, storage) = create_test_storage();
        let groceries = setup_envelope(&storage, "Groceries", 10000);
        let leisure = setup_envelope(&storage, "Leisure", 0);
        let service = SplitService::new(&storage);

        let parent = add_expense(&storage, groceries.id, 5000);
        let txn = service
            .create_split(
                parent,
                Money::from_cents(5000),
                vec![
                    SplitLeg::new(groceries.id, Money::from_cents(3000)),
                    SplitLeg::new(leisure.id, Money::from_cents(2000)),
                ],
            )
            .unwrap();

        let percentages = SplitService::leg_percentages(&txn);
        assert_eq!(percentages.len(), 2);
        assert!((percentages[0].1 - 60.0).abs() < f64::EPSILON);
        assert!((percentages[1].1 - 40.0).abs() < f64::EPSILON);
    }
}
