use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateId, DomainError, DomainResult};

use crate::transaction::{InventoryTransaction, QuantityChange, TransactionType};

/// Sum of per-variant quantities; overflow is a validation error on `field`.
pub fn checked_total(
    quantities: impl IntoIterator<Item = i64>,
    field: &'static str,
) -> DomainResult<i64> {
    quantities.into_iter().try_fold(0i64, |acc, q| {
        acc.checked_add(q)
            .ok_or_else(|| DomainError::validation(field, "total quantity is too large"))
    })
}

/// Inventory item identifier (one variant within a record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A distinct size/color combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Display label, unique within a record (e.g. "M / Navy").
    pub label: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl Variant {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            size: None,
            color: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Quantity reset performed by a partial-pickup split.
///
/// Splits are structural and bypass the ledger, so the ledger invariant is
/// checked against whichever of the last transaction / last split is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBaseline {
    pub quantity: i64,
    /// Number of ledger entries that existed when the split happened.
    pub transaction_count: usize,
    pub split_at: DateTime<Utc>,
}

/// One variant within an inventory record, with its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    variant: Variant,
    expected_quantity: i64,
    verified: bool,
    verified_at: Option<DateTime<Utc>>,
    transactions: Vec<InventoryTransaction>,
    baseline: Option<SplitBaseline>,
}

impl InventoryItem {
    pub fn new(id: InventoryItemId, variant: Variant, quantity: i64) -> Self {
        Self {
            id,
            variant,
            expected_quantity: quantity,
            verified: false,
            verified_at: None,
            transactions: Vec::new(),
            baseline: None,
        }
    }

    pub fn id(&self) -> InventoryItemId {
        self.id
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Quantity currently believed present.
    pub fn expected_quantity(&self) -> i64 {
        self.expected_quantity
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Ledger entries, most recent first.
    ///
    /// Every call starts a fresh pass over the same finite history.
    pub fn history(&self) -> impl Iterator<Item = &InventoryTransaction> + '_ {
        self.transactions.iter().rev()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn last_split(&self) -> Option<&SplitBaseline> {
        self.baseline.as_ref()
    }

    /// `expected_quantity` equals the newest ledger entry's `quantity_after`
    /// (or the newest split baseline, if that came later) and is non-negative.
    pub fn ledger_matches_quantity(&self) -> bool {
        let derived = match (self.transactions.last(), self.baseline) {
            (Some(_), Some(b)) if b.transaction_count >= self.transactions.len() => b.quantity,
            (Some(tx), _) => tx.quantity_after,
            (None, Some(b)) => b.quantity,
            (None, None) => return self.expected_quantity >= 0,
        };
        derived == self.expected_quantity && self.expected_quantity >= 0
    }

    pub(crate) fn plan_change(
        &self,
        transaction_type: TransactionType,
        quantity: i64,
    ) -> DomainResult<QuantityChange> {
        QuantityChange::compute(self.expected_quantity, transaction_type, quantity)
    }

    pub(crate) fn append_transaction(&mut self, transaction: InventoryTransaction) {
        self.expected_quantity = transaction.quantity_after;
        self.transactions.push(transaction);
    }

    pub(crate) fn mark_verified(&mut self, verified: bool, at: DateTime<Utc>) {
        self.verified = verified;
        self.verified_at = verified.then_some(at);
    }

    pub(crate) fn reset_after_split(&mut self, remaining: i64, at: DateTime<Utc>) {
        self.expected_quantity = remaining;
        self.baseline = Some(SplitBaseline {
            quantity: remaining,
            transaction_count: self.transactions.len(),
            split_at: at,
        });
    }
}
