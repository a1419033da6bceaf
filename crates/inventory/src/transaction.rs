//! Quantity ledger entries.
//!
//! A transaction is written once and never changed. The current quantity of an
//! item is derived from them; the ledger is the authoritative history.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, TransactionId, UserId};

use crate::item::InventoryItemId;

/// Kind of quantity-changing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Pickup,
    Restock,
    Adjustment,
    Manual,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Pickup,
        TransactionType::Restock,
        TransactionType::Adjustment,
        TransactionType::Manual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Pickup => "pickup",
            TransactionType::Restock => "restock",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Manual => "manual",
        }
    }

    /// Signed change for a positive `quantity`.
    ///
    /// Pickups and adjustments remove stock; restocks and manual entries add it.
    pub fn signed_delta(self, quantity: i64) -> i64 {
        match self {
            TransactionType::Pickup | TransactionType::Adjustment => -quantity,
            TransactionType::Restock | TransactionType::Manual => quantity,
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(
                    "transaction_type",
                    format!("unknown transaction type `{s}`"),
                )
            })
    }
}

/// Before/after quantities of a prospective ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityChange {
    pub before: i64,
    pub change: i64,
    pub after: i64,
}

impl QuantityChange {
    /// Compute the effect of a `transaction_type` of `quantity` on an item
    /// currently holding `before`.
    ///
    /// Rejects non-positive quantities, overflow, and anything that would
    /// leave the item below zero.
    pub fn compute(
        before: i64,
        transaction_type: TransactionType,
        quantity: i64,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "quantity",
                "quantity must be positive",
            ));
        }
        if before < 0 {
            return Err(DomainError::invariant("current quantity is negative"));
        }

        let change = transaction_type.signed_delta(quantity);
        let after = before
            .checked_add(change)
            .ok_or_else(|| DomainError::validation("quantity", "quantity is too large"))?;

        if after < 0 {
            return Err(DomainError::validation(
                "quantity",
                format!(
                    "{transaction_type} of {quantity} would go negative (current quantity {before})"
                ),
            ));
        }

        Ok(Self {
            before,
            change,
            after,
        })
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    pub item_id: InventoryItemId,
    pub transaction_type: TransactionType,
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub actor_id: UserId,
    pub actor_name: String,
    /// Who was on the other side (e.g. the driver collecting goods).
    pub counterpart_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    /// `quantity_after == quantity_before + quantity_change` and non-negative.
    pub fn is_consistent(&self) -> bool {
        self.quantity_before.checked_add(self.quantity_change) == Some(self.quantity_after)
            && self.quantity_after >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pickup_beyond_current_quantity_is_rejected() {
        let err = QuantityChange::compute(3, TransactionType::Pickup, 5).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
        assert!(err.to_string().contains("would go negative"));
    }

    #[test]
    fn restock_adds_and_adjustment_removes() {
        let restock = QuantityChange::compute(4, TransactionType::Restock, 6).unwrap();
        assert_eq!((restock.before, restock.change, restock.after), (4, 6, 10));

        let adjust = QuantityChange::compute(10, TransactionType::Adjustment, 10).unwrap();
        assert_eq!(adjust.after, 0);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = QuantityChange::compute(4, TransactionType::Manual, 0).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let err = QuantityChange::compute(i64::MAX, TransactionType::Restock, 1).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
    }

    #[test]
    fn parses_wire_names() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
        assert!("refund".parse::<TransactionType>().is_err());
    }

    fn any_type() -> impl Strategy<Value = TransactionType> {
        prop::sample::select(TransactionType::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: accepted changes satisfy after = before + signed(quantity)
        /// and never go negative; rejected ones would have.
        #[test]
        fn accepted_changes_balance_and_stay_non_negative(
            before in 0i64..100_000,
            transaction_type in any_type(),
            quantity in 1i64..100_000,
        ) {
            let signed = transaction_type.signed_delta(quantity);
            match QuantityChange::compute(before, transaction_type, quantity) {
                Ok(change) => {
                    prop_assert_eq!(change.before, before);
                    prop_assert_eq!(change.change, signed);
                    prop_assert_eq!(change.after, before + signed);
                    prop_assert!(change.after >= 0);
                }
                Err(err) => {
                    prop_assert!(before + signed < 0);
                    prop_assert_eq!(err.field(), Some("quantity"));
                }
            }
        }
    }
}
