//! Proportional split of a record's quantities for a partial pickup.
//!
//! For a record holding `T` units and a pickup of `P` (0 < P < T), each variant
//! holding `q` becomes `round(q * P / T)` on the archived record and
//! `round(q * (T - P) / T)` on the remaining one.
//!
//! Rounding is half-up, computed in exact integer arithmetic. The two shares of
//! a variant sum to `q`, except when `q * P / T` lands exactly on a half: both
//! shares then round up and the variant gains one unit. Drift is therefore
//! deterministic and never negative, bounded by the number of variants.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

use crate::item::{InventoryItem, InventoryItemId, Variant};

/// How one variant is divided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLine {
    pub item_id: InventoryItemId,
    pub variant: Variant,
    pub original_quantity: i64,
    pub archived_quantity: i64,
    pub remaining_quantity: i64,
}

/// Per-variant division of a partial pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub total: i64,
    pub pickup_quantity: i64,
    pub lines: Vec<SplitLine>,
}

impl SplitPlan {
    /// Plan a partial pickup of `pickup_quantity` across `items`.
    pub fn compute<'a>(
        items: impl IntoIterator<Item = &'a InventoryItem>,
        pickup_quantity: i64,
    ) -> DomainResult<Self> {
        let items: Vec<&InventoryItem> = items.into_iter().collect();

        let total = items.iter().try_fold(0i64, |acc, item| {
            acc.checked_add(item.expected_quantity())
                .ok_or_else(|| DomainError::invariant("record total quantity overflows"))
        })?;

        if total <= 1 {
            return Err(DomainError::validation(
                "pickup_quantity",
                "record does not hold enough units for a partial pickup",
            ));
        }
        if pickup_quantity <= 0 || pickup_quantity >= total {
            return Err(DomainError::validation(
                "pickup_quantity",
                format!(
                    "partial pickup must be between 1 and {} (record holds {total})",
                    total - 1
                ),
            ));
        }

        let remainder = total - pickup_quantity;
        let lines = items
            .iter()
            .map(|item| {
                let q = item.expected_quantity();
                SplitLine {
                    item_id: item.id(),
                    variant: item.variant().clone(),
                    original_quantity: q,
                    archived_quantity: round_share(q, pickup_quantity, total),
                    remaining_quantity: round_share(q, remainder, total),
                }
            })
            .collect();

        Ok(Self {
            total,
            pickup_quantity,
            lines,
        })
    }

    /// `P / T`.
    pub fn ratio(&self) -> f64 {
        self.pickup_quantity as f64 / self.total as f64
    }

    pub fn remainder(&self) -> i64 {
        self.total - self.pickup_quantity
    }

    pub fn archived_total(&self) -> i64 {
        self.lines.iter().map(|l| l.archived_quantity).sum()
    }

    pub fn remaining_total(&self) -> i64 {
        self.lines.iter().map(|l| l.remaining_quantity).sum()
    }

    /// Units created by rounding (`archived + remaining - total`), in `0..=lines`.
    pub fn drift(&self) -> i64 {
        self.archived_total() + self.remaining_total() - self.total
    }
}

/// `round(q * numerator / denominator)`, half-up; inputs non-negative.
fn round_share(q: i64, numerator: i64, denominator: i64) -> i64 {
    let (q, n, d) = (q as i128, numerator as i128, denominator as i128);
    ((2 * q * n + d) / (2 * d)) as i64
}
