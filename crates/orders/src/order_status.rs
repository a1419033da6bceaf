use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

use crate::product_status::{ProductStatus, ReportedStatus};

/// Rolled-up status of an order. Never authored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    InProgress,
    SentToManufacturer,
    InProduction,
    Completed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::SentToManufacturer => "sent_to_manufacturer",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Completed => "completed",
        }
    }

    /// Order status implied by a single line status.
    pub fn from_product(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Draft => OrderStatus::Draft,
            ProductStatus::Pending
            | ProductStatus::PendingAdmin
            | ProductStatus::SampleRequested
            | ProductStatus::PendingClientApproval
            | ProductStatus::ClientApproved
            | ProductStatus::Shipped => OrderStatus::InProgress,
            ProductStatus::SentToManufacturer | ProductStatus::SubmittedToManufacturer => {
                OrderStatus::SentToManufacturer
            }
            ProductStatus::InProduction
            | ProductStatus::SampleInProduction
            | ProductStatus::ApprovedForProduction => OrderStatus::InProduction,
            ProductStatus::Delivered | ProductStatus::Completed => OrderStatus::Completed,
        }
    }

    /// Unrecognized line statuses count as work in progress.
    pub fn from_reported(status: &ReportedStatus) -> Self {
        match status {
            ReportedStatus::Known(s) => Self::from_product(*s),
            ReportedStatus::Unknown(_) => OrderStatus::InProgress,
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OrderStatus::Draft),
            "in_progress" => Ok(OrderStatus::InProgress),
            "sent_to_manufacturer" => Ok(OrderStatus::SentToManufacturer),
            "in_production" => Ok(OrderStatus::InProduction),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(DomainError::validation(
                "status",
                format!("unknown order status `{other}`"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_tier_maps_to_in_production() {
        for s in [
            ProductStatus::InProduction,
            ProductStatus::SampleInProduction,
            ProductStatus::ApprovedForProduction,
        ] {
            assert_eq!(OrderStatus::from_product(s), OrderStatus::InProduction);
        }
        assert_eq!(
            OrderStatus::from_reported(&ReportedStatus::parse("mystery")),
            OrderStatus::InProgress
        );
        assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
    }
}
