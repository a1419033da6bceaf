//! Order-line status vocabulary and its precedence.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

/// Status of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Pending,
    PendingAdmin,
    SentToManufacturer,
    SubmittedToManufacturer,
    SampleRequested,
    InProduction,
    SampleInProduction,
    ApprovedForProduction,
    PendingClientApproval,
    ClientApproved,
    Shipped,
    Delivered,
    Completed,
}

/// Precedence tiers, earliest first. A status's rank is its tier index.
pub const PRECEDENCE: &[&[ProductStatus]] = &[
    &[ProductStatus::Draft],
    &[ProductStatus::Pending],
    &[ProductStatus::PendingAdmin],
    &[
        ProductStatus::SentToManufacturer,
        ProductStatus::SubmittedToManufacturer,
    ],
    &[ProductStatus::SampleRequested],
    &[ProductStatus::InProduction, ProductStatus::SampleInProduction],
    &[ProductStatus::ApprovedForProduction],
    &[ProductStatus::PendingClientApproval],
    &[ProductStatus::ClientApproved],
    &[ProductStatus::Shipped],
    &[ProductStatus::Delivered],
    &[ProductStatus::Completed],
];

/// Rank given to statuses outside the vocabulary (the `in_production` tier).
pub const UNKNOWN_STATUS_RANK: u8 = 5;

impl ProductStatus {
    pub const ALL: [ProductStatus; 14] = [
        ProductStatus::Draft,
        ProductStatus::Pending,
        ProductStatus::PendingAdmin,
        ProductStatus::SentToManufacturer,
        ProductStatus::SubmittedToManufacturer,
        ProductStatus::SampleRequested,
        ProductStatus::InProduction,
        ProductStatus::SampleInProduction,
        ProductStatus::ApprovedForProduction,
        ProductStatus::PendingClientApproval,
        ProductStatus::ClientApproved,
        ProductStatus::Shipped,
        ProductStatus::Delivered,
        ProductStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Pending => "pending",
            ProductStatus::PendingAdmin => "pending_admin",
            ProductStatus::SentToManufacturer => "sent_to_manufacturer",
            ProductStatus::SubmittedToManufacturer => "submitted_to_manufacturer",
            ProductStatus::SampleRequested => "sample_requested",
            ProductStatus::InProduction => "in_production",
            ProductStatus::SampleInProduction => "sample_in_production",
            ProductStatus::ApprovedForProduction => "approved_for_production",
            ProductStatus::PendingClientApproval => "pending_client_approval",
            ProductStatus::ClientApproved => "client_approved",
            ProductStatus::Shipped => "shipped",
            ProductStatus::Delivered => "delivered",
            ProductStatus::Completed => "completed",
        }
    }

    pub fn rank(self) -> u8 {
        PRECEDENCE
            .iter()
            .position(|tier| tier.contains(&self))
            .map_or(UNKNOWN_STATUS_RANK, |i| i as u8)
    }

    /// Delivered or completed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProductStatus::Delivered | ProductStatus::Completed)
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductStatus::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation("product_status", format!("unknown product status `{s}`"))
            })
    }
}

/// A product status as stored on the order side, which may hold values
/// outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportedStatus {
    Known(ProductStatus),
    Unknown(String),
}

impl ReportedStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.parse() {
            Ok(status) => ReportedStatus::Known(status),
            Err(_) => ReportedStatus::Unknown(raw.to_string()),
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            ReportedStatus::Known(s) => s.rank(),
            ReportedStatus::Unknown(_) => UNKNOWN_STATUS_RANK,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportedStatus::Known(s) if s.is_terminal())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReportedStatus::Known(s) => s.as_str(),
            ReportedStatus::Unknown(raw) => raw,
        }
    }
}

impl From<ProductStatus> for ReportedStatus {
    fn from(value: ProductStatus) -> Self {
        ReportedStatus::Known(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_tiers() {
        assert_eq!(ProductStatus::Draft.rank(), 0);
        assert_eq!(ProductStatus::SentToManufacturer.rank(), 3);
        assert_eq!(ProductStatus::SubmittedToManufacturer.rank(), 3);
        assert_eq!(ProductStatus::SampleInProduction.rank(), 5);
        assert_eq!(ProductStatus::Shipped.rank(), 9);
        assert_eq!(ProductStatus::Completed.rank(), 11);
    }

    #[test]
    fn every_status_sits_in_exactly_one_tier() {
        for status in ProductStatus::ALL {
            let tiers = PRECEDENCE.iter().filter(|t| t.contains(&status)).count();
            assert_eq!(tiers, 1, "{status}");
            assert_eq!(status.as_str().parse::<ProductStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_raw_status_ranks_with_production() {
        let reported = ReportedStatus::parse("on_hold");
        assert_eq!(reported, ReportedStatus::Unknown("on_hold".to_string()));
        assert_eq!(reported.rank(), UNKNOWN_STATUS_RANK);
        assert!(!reported.is_terminal());
        assert!(ReportedStatus::parse("delivered").is_terminal());
    }
}
