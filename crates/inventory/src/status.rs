use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

/// Coarse lifecycle status of an inventory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    /// Shipped or registered, not yet confirmed in the warehouse.
    Incoming,
    /// Confirmed on a rack.
    InStock,
    /// Picked up; left the warehouse.
    Archived,
}

impl InventoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InventoryStatus::Incoming => "incoming",
            InventoryStatus::InStock => "in_stock",
            InventoryStatus::Archived => "archived",
        }
    }
}

impl core::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(InventoryStatus::Incoming),
            "in_stock" => Ok(InventoryStatus::InStock),
            "archived" => Ok(InventoryStatus::Archived),
            other => Err(DomainError::validation(
                "status",
                format!("unknown inventory status `{other}`"),
            )),
        }
    }
}
