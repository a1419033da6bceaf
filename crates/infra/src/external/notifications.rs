use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use stockroom_core::{OrderId, UserId};
use stockroom_inventory::InventoryId;

use super::CollaboratorError;
use super::users::Recipient;

/// "Goods arrived" message sent when a record is received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalNotice {
    pub record_id: InventoryId,
    pub product_name: String,
    pub order_id: Option<OrderId>,
    pub total_quantity: i64,
    pub received_by: String,
    pub received_at: DateTime<Utc>,
}

/// Fan-out of arrival notifications. Best-effort from the caller's side.
pub trait NotificationService: Send + Sync {
    fn fan_out_arrival(
        &self,
        notice: &ArrivalNotice,
        recipients: &[Recipient],
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    pub notice: ArrivalNotice,
    pub recipients: Vec<UserId>,
}

/// In-memory notifier that records what it sent.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    sent: RwLock<Vec<SentNotice>>,
    failing: AtomicBool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentNotice> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NotificationService for InMemoryNotifier {
    fn fan_out_arrival(
        &self,
        notice: &ArrivalNotice,
        recipients: &[Recipient],
    ) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "notification service unreachable".to_string(),
            ));
        }
        let mut sent = self
            .sent
            .write()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        sent.push(SentNotice {
            notice: notice.clone(),
            recipients: recipients.iter().map(|r| r.user_id).collect(),
        });
        Ok(())
    }
}
