//! Compensation log for in-flight checkout attempts.

use std::sync::Arc;

use common::{AddressId, TransactionId};
use store::Store;

/// Records every row one attempt inserts so a later failure can remove
/// them all.
///
/// Unwinding hard-deletes in reverse insertion order. A delete that itself
/// fails is logged and skipped: the original failure stays the one the
/// caller sees, at the cost of a possible orphan row.
pub struct UndoLog {
    store: Arc<dyn Store>,
    steps: Vec<UndoStep>,
}

#[derive(Debug, Clone, Copy)]
enum UndoStep {
    Transaction(TransactionId),
    Status(i64),
    Address(AddressId),
    AddressInfo(i64),
    LineItem(i64),
}

impl UndoLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            steps: Vec::new(),
        }
    }

    pub fn transaction(&mut self, id: TransactionId) {
        self.steps.push(UndoStep::Transaction(id));
    }

    pub fn status(&mut self, id: i64) {
        self.steps.push(UndoStep::Status(id));
    }

    pub fn address(&mut self, id: AddressId) {
        self.steps.push(UndoStep::Address(id));
    }

    pub fn address_info(&mut self, id: i64) {
        self.steps.push(UndoStep::AddressInfo(id));
    }

    pub fn line_item(&mut self, id: i64) {
        self.steps.push(UndoStep::LineItem(id));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Hard-deletes every recorded row, newest first.
    pub async fn unwind(mut self) {
        tracing::warn!(steps = self.steps.len(), "compensating checkout attempt");
        let steps = std::mem::take(&mut self.steps);
        for step in steps.into_iter().rev() {
            let outcome = match step {
                UndoStep::Transaction(id) => self.store.hard_delete_transaction(id).await,
                UndoStep::Status(id) => self.store.hard_delete_status(id).await,
                UndoStep::Address(id) => self.store.hard_delete_address(id).await,
                UndoStep::AddressInfo(id) => self.store.hard_delete_address_info(id).await,
                UndoStep::LineItem(id) => self.store.hard_delete_line_item(id).await,
            };
            if let Err(err) = outcome {
                tracing::error!(error = %err, ?step, "compensation delete failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::{InMemoryStore, Transaction, TransactionStatus};

    use super::*;

    #[tokio::test]
    async fn unwind_removes_rows_in_reverse_order() {
        let store = InMemoryStore::new();
        let transaction = store
            .insert_transaction(Transaction::new(
                Money::from_cents(100),
                Money::zero(),
                Money::zero(),
                Money::from_cents(100),
                "RATE-0001",
                None,
            ))
            .await
            .unwrap();
        let status = store
            .insert_status(TransactionStatus::received(transaction.id))
            .await
            .unwrap();

        let mut undo = UndoLog::new(Arc::new(store.clone()));
        undo.transaction(transaction.id);
        undo.status(status.id);
        assert_eq!(undo.len(), 2);

        undo.unwind().await;
        assert_eq!(store.transaction_count().await, 0);
        assert_eq!(store.status_count().await, 0);
    }

    #[tokio::test]
    async fn empty_log_unwinds_quietly() {
        let store = InMemoryStore::new();
        let undo = UndoLog::new(Arc::new(store));
        assert!(undo.is_empty());
        undo.unwind().await;
    }
}
