//! Transaction batch functions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{TransactionId, UserId};
use loader::{BatchFn, BatchResult, Key, LoadError};
use store::{Store, Transaction, TransactionAddressInfo, TransactionLineItem, TransactionStatus};

/// Point lookup by transaction id.
pub struct TransactionByIdBatch {
    store: Arc<dyn Store>,
}

impl TransactionByIdBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<TransactionId, Transaction> for TransactionByIdBatch {
    async fn load(&self, keys: &[TransactionId]) -> BatchResult<Transaction> {
        let found = self
            .store
            .transactions_by_ids(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load transaction.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for transaction in found {
            by_id.insert(transaction.id, transaction);
        }

        Ok(keys
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound(id.canonical()))
            })
            .collect())
    }
}

/// A buyer's purchase history, grouped by user.
pub struct TransactionsForUserBatch {
    store: Arc<dyn Store>,
}

impl TransactionsForUserBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<UserId, Vec<Transaction>> for TransactionsForUserBatch {
    async fn load(&self, keys: &[UserId]) -> BatchResult<Vec<Transaction>> {
        let found = self
            .store
            .transactions_for_users(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load transactions.", err))?;

        let mut grouped: HashMap<UserId, Vec<Transaction>> = HashMap::new();
        for transaction in found {
            if let Some(user_id) = transaction.user_id {
                grouped.entry(user_id).or_default().push(transaction);
            }
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}

/// Line items for a set of transactions, grouped by transaction.
pub struct TransactionLineItemsBatch {
    store: Arc<dyn Store>,
}

impl TransactionLineItemsBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<TransactionId, Vec<TransactionLineItem>> for TransactionLineItemsBatch {
    async fn load(&self, keys: &[TransactionId]) -> BatchResult<Vec<TransactionLineItem>> {
        let found = self
            .store
            .line_items_for_transactions(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load transaction line items.", err))?;

        let mut grouped: HashMap<TransactionId, Vec<TransactionLineItem>> = HashMap::new();
        for item in found {
            grouped.entry(item.transaction_id).or_default().push(item);
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}

/// The billing/shipping address link for a set of transactions.
pub struct TransactionAddressInfoBatch {
    store: Arc<dyn Store>,
}

impl TransactionAddressInfoBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<TransactionId, TransactionAddressInfo> for TransactionAddressInfoBatch {
    async fn load(&self, keys: &[TransactionId]) -> BatchResult<TransactionAddressInfo> {
        let found = self
            .store
            .address_info_for_transactions(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load transaction addresses.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for info in found {
            by_id.insert(info.transaction_id, info);
        }

        Ok(keys
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .copied()
                    .ok_or_else(|| LoadError::NotFound(id.canonical()))
            })
            .collect())
    }
}

/// Status history for a set of transactions, oldest first.
pub struct TransactionStatusesBatch {
    store: Arc<dyn Store>,
}

impl TransactionStatusesBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<TransactionId, Vec<TransactionStatus>> for TransactionStatusesBatch {
    async fn load(&self, keys: &[TransactionId]) -> BatchResult<Vec<TransactionStatus>> {
        let found = self
            .store
            .statuses_for_transactions(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load transaction statuses.", err))?;

        let mut grouped: HashMap<TransactionId, Vec<TransactionStatus>> = HashMap::new();
        for status in found {
            grouped
                .entry(status.transaction_id)
                .or_default()
                .push(status);
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}
