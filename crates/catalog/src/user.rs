//! User and address batch functions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AddressId, UserId};
use loader::{BatchFn, BatchResult, Key, LoadError};
use store::{Address, Store, User};

/// Point lookup by user id.
pub struct UserByIdBatch {
    store: Arc<dyn Store>,
}

impl UserByIdBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<UserId, User> for UserByIdBatch {
    async fn load(&self, keys: &[UserId]) -> BatchResult<User> {
        let found = self
            .store
            .users_by_ids(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load user.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for user in found {
            by_id.insert(user.id, user);
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

/// Point lookup by address id.
pub struct AddressByIdBatch {
    store: Arc<dyn Store>,
}

impl AddressByIdBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<AddressId, Address> for AddressByIdBatch {
    async fn load(&self, keys: &[AddressId]) -> BatchResult<Address> {
        let found = self
            .store
            .addresses_by_ids(keys)
            .await
            .map_err(|err| LoadError::backend("Could not find address.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for address in found {
            by_id.insert(address.id, address);
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

/// A user's saved addresses, grouped by user.
pub struct AddressesForUserBatch {
    store: Arc<dyn Store>,
}

impl AddressesForUserBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<UserId, Vec<Address>> for AddressesForUserBatch {
    async fn load(&self, keys: &[UserId]) -> BatchResult<Vec<Address>> {
        let found = self
            .store
            .addresses_for_users(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load addresses.", err))?;

        let mut grouped: HashMap<UserId, Vec<Address>> = HashMap::new();
        for address in found {
            if let Some(user_id) = address.user_id {
                grouped.entry(user_id).or_default().push(address);
            }
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}
