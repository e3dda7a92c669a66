// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Order storage with optimistic concurrency.
//!
//! Every stored order carries a version. An update is accepted only if it was
//! based on the version currently stored; the check and the write happen
//! under the same per-key lock, so two writers that read the same version
//! cannot both succeed.

use crate::error::PersistenceError;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fieldops::{OrderStore, StoreError};
use fieldops_domain::{Order, OrderId, TechnicianId};
use tracing::debug;

/// Orders keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new order at version 1.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Duplicate` if the id is already stored.
    pub fn insert_order(&self, mut order: Order) -> Result<Order, PersistenceError> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(PersistenceError::Duplicate(format!("Order {}", order.id))),
            Entry::Vacant(slot) => {
                order.version = 1;
                slot.insert(order.clone());
                debug!(order_id = %order.id, "Order stored");
                Ok(order)
            }
        }
    }

    /// Replaces an order if `order.version` matches the stored version.
    ///
    /// # Errors
    ///
    /// * `PersistenceError::NotFound` if the order does not exist
    /// * `PersistenceError::VersionConflict` if it changed since it was read
    pub fn update_order(&self, mut order: Order) -> Result<Order, PersistenceError> {
        let mut stored = self
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| PersistenceError::NotFound(format!("Order {}", order.id)))?;

        if stored.version != order.version {
            return Err(PersistenceError::VersionConflict {
                expected: order.version,
                found: stored.version,
            });
        }
        order.version += 1;
        *stored = order.clone();
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the order does not exist.
    pub fn get_order(&self, id: OrderId) -> Result<Order, PersistenceError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PersistenceError::NotFound(format!("Order {id}")))
    }

    /// Every stored order, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|e| e.value().clone()).collect();
        orders.sort_by(|a, b| a.placed_at.cmp(&b.placed_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    /// Removes an order.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the order does not exist.
    pub fn delete(&self, id: OrderId) -> Result<Order, PersistenceError> {
        self.orders
            .remove(&id)
            .map(|(_, order)| order)
            .ok_or_else(|| PersistenceError::NotFound(format!("Order {id}")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        Ok(self.get_order(id)?)
    }

    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        Ok(self.insert_order(order)?)
    }

    async fn update(&self, order: Order) -> Result<Order, StoreError> {
        Ok(self.update_order(order)?)
    }

    async fn find_active_by_technician(
        &self,
        technician_id: TechnicianId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .find(|entry| !entry.is_terminal() && entry.is_assigned(&technician_id))
            .map(|entry| entry.value().clone()))
    }
}
