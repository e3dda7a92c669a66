// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Typed stock repositories.
//!
//! Equipment, materials and tools share one narrow contract,
//! [`StockRepository`], instantiated per kind. Quantity changes happen under
//! the per-item lock so concurrent reservations never oversell.

use crate::error::PersistenceError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fieldops_domain::{StockItem, StockItemId, WarehouseId};
use tracing::debug;

/// Storage contract shared by every stock kind.
pub trait StockRepository<T: StockItem>: Send + Sync {
    /// # Errors
    ///
    /// `PersistenceError::NotFound` if no item has this id.
    fn get(&self, id: StockItemId) -> Result<T, PersistenceError>;

    /// # Errors
    ///
    /// `PersistenceError::Duplicate` if the id is taken.
    fn add(&self, item: T) -> Result<(), PersistenceError>;

    /// # Errors
    ///
    /// `PersistenceError::NotFound` if the item does not exist.
    fn update(&self, item: T) -> Result<(), PersistenceError>;

    /// # Errors
    ///
    /// `PersistenceError::NotFound` if the item does not exist.
    fn delete(&self, id: StockItemId) -> Result<T, PersistenceError>;

    /// Items held by a warehouse, ordered by id.
    fn by_warehouse(&self, warehouse_id: WarehouseId) -> Vec<T>;

    /// Takes `amount` units from the first item in the warehouse, by id,
    /// that satisfies `wanted` and has enough left.
    ///
    /// # Errors
    ///
    /// `PersistenceError::NotFound` if no such item exists.
    fn take_first(
        &self,
        warehouse_id: WarehouseId,
        amount: u32,
        wanted: &dyn Fn(&T) -> bool,
    ) -> Result<StockItemId, PersistenceError>;

    /// Adds `amount` units back to an item.
    ///
    /// # Errors
    ///
    /// `PersistenceError::NotFound` if the item does not exist.
    fn put_back(&self, id: StockItemId, amount: u32) -> Result<(), PersistenceError>;
}

/// A [`StockRepository`] held in memory.
#[derive(Debug)]
pub struct InMemoryStockRepository<T: StockItem> {
    items: DashMap<StockItemId, T>,
}

impl<T: StockItem> Default for InMemoryStockRepository<T> {
    fn default() -> Self {
        Self {
            items: DashMap::new(),
        }
    }
}

impl<T: StockItem> InMemoryStockRepository<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: StockItem> StockRepository<T> for InMemoryStockRepository<T> {
    fn get(&self, id: StockItemId) -> Result<T, PersistenceError> {
        self.items
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| PersistenceError::NotFound(format!("{} {id}", T::KIND)))
    }

    fn add(&self, item: T) -> Result<(), PersistenceError> {
        match self.items.entry(item.id()) {
            Entry::Occupied(_) => Err(PersistenceError::Duplicate(format!(
                "{} {}",
                T::KIND,
                item.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(())
            }
        }
    }

    fn update(&self, item: T) -> Result<(), PersistenceError> {
        let mut stored = self
            .items
            .get_mut(&item.id())
            .ok_or_else(|| PersistenceError::NotFound(format!("{} {}", T::KIND, item.id())))?;
        *stored = item;
        Ok(())
    }

    fn delete(&self, id: StockItemId) -> Result<T, PersistenceError> {
        self.items
            .remove(&id)
            .map(|(_, item)| item)
            .ok_or_else(|| PersistenceError::NotFound(format!("{} {id}", T::KIND)))
    }

    fn by_warehouse(&self, warehouse_id: WarehouseId) -> Vec<T> {
        let mut items: Vec<T> = self
            .items
            .iter()
            .filter(|e| e.warehouse_id() == warehouse_id)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(T::id);
        items
    }

    fn take_first(
        &self,
        warehouse_id: WarehouseId,
        amount: u32,
        wanted: &dyn Fn(&T) -> bool,
    ) -> Result<StockItemId, PersistenceError> {
        let mut candidates: Vec<StockItemId> = self
            .items
            .iter()
            .filter(|e| e.warehouse_id() == warehouse_id && wanted(e.value()))
            .map(|e| *e.key())
            .collect();
        candidates.sort();

        for id in candidates {
            let Some(mut item) = self.items.get_mut(&id) else {
                continue;
            };
            // Re-checked under the item lock; another reservation may have won.
            if wanted(item.value()) && item.take(amount).is_ok() {
                debug!(kind = T::KIND, item = item.name(), %warehouse_id, amount, "Stock taken");
                return Ok(id);
            }
        }
        Err(PersistenceError::NotFound(format!(
            "{} in warehouse {warehouse_id}",
            T::KIND
        )))
    }

    fn put_back(&self, id: StockItemId, amount: u32) -> Result<(), PersistenceError> {
        let mut item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| PersistenceError::NotFound(format!("{} {id}", T::KIND)))?;
        let restored: u32 = item.quantity().saturating_add(amount);
        item.set_quantity(restored);
        Ok(())
    }
}
