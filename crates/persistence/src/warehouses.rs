// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::PersistenceError;
use async_trait::async_trait;
use dashmap::DashMap;
use fieldops::{StoreError, WarehouseDirectory};
use fieldops_domain::{Warehouse, WarehouseId};

/// Warehouse records keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryWarehouseStore {
    warehouses: DashMap<WarehouseId, Warehouse>,
}

impl InMemoryWarehouseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, warehouse: Warehouse) {
        self.warehouses.insert(warehouse.id, warehouse);
    }

    #[must_use]
    pub fn get(&self, id: WarehouseId) -> Option<Warehouse> {
        self.warehouses.get(&id).map(|e| e.value().clone())
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the warehouse does not exist.
    pub fn remove(&self, id: WarehouseId) -> Result<Warehouse, PersistenceError> {
        self.warehouses
            .remove(&id)
            .map(|(_, warehouse)| warehouse)
            .ok_or_else(|| PersistenceError::NotFound(format!("Warehouse {id}")))
    }

    /// All warehouses ordered by name, then id.
    #[must_use]
    pub fn list(&self) -> Vec<Warehouse> {
        let mut warehouses: Vec<Warehouse> =
            self.warehouses.iter().map(|e| e.value().clone()).collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        warehouses
    }
}

#[async_trait]
impl WarehouseDirectory for InMemoryWarehouseStore {
    async fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        Ok(self.list())
    }
}
