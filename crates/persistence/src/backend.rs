// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The in-memory backend as a whole, and loading it from seed data.

use crate::error::PersistenceError;
use crate::inventory::InventoryStockCheck;
use crate::orders::InMemoryOrderStore;
use crate::stock::{InMemoryStockRepository, StockRepository};
use crate::users::InMemoryUserDirectory;
use crate::warehouses::InMemoryWarehouseStore;
use fieldops_domain::{
    Coordinate, EquipmentStock, MaterialStock, StockItem, Technician, TechnicianId, ToolStock,
    Warehouse,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// A technician as written in a seed file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianSeed {
    #[serde(default)]
    pub id: Option<TechnicianId>,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub home: Coordinate,
}

/// Initial contents of every store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedData {
    pub technicians: Vec<TechnicianSeed>,
    pub warehouses: Vec<Warehouse>,
    pub equipment: Vec<EquipmentStock>,
    pub materials: Vec<MaterialStock>,
    pub tools: Vec<ToolStock>,
}

impl SeedData {
    /// Parses seed data from JSON.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::InvalidSeed` if the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Every in-memory store, shared by reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub orders: Arc<InMemoryOrderStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub warehouses: Arc<InMemoryWarehouseStore>,
    pub equipment: Arc<InMemoryStockRepository<EquipmentStock>>,
    pub materials: Arc<InMemoryStockRepository<MaterialStock>>,
    pub tools: Arc<InMemoryStockRepository<ToolStock>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a backend holding `seed`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::InvalidSeed` if a stock item refers to a
    /// warehouse that is not in the seed, and `PersistenceError::Duplicate`
    /// if two stock items share an id.
    pub fn from_seed(seed: SeedData) -> Result<Self, PersistenceError> {
        let backend: Self = Self::new();

        for warehouse in seed.warehouses {
            backend.warehouses.upsert(warehouse);
        }
        let technician_count: usize = seed.technicians.len();
        for technician in seed.technicians {
            backend.users.upsert(Technician::new(
                technician.id.unwrap_or_default(),
                technician.name,
                technician.phone,
                technician.home,
            ));
        }

        backend.load_stock(backend.equipment.as_ref(), seed.equipment)?;
        backend.load_stock(backend.materials.as_ref(), seed.materials)?;
        backend.load_stock(backend.tools.as_ref(), seed.tools)?;

        info!(
            technicians = technician_count,
            warehouses = backend.warehouses.list().len(),
            equipment = backend.equipment.len(),
            materials = backend.materials.len(),
            tools = backend.tools.len(),
            "Seed data loaded"
        );
        Ok(backend)
    }

    fn load_stock<T: StockItem>(
        &self,
        repository: &dyn StockRepository<T>,
        items: Vec<T>,
    ) -> Result<(), PersistenceError> {
        for item in items {
            if self.warehouses.get(item.warehouse_id()).is_none() {
                return Err(PersistenceError::InvalidSeed(format!(
                    "{} '{}' refers to unknown warehouse {}",
                    T::KIND,
                    item.name(),
                    item.warehouse_id()
                )));
            }
            repository.add(item)?;
        }
        Ok(())
    }

    /// A stock check over this backend's repositories.
    #[must_use]
    pub fn stock_check(&self) -> InventoryStockCheck {
        InventoryStockCheck::new(
            self.equipment.clone(),
            self.materials.clone(),
            self.tools.clone(),
        )
    }
}
