// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Stock availability and reservation across the three stock kinds.
//!
//! Supplies (materials and tools) always come from the primary warehouse.
//! Equipment may come from a second warehouse when the primary has none.
//! A reservation takes one unit of every required item or nothing at all.

use crate::error::PersistenceError;
use crate::stock::StockRepository;
use async_trait::async_trait;
use fieldops::{StockCheck, StoreError};
use fieldops_domain::{
    EquipmentRequirement, EquipmentStock, MaterialStock, OrderType, StockItem, StockItemId,
    StockRequirement, ToolStock, WarehouseId, has_all_named, required_materials, required_tools,
};
use std::sync::Arc;
use tracing::{info, warn};

enum Taken {
    Equipment(StockItemId),
    Material(StockItemId),
    Tool(StockItemId),
}

/// [`StockCheck`] backed by one repository per stock kind.
#[derive(Clone)]
pub struct InventoryStockCheck {
    equipment: Arc<dyn StockRepository<EquipmentStock>>,
    materials: Arc<dyn StockRepository<MaterialStock>>,
    tools: Arc<dyn StockRepository<ToolStock>>,
}

impl std::fmt::Debug for InventoryStockCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryStockCheck").finish_non_exhaustive()
    }
}

impl InventoryStockCheck {
    #[must_use]
    pub fn new(
        equipment: Arc<dyn StockRepository<EquipmentStock>>,
        materials: Arc<dyn StockRepository<MaterialStock>>,
        tools: Arc<dyn StockRepository<ToolStock>>,
    ) -> Self {
        Self {
            equipment,
            materials,
            tools,
        }
    }

    fn take_all(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
        taken: &mut Vec<Taken>,
    ) -> Result<(), PersistenceError> {
        if let Some(wanted) = &requirement.equipment {
            let id: StockItemId = self.equipment.take_first(equipment_source, 1, &|item| {
                wanted.is_satisfied_by(item)
            })?;
            taken.push(Taken::Equipment(id));
        }
        for name in requirement.materials() {
            let id: StockItemId = self
                .materials
                .take_first(primary, 1, &|item| item.name() == *name)?;
            taken.push(Taken::Material(id));
        }
        for name in requirement.tools() {
            let id: StockItemId = self
                .tools
                .take_first(primary, 1, &|item| item.name() == *name)?;
            taken.push(Taken::Tool(id));
        }
        Ok(())
    }

    fn put_back(&self, taken: Vec<Taken>) {
        for item in taken {
            let result: Result<(), PersistenceError> = match item {
                Taken::Equipment(id) => self.equipment.put_back(id, 1),
                Taken::Material(id) => self.materials.put_back(id, 1),
                Taken::Tool(id) => self.tools.put_back(id, 1),
            };
            if let Err(e) = result {
                warn!(error = %e, "Could not return reserved stock");
            }
        }
    }

    /// First item in the warehouse accepted by `wanted`, ignoring quantity.
    fn first_matching<T: StockItem>(
        repository: &dyn StockRepository<T>,
        warehouse_id: WarehouseId,
        wanted: impl Fn(&T) -> bool,
    ) -> Result<StockItemId, PersistenceError> {
        repository
            .by_warehouse(warehouse_id)
            .iter()
            .find(|item| wanted(item))
            .map(StockItem::id)
            .ok_or_else(|| {
                PersistenceError::NotFound(format!("{} in warehouse {warehouse_id}", T::KIND))
            })
    }

    fn restore_all(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<(), PersistenceError> {
        if let Some(wanted) = &requirement.equipment {
            let id: StockItemId =
                Self::first_matching(self.equipment.as_ref(), equipment_source, |item| {
                    wanted.matches(item)
                })?;
            self.equipment.put_back(id, 1)?;
        }
        for name in requirement.materials() {
            let id: StockItemId = Self::first_matching(self.materials.as_ref(), primary, |item| {
                item.name() == *name
            })?;
            self.materials.put_back(id, 1)?;
        }
        for name in requirement.tools() {
            let id: StockItemId = Self::first_matching(self.tools.as_ref(), primary, |item| {
                item.name() == *name
            })?;
            self.tools.put_back(id, 1)?;
        }
        Ok(())
    }
}

#[async_trait]
impl StockCheck for InventoryStockCheck {
    async fn has_equipment(
        &self,
        warehouse_id: WarehouseId,
        requirement: &EquipmentRequirement,
    ) -> Result<bool, StoreError> {
        Ok(self
            .equipment
            .by_warehouse(warehouse_id)
            .iter()
            .any(|item| requirement.is_satisfied_by(item)))
    }

    async fn has_supplies(
        &self,
        warehouse_id: WarehouseId,
        order_type: OrderType,
    ) -> Result<bool, StoreError> {
        let materials: Vec<MaterialStock> = self.materials.by_warehouse(warehouse_id);
        let tools: Vec<ToolStock> = self.tools.by_warehouse(warehouse_id);
        Ok(has_all_named(&materials, required_materials(order_type))
            && has_all_named(&tools, required_tools(order_type)))
    }

    async fn reserve(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<(), StoreError> {
        let mut taken: Vec<Taken> = Vec::new();
        if let Err(e) = self.take_all(primary, equipment_source, requirement, &mut taken) {
            warn!(
                %primary,
                %equipment_source,
                error = %e,
                "Stock reservation failed; returning partial take"
            );
            self.put_back(taken);
            return Err(e.into());
        }
        info!(
            %primary,
            %equipment_source,
            items = taken.len(),
            "Stock reserved"
        );
        Ok(())
    }

    async fn restore(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<(), StoreError> {
        self.restore_all(primary, equipment_source, requirement)?;
        info!(%primary, %equipment_source, "Stock restored");
        Ok(())
    }
}
