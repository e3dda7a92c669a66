// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Warehouse stock kinds and order requirements.
//!
//! Each kind of stock is its own type implementing [`StockItem`], so stores
//! can be written once and instantiated per kind.

use crate::error::DomainError;
use crate::order::OrderType;
use crate::types::{StockItemId, WarehouseId};
use serde::{Deserialize, Serialize};

/// Common shape of every stock record.
pub trait StockItem: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in logs and errors.
    const KIND: &'static str;

    fn id(&self) -> StockItemId;
    fn warehouse_id(&self) -> WarehouseId;
    /// The name requirements are matched against.
    fn name(&self) -> &str;
    fn quantity(&self) -> u32;
    fn set_quantity(&mut self, quantity: u32);

    /// Removes `amount` units.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InsufficientStock` if fewer than `amount` remain.
    fn take(&mut self, amount: u32) -> Result<(), DomainError> {
        let remaining: u32 =
            self.quantity()
                .checked_sub(amount)
                .ok_or_else(|| DomainError::InsufficientStock {
                    kind: Self::KIND,
                    name: self.name().to_string(),
                })?;
        self.set_quantity(remaining);
        Ok(())
    }
}

/// An air conditioning unit held in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStock {
    pub id: StockItemId,
    pub warehouse_id: WarehouseId,
    pub model_name: String,
    pub btu: u32,
    pub quantity: u32,
}

/// A consumable material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStock {
    pub id: StockItemId,
    pub warehouse_id: WarehouseId,
    pub material_name: String,
    pub quantity: u32,
}

/// A tool lent to technicians.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStock {
    pub id: StockItemId,
    pub warehouse_id: WarehouseId,
    pub tool_name: String,
    pub quantity: u32,
}

impl StockItem for EquipmentStock {
    const KIND: &'static str = "equipment";

    fn id(&self) -> StockItemId {
        self.id
    }
    fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }
    fn name(&self) -> &str {
        &self.model_name
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

impl StockItem for MaterialStock {
    const KIND: &'static str = "material";

    fn id(&self) -> StockItemId {
        self.id
    }
    fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }
    fn name(&self) -> &str {
        &self.material_name
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

impl StockItem for ToolStock {
    const KIND: &'static str = "tool";

    fn id(&self) -> StockItemId {
        self.id
    }
    fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }
    fn name(&self) -> &str {
        &self.tool_name
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

/// Which unit the job needs, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRequirement {
    /// Exact model name (case-insensitive).
    pub model_name: Option<String>,
    /// Minimum cooling capacity, used when no model is named.
    pub min_btu: Option<u32>,
}

impl EquipmentRequirement {
    /// Returns true if `item` is in stock and satisfies this requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, item: &EquipmentStock) -> bool {
        item.quantity > 0 && self.matches(item)
    }

    /// Returns true if `item` is the kind of unit asked for, in stock or not.
    #[must_use]
    pub fn matches(&self, item: &EquipmentStock) -> bool {
        match (&self.model_name, self.min_btu) {
            (Some(model), _) => item.model_name.eq_ignore_ascii_case(model),
            (None, Some(min_btu)) => item.btu >= min_btu,
            (None, None) => true,
        }
    }
}

/// Everything a warehouse has to supply for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequirement {
    pub order_type: OrderType,
    #[serde(default)]
    pub equipment: Option<EquipmentRequirement>,
}

impl StockRequirement {
    #[must_use]
    pub const fn new(order_type: OrderType, equipment: Option<EquipmentRequirement>) -> Self {
        Self {
            order_type,
            equipment,
        }
    }

    /// Materials every warehouse supplying this order must hold.
    #[must_use]
    pub const fn materials(&self) -> &'static [&'static str] {
        required_materials(self.order_type)
    }

    /// Tools every warehouse supplying this order must hold.
    #[must_use]
    pub const fn tools(&self) -> &'static [&'static str] {
        required_tools(self.order_type)
    }
}

/// Materials consumed by each order type.
#[must_use]
pub const fn required_materials(order_type: OrderType) -> &'static [&'static str] {
    match order_type {
        OrderType::Installation => &["Copper pipe 1/4 inch", "Refrigerant R410A", "Wall anchors"],
        OrderType::Maintenance => &["Refrigerant R410A", "Antiseptic solution", "Sealant"],
    }
}

/// Tools needed on site for each order type.
#[must_use]
pub const fn required_tools(order_type: OrderType) -> &'static [&'static str] {
    match order_type {
        OrderType::Installation => &["Vacuum pump", "Manifold gauge", "Rotary hammer"],
        OrderType::Maintenance => &["Gas torch", "Multimeter", "Ratchet wrench"],
    }
}

/// Returns true if every name in `required` appears among `items` with a
/// positive quantity.
#[must_use]
pub fn has_all_named<T: StockItem>(items: &[T], required: &[&str]) -> bool {
    required.iter().all(|name| {
        items
            .iter()
            .any(|item| item.quantity() > 0 && item.name() == *name)
    })
}
