// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Interfaces to the collaborators dispatch depends on.
//!
//! Implementations live outside this crate: in-memory stores in
//! `fieldops-persistence`, HTTP providers in `fieldops-routing`.

use crate::error::{ProviderError, StoreError};
use async_trait::async_trait;
use fieldops_domain::{
    Coordinate, EquipmentRequirement, Leg, Order, OrderId, OrderType, StockRequirement,
    Technician, TechnicianId, Warehouse, WarehouseId,
};

/// Road features a route should stay off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvoidFeature {
    Ferries,
    Tollways,
}

impl AvoidFeature {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ferries => "ferries",
            Self::Tollways => "tollways",
        }
    }
}

/// A request for one leg.
#[derive(Debug, Clone, PartialEq)]
pub struct LegRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub avoid: Vec<AvoidFeature>,
}

impl LegRequest {
    /// A driving leg that avoids ferries and toll roads.
    #[must_use]
    pub fn driving(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
            avoid: vec![AvoidFeature::Ferries, AvoidFeature::Tollways],
        }
    }
}

/// Turn-by-turn driving directions between two points.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Computes one driving leg.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` for any transport or decoding failure.
    async fn directions(&self, request: &LegRequest) -> Result<Leg, ProviderError>;
}

/// Free-text address lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves an address; `None` if it could not be resolved.
    async fn geocode(&self, address: &str) -> Option<Coordinate>;
}

/// Order persistence with optimistic concurrency.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::NotFound` if the order does not exist.
    async fn get(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Stores a new order. The stored version starts at 1.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if the id is taken.
    async fn insert(&self, order: Order) -> Result<Order, StoreError>;

    /// Replaces the stored order if its version still equals `order.version`,
    /// returning the stored copy with the version bumped.
    ///
    /// # Errors
    ///
    /// `StoreError::VersionConflict` if another writer got there first.
    async fn update(&self, order: Order) -> Result<Order, StoreError>;

    /// The non-terminal order the technician is assigned to, if any.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the store cannot be read.
    async fn find_active_by_technician(
        &self,
        technician_id: TechnicianId,
    ) -> Result<Option<Order>, StoreError>;
}

/// Technician records and availability.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the directory cannot be read.
    async fn technicians(&self) -> Result<Vec<Technician>, StoreError>;

    /// Atomically marks an available technician as busy on `order_id`.
    ///
    /// Returns `false` without changes if the technician is not available.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the technician does not exist.
    async fn reserve(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError>;

    /// Makes the technician available again if they are on `order_id`.
    ///
    /// Returns `false` (and changes nothing) if they are not; calling twice
    /// is harmless.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the technician does not exist.
    async fn release(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError>;
}

/// Warehouse records.
#[async_trait]
pub trait WarehouseDirectory: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::Unavailable` if the directory cannot be read.
    async fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError>;
}

/// Stock availability signals and reservation.
#[async_trait]
pub trait StockCheck: Send + Sync {
    /// Returns true if the warehouse holds a unit matching `requirement`.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if stock cannot be read.
    async fn has_equipment(
        &self,
        warehouse_id: WarehouseId,
        requirement: &EquipmentRequirement,
    ) -> Result<bool, StoreError>;

    /// Returns true if the warehouse holds every material and tool the order
    /// type needs.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if stock cannot be read.
    async fn has_supplies(
        &self,
        warehouse_id: WarehouseId,
        order_type: OrderType,
    ) -> Result<bool, StoreError>;

    /// Returns true if the warehouse alone can supply the whole requirement.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if stock cannot be read.
    async fn has_all(
        &self,
        warehouse_id: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<bool, StoreError> {
        let has_equipment: bool = match &requirement.equipment {
            Some(equipment) => self.has_equipment(warehouse_id, equipment).await?,
            None => true,
        };
        if !has_equipment {
            return Ok(false);
        }
        self.has_supplies(warehouse_id, requirement.order_type).await
    }

    /// Takes one unit of each required item. Supplies come from `primary`;
    /// equipment comes from `equipment_source`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when an item ran out since it was checked;
    /// nothing is taken in that case.
    async fn reserve(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<(), StoreError>;

    /// Puts back what a matching [`StockCheck::reserve`] took.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` if stock cannot be written.
    async fn restore(
        &self,
        primary: WarehouseId,
        equipment_source: WarehouseId,
        requirement: &StockRequirement,
    ) -> Result<(), StoreError>;
}
