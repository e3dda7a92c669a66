// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod error;
mod geo;
mod order;
mod route;
mod status;
mod stock;
mod types;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use geo::{ARRIVAL_THRESHOLD_KM, Coordinate, EARTH_RADIUS_KM, distance_km, round2};
pub use order::{Order, OrderType};
pub use route::{Leg, Route, RoutePoint};
pub use status::{FulfillmentStatus, Transition, Trigger, WorkProgress};
pub use stock::{
    EquipmentRequirement, EquipmentStock, MaterialStock, StockItem, StockRequirement, ToolStock,
    has_all_named, required_materials, required_tools,
};
pub use types::{
    LiveLocation, OrderId, StockItemId, Technician, TechnicianId, TechnicianPosition, Warehouse,
    WarehouseId,
};
