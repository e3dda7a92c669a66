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

//! Dispatch, movement simulation and live tracking for field orders.
//!
//! The [`Dispatcher`] is the entry point. It depends on its storage and
//! provider collaborators only through the traits in [`ports`], so the same
//! orchestration runs against in-memory stores in tests and in the server.

mod config;
mod dispatch;
mod error;
mod events;
mod matcher;
pub mod ports;
mod routes;
mod simulator;
mod tracking;

#[cfg(test)]
mod tests;

pub use config::{DispatchConfig, SimulationConfig, TrackingConfig};
pub use dispatch::{
    Collaborators, DispatchPlan, DispatchRequest, Dispatcher, JobLocation, PlaceOrderRequest,
    RuntimeConfig,
};
pub use error::{CoreError, NotFoundReason, ProviderError, StoreError};
pub use events::{EventSender, FulfillmentEvent, FulfillmentEvents, channel};
pub use matcher::{find_nearest_warehouse, find_technicians, nearest_technician, rank_warehouses};
pub use ports::{
    AvoidFeature, DirectionsProvider, Geocoder, LegRequest, OrderStore, StockCheck,
    UserDirectory, WarehouseDirectory,
};
pub use routes::RouteBuilder;
pub use simulator::{
    MovementSimulator, SimulationClaim, SimulationRegistry, SimulationReport, StartOutcome,
};
pub use tracking::{CloseReason, LocationUpdate, SubscriberId, TrackingHub, TrackingMessage};
