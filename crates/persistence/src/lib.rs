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

//! In-memory persistence for field-service dispatch.
//!
//! Every store implements one of the collaborator traits from `fieldops`
//! and is safe to share between request handlers and background tasks.
//! Records live in [`dashmap::DashMap`]s so reads and writes lock a single
//! key, never the whole store.
//!
//! ## Stock
//!
//! Equipment, materials and tools each get their own
//! [`StockRepository`] instance. [`InventoryStockCheck`] combines the three
//! into the availability checks and reservations dispatch needs.
//!
//! ## Seed data
//!
//! [`InMemoryBackend::from_seed`] loads technicians, warehouses and stock
//! from a JSON document so a server can start with a known fleet.

mod backend;
mod error;
mod inventory;
mod orders;
mod stock;
mod users;
mod warehouses;

#[cfg(test)]
mod tests;

pub use backend::{InMemoryBackend, SeedData, TechnicianSeed};
pub use error::PersistenceError;
pub use inventory::InventoryStockCheck;
pub use orders::InMemoryOrderStore;
pub use stock::{InMemoryStockRepository, StockRepository};
pub use users::InMemoryUserDirectory;
pub use warehouses::InMemoryWarehouseStore;
