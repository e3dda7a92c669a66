// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use fieldops_domain::{DomainError, FulfillmentStatus, OrderId, TechnicianId};

/// Why a dispatch could not be assembled.
///
/// None of these leave anything committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The job coordinate is the `(0, 0)` placeholder.
    UnknownLocation,
    /// The geocoder returned nothing for the address.
    AddressNotGeocoded,
    /// There are no warehouses at all.
    NoWarehouse,
    /// No warehouse (or pair of warehouses) holds the required stock.
    NoStock,
    /// No available technician matched.
    NoTechnicians,
    /// Technicians matched but no complete route could be built.
    NoRoutes,
}

impl NotFoundReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownLocation => "job location is unknown",
            Self::AddressNotGeocoded => "address could not be geocoded",
            Self::NoWarehouse => "no warehouse found",
            Self::NoStock => "no warehouse holds the required stock",
            Self::NoTechnicians => "no available technicians",
            Self::NoRoutes => "no route could be built",
        }
    }
}

/// Errors reported by persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist.
    NotFound(String),
    /// Optimistic concurrency check failed.
    VersionConflict {
        /// The version the writer based its change on.
        expected: u64,
        /// The version currently stored.
        found: u64,
    },
    /// The record already exists.
    Duplicate(String),
    /// The backing store could not be reached.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::VersionConflict { expected, found } => {
                write!(f, "Version conflict: expected {expected}, found {found}")
            }
            Self::Duplicate(what) => write!(f, "{what} already exists"),
            Self::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A failed call to an external provider (directions, geocoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Provider failure: {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Errors surfaced by dispatch operations.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A domain rule was violated (including rejected transitions).
    DomainViolation(DomainError),
    /// Dispatch could not be assembled.
    NotFound(NotFoundReason),
    /// The order does not exist.
    OrderNotFound(OrderId),
    /// The technician has no live location, so no order to report against.
    TechnicianNotTracked(TechnicianId),
    /// The order is not in a state that allows the operation.
    InvalidState {
        /// The order.
        order_id: OrderId,
        /// Its current status.
        status: FulfillmentStatus,
    },
    /// The order changed concurrently and the single retry also conflicted.
    ConcurrencyConflict(OrderId),
    /// A persistence collaborator failed.
    Store(StoreError),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::NotFound(reason) => write!(f, "Dispatch failed: {}", reason.as_str()),
            Self::OrderNotFound(id) => write!(f, "Order {id} not found"),
            Self::TechnicianNotTracked(id) => {
                write!(f, "Technician {id} is not assigned to a tracked order")
            }
            Self::InvalidState { order_id, status } => {
                write!(f, "Order {order_id} is {status}")
            }
            Self::ConcurrencyConflict(id) => {
                write!(f, "Order {id} was modified concurrently; retry failed")
            }
            Self::Store(err) => write!(f, "Store error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
