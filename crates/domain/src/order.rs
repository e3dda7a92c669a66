// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::geo::Coordinate;
use crate::route::Route;
use crate::status::{FulfillmentStatus, Transition, Trigger, WorkProgress};
use crate::types::{OrderId, TechnicianId, WarehouseId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use time::OffsetDateTime;

/// Kind of field job. Determines the tools and materials a warehouse must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Installation,
    Maintenance,
}

impl OrderType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Maintenance => "maintenance",
        }
    }
}

impl FromStr for OrderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installation" => Ok(Self::Installation),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(DomainError::InvalidOrderType(s.to_string())),
        }
    }
}

/// A field-service order.
///
/// `version` is owned by the order store and bumped on every successful
/// write; readers pass it back to detect concurrent modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_type: OrderType,
    pub status: FulfillmentStatus,
    pub progress: WorkProgress,
    pub address: Option<String>,
    pub installation: Coordinate,
    pub warehouse_id: Option<WarehouseId>,
    pub secondary_warehouse_id: Option<WarehouseId>,
    pub assigned_technicians: BTreeSet<TechnicianId>,
    pub initial_routes: Vec<Route>,
    pub final_routes: Vec<Route>,
    pub version: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub placed_at: OffsetDateTime,
}

impl Order {
    /// Creates a freshly placed order.
    #[must_use]
    pub fn new(
        id: OrderId,
        order_type: OrderType,
        installation: Coordinate,
        address: Option<String>,
        placed_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            order_type,
            status: FulfillmentStatus::New,
            progress: WorkProgress::OrderPlaced,
            address,
            installation,
            warehouse_id: None,
            secondary_warehouse_id: None,
            assigned_technicians: BTreeSet::new(),
            initial_routes: Vec::new(),
            final_routes: Vec::new(),
            version: 0,
            placed_at,
        }
    }

    /// Returns true once the order is Completed or Cancelled.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Plans a transition for `trigger` against the current state without
    /// mutating the order.
    ///
    /// # Errors
    ///
    /// See [`Transition::plan`].
    pub fn plan(&self, trigger: Trigger) -> Result<Transition, DomainError> {
        Transition::plan(self.status, self.progress, trigger)
    }

    /// Moves the order to the target state of `transition`.
    ///
    /// Completion also captures the final routes snapshot for the
    /// technicians still assigned.
    pub fn apply(&mut self, transition: Transition) {
        let (status, progress): (FulfillmentStatus, WorkProgress) =
            transition.target(self.progress);
        self.status = status;
        self.progress = progress;

        if transition == Transition::Complete {
            self.final_routes = self
                .initial_routes
                .iter()
                .filter(|r| self.assigned_technicians.contains(&r.technician_id))
                .cloned()
                .collect();
        }
    }

    /// Returns true if `technician_id` is assigned to this order.
    #[must_use]
    pub fn is_assigned(&self, technician_id: &TechnicianId) -> bool {
        self.assigned_technicians.contains(technician_id)
    }

    /// The stored initial route for a technician.
    #[must_use]
    pub fn route_for(&self, technician_id: &TechnicianId) -> Option<&Route> {
        self.initial_routes
            .iter()
            .find(|r| &r.technician_id == technician_id)
    }
}
