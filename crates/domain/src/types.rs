// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifies a technician in the user directory.
    TechnicianId
);
entity_id!(
    /// Identifies an order.
    OrderId
);
entity_id!(
    /// Identifies a warehouse.
    WarehouseId
);
entity_id!(
    /// Identifies a single stock record (equipment, material or tool).
    StockItemId
);

/// A field technician as seen by dispatch.
///
/// Static attributes come from the user directory; dispatch only flips
/// availability and the current order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
    pub phone: String,
    /// Where the technician starts from. `(0, 0)` means not recorded.
    pub home: Coordinate,
    pub is_available: bool,
    pub current_order_id: Option<OrderId>,
}

impl Technician {
    #[must_use]
    pub const fn new(id: TechnicianId, name: String, phone: String, home: Coordinate) -> Self {
        Self {
            id,
            name,
            phone,
            home,
            is_available: true,
            current_order_id: None,
        }
    }

    /// Returns true if the technician can be matched to a new order.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.is_available && self.current_order_id.is_none() && !self.home.is_unknown()
    }

    /// Marks the technician as working on `order_id`.
    pub const fn assign(&mut self, order_id: OrderId) {
        self.is_available = false;
        self.current_order_id = Some(order_id);
    }

    /// Makes the technician available again.
    pub const fn release(&mut self) {
        self.is_available = true;
        self.current_order_id = None;
    }
}

/// A stock-holding location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub coordinate: Coordinate,
}

impl Warehouse {
    #[must_use]
    pub const fn new(id: WarehouseId, name: String, coordinate: Coordinate) -> Self {
        Self {
            id,
            name,
            coordinate,
        }
    }
}

/// The last known position of a technician working an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveLocation {
    pub technician_id: TechnicianId,
    pub order_id: OrderId,
    pub coordinate: Coordinate,
}

/// One entry of a tracking snapshot pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianPosition {
    pub technician_id: TechnicianId,
    pub order_id: OrderId,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&LiveLocation> for TechnicianPosition {
    fn from(location: &LiveLocation) -> Self {
        Self {
            technician_id: location.technician_id,
            order_id: location.order_id,
            latitude: location.coordinate.latitude(),
            longitude: location.coordinate.longitude(),
        }
    }
}
