// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Latitude or longitude is outside the valid geographic range.
    InvalidCoordinate {
        /// The offending latitude.
        latitude: f64,
        /// The offending longitude.
        longitude: f64,
    },
    /// The (0, 0) placeholder was supplied where a real location is required.
    UnknownLocation,
    /// Fulfillment status string is not recognized.
    InvalidFulfillmentStatus {
        /// The invalid status string.
        status: String,
    },
    /// Work progress string is not recognized.
    InvalidWorkProgress {
        /// The invalid progress string.
        progress: String,
    },
    /// Order type string is not recognized.
    InvalidOrderType(String),
    /// The order is Completed or Cancelled and accepts no further transitions.
    TerminalOrder {
        /// The terminal status the order is in.
        status: String,
    },
    /// The requested transition is not permitted from the current state.
    InvalidStatusTransition {
        /// The current state.
        from: String,
        /// The requested trigger.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
    /// A stock quantity would drop below zero.
    InsufficientStock {
        /// The stock kind (equipment, material, tool).
        kind: &'static str,
        /// The item name.
        name: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCoordinate {
                latitude,
                longitude,
            } => write!(
                f,
                "Invalid coordinate ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]"
            ),
            Self::UnknownLocation => write!(f, "Location is unknown (0, 0)"),
            Self::InvalidFulfillmentStatus { status } => {
                write!(f, "Invalid fulfillment status: {status}")
            }
            Self::InvalidWorkProgress { progress } => {
                write!(f, "Invalid work progress: {progress}")
            }
            Self::InvalidOrderType(msg) => write!(f, "Invalid order type: {msg}"),
            Self::TerminalOrder { status } => {
                write!(f, "Order is {status} and cannot change state")
            }
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Invalid transition from {from} on {to}: {reason}")
            }
            Self::InsufficientStock { kind, name } => {
                write!(f, "Insufficient {kind} stock for '{name}'")
            }
        }
    }
}

impl std::error::Error for DomainError {}
