// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Order fulfillment status and the transition table.
//!
//! An order is in a `(FulfillmentStatus, WorkProgress)` pair. Managers may
//! only request `InProgress`, `Completed` or `Cancelled`; the remaining
//! progress steps are driven by internal triggers (simulation start and
//! technician arrival). Completed and Cancelled are terminal.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coarse order lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

impl FulfillmentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl FromStr for FulfillmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidFulfillmentStatus {
                status: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fine-grained stage within an active order.
///
/// Variants are declared in the order they are reached; progress never moves
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkProgress {
    OrderPlaced,
    OrderProcessed,
    WorkersOnTheRoad,
    InstallationStarted,
    InstallationCompleted,
}

impl WorkProgress {
    /// Returns the string representation of the progress step.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::OrderProcessed => "order_processed",
            Self::WorkersOnTheRoad => "workers_on_the_road",
            Self::InstallationStarted => "installation_started",
            Self::InstallationCompleted => "installation_completed",
        }
    }
}

impl FromStr for WorkProgress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" => Ok(Self::OrderPlaced),
            "order_processed" => Ok(Self::OrderProcessed),
            "workers_on_the_road" => Ok(Self::WorkersOnTheRoad),
            "installation_started" => Ok(Self::InstallationStarted),
            "installation_completed" => Ok(Self::InstallationCompleted),
            _ => Err(DomainError::InvalidWorkProgress {
                progress: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for WorkProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What asks an order to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A manager (or the system, for cancellation) requests a status.
    Requested(FulfillmentStatus),
    /// Movement simulation acknowledged that technicians set off.
    SimulationStarted,
    /// A technician came within the arrival threshold of the job.
    TechnicianArrived,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested(status) => write!(f, "request {status}"),
            Self::SimulationStarted => write!(f, "simulation started"),
            Self::TechnicianArrived => write!(f, "technician arrived"),
        }
    }
}

/// A permitted state change, carrying the side effects the orchestrator owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// New → InProgress / OrderProcessed. Opens tracking and starts simulation.
    Process,
    /// OrderProcessed → WorkersOnTheRoad. No side effects.
    DepartWorkers,
    /// → InstallationStarted on first arrival.
    StartInstallation,
    /// InProgress → Completed / InstallationCompleted. Releases technicians.
    Complete,
    /// Non-terminal → Cancelled, progress frozen. Releases and stops simulation.
    Cancel,
}

impl Transition {
    /// Decides which transition, if any, `trigger` causes from the given state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::TerminalOrder` for Completed or Cancelled orders
    /// regardless of trigger, and `DomainError::InvalidStatusTransition` for
    /// any pair not in the transition table.
    pub fn plan(
        status: FulfillmentStatus,
        progress: WorkProgress,
        trigger: Trigger,
    ) -> Result<Self, DomainError> {
        if status.is_terminal() {
            return Err(DomainError::TerminalOrder {
                status: status.as_str().to_string(),
            });
        }

        let planned: Option<Self> = match (trigger, status, progress) {
            (Trigger::Requested(FulfillmentStatus::InProgress), FulfillmentStatus::New, _) => {
                Some(Self::Process)
            }
            (
                Trigger::Requested(FulfillmentStatus::Completed),
                FulfillmentStatus::InProgress,
                _,
            ) => Some(Self::Complete),
            (Trigger::Requested(FulfillmentStatus::Cancelled), _, _) => Some(Self::Cancel),
            (
                Trigger::SimulationStarted,
                FulfillmentStatus::InProgress,
                WorkProgress::OrderProcessed,
            ) => Some(Self::DepartWorkers),
            (
                Trigger::TechnicianArrived,
                FulfillmentStatus::InProgress,
                WorkProgress::OrderProcessed | WorkProgress::WorkersOnTheRoad,
            ) => Some(Self::StartInstallation),
            _ => None,
        };

        planned.ok_or_else(|| DomainError::InvalidStatusTransition {
            from: format!("{}/{}", status.as_str(), progress.as_str()),
            to: trigger.to_string(),
            reason: "transition not permitted by fulfillment rules".to_string(),
        })
    }

    /// The state the order is in after this transition.
    ///
    /// Cancellation keeps the current progress.
    #[must_use]
    pub const fn target(&self, current: WorkProgress) -> (FulfillmentStatus, WorkProgress) {
        match self {
            Self::Process => (FulfillmentStatus::InProgress, WorkProgress::OrderProcessed),
            Self::DepartWorkers => (FulfillmentStatus::InProgress, WorkProgress::WorkersOnTheRoad),
            Self::StartInstallation => (
                FulfillmentStatus::InProgress,
                WorkProgress::InstallationStarted,
            ),
            Self::Complete => (
                FulfillmentStatus::Completed,
                WorkProgress::InstallationCompleted,
            ),
            Self::Cancel => (FulfillmentStatus::Cancelled, current),
        }
    }

    /// Returns true if the transition ends the order.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancel)
    }
}
