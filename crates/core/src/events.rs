// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Internal triggers raised by the simulator and the tracking hub.
//!
//! Both components only hold the sending half; the dispatcher drains the
//! receiving half and turns each event into a state transition.

use fieldops_domain::{OrderId, TechnicianId};
use tokio::sync::mpsc;
use tracing::debug;

/// Something happened that may move an order forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentEvent {
    /// At least one technician simulation is running for the order.
    SimulationStarted { order_id: OrderId },
    /// A technician reached the job location.
    TechnicianArrived {
        order_id: OrderId,
        technician_id: TechnicianId,
    },
}

/// Sending half handed to the simulator and the hub.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<FulfillmentEvent>,
}

impl EventSender {
    /// Emits an event. Dropped silently once the dispatcher stopped listening.
    pub fn emit(&self, event: FulfillmentEvent) {
        if self.tx.send(event).is_err() {
            debug!(?event, "Fulfillment event dropped; no listener");
        }
    }
}

/// Receiving half drained by the dispatcher's event loop.
#[derive(Debug)]
pub struct FulfillmentEvents {
    rx: mpsc::UnboundedReceiver<FulfillmentEvent>,
}

impl FulfillmentEvents {
    /// Waits for the next event; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<FulfillmentEvent> {
        self.rx.recv().await
    }
}

/// Creates a connected sender and receiver.
#[must_use]
pub fn channel() -> (EventSender, FulfillmentEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, FulfillmentEvents { rx })
}
