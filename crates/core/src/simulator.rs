// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-technician movement simulation.
//!
//! Every run walks a stored route waypoint by waypoint, interpolating
//! positions and reporting them to the tracking hub. Runs are owned by a
//! [`TaskTracker`] so they can be cancelled and joined, and each technician
//! can have at most one run, enforced by an exclusive claim in the
//! [`SimulationRegistry`].

use crate::config::SimulationConfig;
use crate::events::{EventSender, FulfillmentEvent};
use crate::tracking::TrackingHub;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fieldops_domain::{Order, OrderId, RoutePoint, TechnicianId, distance_km};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Segments shorter than this are not interpolated.
const MIN_SEGMENT_KM: f64 = 1e-6;

struct ClaimEntry {
    order_id: OrderId,
    generation: u64,
    token: CancellationToken,
}

/// Keyed registry of running simulations, one claim per technician.
#[derive(Clone, Default)]
pub struct SimulationRegistry {
    claims: Arc<DashMap<TechnicianId, ClaimEntry>>,
    generations: Arc<AtomicU64>,
}

impl std::fmt::Debug for SimulationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRegistry")
            .field("active", &self.claims.len())
            .finish()
    }
}

/// Exclusive right to simulate one technician. Released on drop.
#[derive(Debug)]
pub struct SimulationClaim {
    registry: SimulationRegistry,
    technician_id: TechnicianId,
    order_id: OrderId,
    generation: u64,
    token: CancellationToken,
}

impl SimulationClaim {
    #[must_use]
    pub const fn technician_id(&self) -> TechnicianId {
        self.technician_id
    }

    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for SimulationClaim {
    fn drop(&mut self) {
        let generation: u64 = self.generation;
        self.registry
            .claims
            .remove_if(&self.technician_id, |_, entry| entry.generation == generation);
    }
}

impl SimulationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the technician for a run on `order_id`.
    ///
    /// Returns `None` if a run for the technician is already registered; the
    /// existing run is left alone.
    #[must_use]
    pub fn try_claim(
        &self,
        technician_id: TechnicianId,
        order_id: OrderId,
    ) -> Option<SimulationClaim> {
        match self.claims.entry(technician_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let generation: u64 = self.generations.fetch_add(1, Ordering::Relaxed);
                let token: CancellationToken = CancellationToken::new();
                slot.insert(ClaimEntry {
                    order_id,
                    generation,
                    token: token.clone(),
                });
                Some(SimulationClaim {
                    registry: self.clone(),
                    technician_id,
                    order_id,
                    generation,
                    token,
                })
            }
        }
    }

    #[must_use]
    pub fn is_running(&self, technician_id: TechnicianId) -> bool {
        self.claims.contains_key(&technician_id)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.claims.len()
    }

    /// Requests cancellation of one technician's run.
    pub fn cancel_technician(&self, technician_id: TechnicianId) -> bool {
        match self.claims.get(&technician_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Requests cancellation of every run on `order_id` and returns how many
    /// were signalled.
    pub fn cancel_order(&self, order_id: OrderId) -> usize {
        let mut cancelled: usize = 0;
        for entry in self.claims.iter().filter(|entry| entry.order_id == order_id) {
            entry.token.cancel();
            cancelled += 1;
        }
        cancelled
    }

    fn cancel_all(&self) {
        for entry in self.claims.iter() {
            entry.token.cancel();
        }
    }
}

/// Result of trying to start one technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run for this technician is already in progress; nothing changed.
    AlreadyRunning,
    /// The order holds no route with at least two waypoints for the technician.
    NoRoute,
}

/// Per-order summary of a start request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub started: usize,
    pub already_running: usize,
    pub without_route: usize,
}

/// Runs technician movement along stored routes.
#[derive(Clone)]
pub struct MovementSimulator {
    registry: SimulationRegistry,
    hub: TrackingHub,
    events: EventSender,
    config: Arc<SimulationConfig>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for MovementSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementSimulator")
            .field("registry", &self.registry)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl MovementSimulator {
    #[must_use]
    pub fn new(
        config: SimulationConfig,
        registry: SimulationRegistry,
        hub: TrackingHub,
        events: EventSender,
    ) -> Self {
        Self {
            registry,
            hub,
            events,
            config: Arc::new(config),
            tasks: TaskTracker::new(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &SimulationRegistry {
        &self.registry
    }

    /// Starts a run for every technician assigned to the order.
    ///
    /// Technicians already running are skipped without touching their run.
    /// Emits `SimulationStarted` if at least one run began.
    pub fn start_order(&self, order: &Order) -> SimulationReport {
        let mut report: SimulationReport = SimulationReport::default();
        for technician_id in &order.assigned_technicians {
            match self.start_technician(order, *technician_id) {
                StartOutcome::Started => report.started += 1,
                StartOutcome::AlreadyRunning => report.already_running += 1,
                StartOutcome::NoRoute => report.without_route += 1,
            }
        }

        if report.started > 0 {
            self.events.emit(FulfillmentEvent::SimulationStarted { order_id: order.id });
        }
        info!(
            order_id = %order.id,
            started = report.started,
            already_running = report.already_running,
            without_route = report.without_route,
            "Simulation requested"
        );
        report
    }

    /// Starts one technician's run along their stored route.
    pub fn start_technician(&self, order: &Order, technician_id: TechnicianId) -> StartOutcome {
        let points: Vec<RoutePoint> = match order.route_for(&technician_id) {
            Some(route) if route.waypoints.len() >= 2 => route.waypoints.clone(),
            _ => {
                debug!(order_id = %order.id, %technician_id, "No route to simulate");
                return StartOutcome::NoRoute;
            }
        };

        let Some(claim) = self.registry.try_claim(technician_id, order.id) else {
            warn!(
                order_id = %order.id,
                %technician_id,
                "Simulation already running; start ignored"
            );
            return StartOutcome::AlreadyRunning;
        };

        let simulator: Self = self.clone();
        self.tasks.spawn(async move { simulator.walk(claim, points).await });
        StartOutcome::Started
    }

    /// Cancels every run of the order. Returns how many were signalled.
    pub fn cancel_order(&self, order_id: OrderId) -> usize {
        let cancelled: usize = self.registry.cancel_order(order_id);
        if cancelled > 0 {
            info!(%order_id, cancelled, "Simulation cancelled");
        }
        cancelled
    }

    /// Cancels one technician's run; siblings keep going.
    pub fn cancel_technician(&self, technician_id: TechnicianId) -> bool {
        self.registry.cancel_technician(technician_id)
    }

    /// Cancels every run and waits until all of them exited.
    pub async fn shutdown(&self) {
        self.registry.cancel_all();
        self.tasks.close();
        self.tasks.wait().await;
    }

    async fn walk(self, claim: SimulationClaim, points: Vec<RoutePoint>) {
        let order_id: OrderId = claim.order_id();
        let technician_id: TechnicianId = claim.technician_id();
        let token: &CancellationToken = claim.token();
        info!(%order_id, %technician_id, waypoints = points.len(), "Simulation started");

        for pair in points.windows(2) {
            let [from, to] = pair else { continue };
            let segment_km: f64 = distance_km(&from.coordinate, &to.coordinate);

            if segment_km > MIN_SEGMENT_KM {
                let steps: u32 = self.config.steps_for(segment_km);
                for step in 1..=steps {
                    if token.is_cancelled() {
                        info!(%order_id, %technician_id, "Simulation cancelled mid-route");
                        return;
                    }
                    let position = from
                        .coordinate
                        .lerp(&to.coordinate, f64::from(step) / f64::from(steps));
                    if let Err(e) = self.hub.update_location(technician_id, position) {
                        warn!(%order_id, %technician_id, error = %e, "Stopping simulation");
                        return;
                    }
                    if !pause(token, self.config.next_delay()).await {
                        info!(%order_id, %technician_id, "Simulation cancelled mid-route");
                        return;
                    }
                }
            }

            if to.is_stop_point && !pause(token, self.config.stop_pause).await {
                info!(%order_id, %technician_id, "Simulation cancelled at stop");
                return;
            }
        }

        if token.is_cancelled() {
            return;
        }
        self.hub.mark_arrived(order_id, technician_id);
        info!(%order_id, %technician_id, "Simulation finished");
    }
}

/// Sleeps for `delay`; returns `false` if cancelled first.
async fn pause(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
