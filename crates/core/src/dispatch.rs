// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Dispatch orchestration and the order fulfillment state machine.
//!
//! Every transition reads the stored order fresh, plans the change against
//! that state, and writes it back with an optimistic version check. A
//! conflicting concurrent writer causes exactly one re-read and retry; a
//! second conflict is reported to the caller. Side effects (tracking,
//! simulation, technician release) run only after the write succeeded, so
//! two racing requests can never both trigger them.

use crate::config::{DispatchConfig, SimulationConfig, TrackingConfig};
use crate::error::{CoreError, NotFoundReason, StoreError};
use crate::events::{self, FulfillmentEvent, FulfillmentEvents};
use crate::matcher::{find_technicians, rank_warehouses};
use crate::ports::{
    DirectionsProvider, Geocoder, OrderStore, StockCheck, UserDirectory, WarehouseDirectory,
};
use crate::routes::RouteBuilder;
use crate::simulator::{MovementSimulator, SimulationRegistry, SimulationReport};
use crate::tracking::{CloseReason, LocationUpdate, TrackingHub};
use fieldops_domain::{
    Coordinate, FulfillmentStatus, LiveLocation, Order, OrderId, Route, StockRequirement,
    Technician, TechnicianId, Transition, Trigger, Warehouse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Re-reads after a version conflict before giving up.
const CONFLICT_RETRIES: usize = 1;

/// Everything the dispatcher talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserDirectory>,
    pub warehouses: Arc<dyn WarehouseDirectory>,
    pub stock: Arc<dyn StockCheck>,
    pub directions: Arc<dyn DirectionsProvider>,
    pub geocoder: Arc<dyn Geocoder>,
}

/// Settings for every component the dispatcher owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    pub dispatch: DispatchConfig,
    pub simulation: SimulationConfig,
    pub tracking: TrackingConfig,
}

/// Input of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub job: Coordinate,
    pub requirement: StockRequirement,
    /// Explicitly chosen technicians; empty means pick the nearest.
    #[serde(default)]
    pub technician_ids: Vec<TechnicianId>,
    #[serde(default)]
    pub technician_count: Option<usize>,
}

/// Where the job is, as given by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobLocation {
    Address(String),
    Coordinate(Coordinate),
}

/// Input of order placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub location: JobLocation,
    pub requirement: StockRequirement,
    #[serde(default)]
    pub technician_ids: Vec<TechnicianId>,
    #[serde(default)]
    pub technician_count: Option<usize>,
}

/// A complete, uncommitted assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPlan {
    /// Supplies materials and tools, and equipment unless a secondary is set.
    pub warehouse: Warehouse,
    /// Supplies the equipment the primary lacks.
    pub secondary_warehouse: Option<Warehouse>,
    /// Technicians that received a route.
    pub technicians: Vec<Technician>,
    /// Nearest technician's route first.
    pub routes: Vec<Route>,
}

impl DispatchPlan {
    /// Warehouse stops in travel order.
    #[must_use]
    pub fn stops(&self) -> Vec<Warehouse> {
        std::iter::once(self.warehouse.clone())
            .chain(self.secondary_warehouse.clone())
            .collect()
    }
}

struct WarehouseSelection {
    primary: Warehouse,
    secondary: Option<Warehouse>,
}

/// Orchestrates matching, routing, simulation and tracking for orders.
#[derive(Clone)]
pub struct Dispatcher {
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserDirectory>,
    warehouses: Arc<dyn WarehouseDirectory>,
    stock: Arc<dyn StockCheck>,
    geocoder: Arc<dyn Geocoder>,
    routes: RouteBuilder,
    simulator: MovementSimulator,
    hub: TrackingHub,
    config: DispatchConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("simulator", &self.simulator)
            .field("hub", &self.hub)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates the dispatcher together with its tracking hub and simulator.
    ///
    /// The returned event stream must be handed to [`Dispatcher::run`] so
    /// internal triggers (simulation started, technician arrived) advance
    /// orders.
    #[must_use]
    pub fn new(collaborators: Collaborators, config: RuntimeConfig) -> (Self, FulfillmentEvents) {
        let (sender, receiver) = events::channel();
        let hub: TrackingHub = TrackingHub::new(config.tracking, sender.clone());
        let simulator: MovementSimulator = MovementSimulator::new(
            config.simulation,
            SimulationRegistry::new(),
            hub.clone(),
            sender,
        );
        let routes: RouteBuilder =
            RouteBuilder::new(collaborators.directions, config.dispatch.leg_timeout);

        let dispatcher: Self = Self {
            orders: collaborators.orders,
            users: collaborators.users,
            warehouses: collaborators.warehouses,
            stock: collaborators.stock,
            geocoder: collaborators.geocoder,
            routes,
            simulator,
            hub,
            config: config.dispatch,
        };
        (dispatcher, receiver)
    }

    #[must_use]
    pub const fn hub(&self) -> &TrackingHub {
        &self.hub
    }

    #[must_use]
    pub const fn simulator(&self) -> &MovementSimulator {
        &self.simulator
    }

    /// Finds a warehouse, technicians and routes for a job without
    /// committing anything.
    ///
    /// # Errors
    ///
    /// * `CoreError::NotFound` if the location is unknown or no warehouse,
    ///   stock, technician or route is available
    /// * `CoreError::Store` if a directory cannot be read
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchPlan, CoreError> {
        let job: Coordinate = request.job;
        if job.is_unknown() {
            return Err(CoreError::NotFound(NotFoundReason::UnknownLocation));
        }

        let selection: WarehouseSelection =
            self.select_warehouses(&job, &request.requirement).await?;

        let all_technicians: Vec<Technician> = self.users.technicians().await?;
        let count: usize = request
            .technician_count
            .unwrap_or(self.config.default_technician_count);
        let matched: Vec<Technician> =
            find_technicians(&job, &all_technicians, &request.technician_ids, count);
        if matched.is_empty() {
            info!("Dispatch failed: no available technicians");
            return Err(CoreError::NotFound(NotFoundReason::NoTechnicians));
        }

        let stops: Vec<Warehouse> = std::iter::once(selection.primary.clone())
            .chain(selection.secondary.clone())
            .collect();
        let routes: Vec<Route> = self.routes.build_routes(job, &stops, &matched).await;
        if routes.is_empty() {
            info!(technicians = matched.len(), "Dispatch failed: no routes");
            return Err(CoreError::NotFound(NotFoundReason::NoRoutes));
        }

        let technicians: Vec<Technician> = matched
            .into_iter()
            .filter(|t| routes.iter().any(|r| r.technician_id == t.id))
            .collect();

        info!(
            warehouse = %selection.primary.id,
            secondary = ?selection.secondary.as_ref().map(|w| w.id),
            technicians = technicians.len(),
            routes = routes.len(),
            "Dispatch planned"
        );
        Ok(DispatchPlan {
            warehouse: selection.primary,
            secondary_warehouse: selection.secondary,
            technicians,
            routes,
        })
    }

    /// Picks the warehouse(s) that supply the order.
    ///
    /// The nearest warehouse holding everything wins. Failing that, the
    /// nearest warehouse with materials and tools is paired with the nearest
    /// other warehouse holding the equipment.
    async fn select_warehouses(
        &self,
        job: &Coordinate,
        requirement: &StockRequirement,
    ) -> Result<WarehouseSelection, CoreError> {
        let all: Vec<Warehouse> = self.warehouses.warehouses().await?;
        let ranked: Vec<&Warehouse> = rank_warehouses(job, &all);
        if ranked.is_empty() {
            info!("Dispatch failed: no warehouses");
            return Err(CoreError::NotFound(NotFoundReason::NoWarehouse));
        }

        for warehouse in &ranked {
            if self.stock.has_all(warehouse.id, requirement).await? {
                return Ok(WarehouseSelection {
                    primary: (*warehouse).clone(),
                    secondary: None,
                });
            }
        }

        let no_stock = || {
            info!(order_type = requirement.order_type.as_str(), "Dispatch failed: no stock");
            CoreError::NotFound(NotFoundReason::NoStock)
        };

        let Some(equipment) = &requirement.equipment else {
            return Err(no_stock());
        };

        let mut primary: Option<&Warehouse> = None;
        for warehouse in &ranked {
            if self
                .stock
                .has_supplies(warehouse.id, requirement.order_type)
                .await?
            {
                primary = Some(*warehouse);
                break;
            }
        }
        let Some(primary) = primary else {
            return Err(no_stock());
        };

        for warehouse in ranked.iter().filter(|w| w.id != primary.id) {
            if self.stock.has_equipment(warehouse.id, equipment).await? {
                return Ok(WarehouseSelection {
                    primary: primary.clone(),
                    secondary: Some((*warehouse).clone()),
                });
            }
        }
        Err(no_stock())
    }

    /// Dispatches and commits a new order.
    ///
    /// Technicians and stock are reserved first; if any reservation fails,
    /// everything already reserved is given back and no order is stored.
    ///
    /// # Errors
    ///
    /// * `CoreError::NotFound` if the address cannot be geocoded, dispatch
    ///   fails, or a technician was taken concurrently
    /// * `CoreError::Store` if a collaborator fails
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, CoreError> {
        let (job, address): (Coordinate, Option<String>) = match request.location {
            JobLocation::Coordinate(coordinate) => (coordinate, None),
            JobLocation::Address(address) => {
                let Some(coordinate) = self.geocoder.geocode(&address).await else {
                    info!(%address, "Order rejected: address not geocoded");
                    return Err(CoreError::NotFound(NotFoundReason::AddressNotGeocoded));
                };
                (coordinate, Some(address))
            }
        };

        let plan: DispatchPlan = self
            .dispatch(&DispatchRequest {
                job,
                requirement: request.requirement.clone(),
                technician_ids: request.technician_ids,
                technician_count: request.technician_count,
            })
            .await?;

        let order_id: OrderId = OrderId::new();
        let mut reserved: Vec<TechnicianId> = Vec::with_capacity(plan.technicians.len());
        for technician in &plan.technicians {
            match self.users.reserve(technician.id, order_id).await {
                Ok(true) => reserved.push(technician.id),
                Ok(false) => {
                    warn!(
                        %order_id,
                        technician_id = %technician.id,
                        "Technician taken concurrently"
                    );
                    self.unreserve(order_id, &reserved).await;
                    return Err(CoreError::NotFound(NotFoundReason::NoTechnicians));
                }
                Err(e) => {
                    self.unreserve(order_id, &reserved).await;
                    return Err(e.into());
                }
            }
        }

        let primary = plan.warehouse.id;
        let equipment_source = plan
            .secondary_warehouse
            .as_ref()
            .map_or(primary, |w| w.id);
        if let Err(e) = self
            .stock
            .reserve(primary, equipment_source, &request.requirement)
            .await
        {
            self.unreserve(order_id, &reserved).await;
            return Err(match e {
                StoreError::NotFound(_) => CoreError::NotFound(NotFoundReason::NoStock),
                other => other.into(),
            });
        }

        let mut order: Order = Order::new(
            order_id,
            request.requirement.order_type,
            job,
            address,
            OffsetDateTime::now_utc(),
        );
        order.warehouse_id = Some(primary);
        order.secondary_warehouse_id = plan.secondary_warehouse.as_ref().map(|w| w.id);
        order.assigned_technicians = reserved.iter().copied().collect();
        order.initial_routes = plan.routes;

        let stored: Order = match self.orders.insert(order).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(%order_id, error = %e, "Order insert failed; rolling back");
                self.unreserve(order_id, &reserved).await;
                if let Err(restore_error) = self
                    .stock
                    .restore(primary, equipment_source, &request.requirement)
                    .await
                {
                    error!(
                        %order_id,
                        error = %restore_error,
                        "Reserved stock could not be restored"
                    );
                }
                return Err(e.into());
            }
        };

        for technician in &plan.technicians {
            self.hub
                .seed_location(technician.id, order_id, technician.home);
        }

        info!(
            %order_id,
            technicians = stored.assigned_technicians.len(),
            "Order placed"
        );
        Ok(stored)
    }

    async fn unreserve(&self, order_id: OrderId, technicians: &[TechnicianId]) {
        for technician_id in technicians {
            if let Err(e) = self.users.release(*technician_id, order_id).await {
                error!(%order_id, %technician_id, error = %e, "Rollback release failed");
            }
        }
    }

    /// Reads an order.
    ///
    /// # Errors
    ///
    /// `CoreError::OrderNotFound` if it does not exist.
    pub async fn order(&self, order_id: OrderId) -> Result<Order, CoreError> {
        self.orders.get(order_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => CoreError::OrderNotFound(order_id),
            other => other.into(),
        })
    }

    /// Applies a manager's status request.
    ///
    /// # Errors
    ///
    /// * `CoreError::DomainViolation` if the transition is not permitted
    /// * `CoreError::ConcurrencyConflict` if the order changed underneath twice
    /// * `CoreError::OrderNotFound` if the order does not exist
    pub async fn advance_status(
        &self,
        order_id: OrderId,
        requested: FulfillmentStatus,
    ) -> Result<Order, CoreError> {
        self.apply_trigger(order_id, Trigger::Requested(requested))
            .await
            .inspect_err(|e| {
                warn!(
                    %order_id,
                    requested = requested.as_str(),
                    error = %e,
                    "Status change rejected"
                );
            })
    }

    /// Plans and persists one transition, then runs its side effects.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::advance_status`].
    pub async fn apply_trigger(
        &self,
        order_id: OrderId,
        trigger: Trigger,
    ) -> Result<Order, CoreError> {
        let mut conflicts: usize = 0;
        loop {
            let mut order: Order = self.order(order_id).await?;
            let transition: Transition = order.plan(trigger)?;
            order.apply(transition);

            match self.orders.update(order).await {
                Ok(stored) => {
                    info!(
                        %order_id,
                        %trigger,
                        status = stored.status.as_str(),
                        progress = stored.progress.as_str(),
                        "Order transitioned"
                    );
                    self.after_transition(&stored, transition).await;
                    return Ok(stored);
                }
                Err(StoreError::VersionConflict { expected, found })
                    if conflicts < CONFLICT_RETRIES =>
                {
                    conflicts += 1;
                    warn!(%order_id, expected, found, "Order changed concurrently; retrying");
                }
                Err(StoreError::VersionConflict { .. }) => {
                    error!(%order_id, %trigger, "Order changed concurrently again; giving up");
                    return Err(CoreError::ConcurrencyConflict(order_id));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn after_transition(&self, order: &Order, transition: Transition) {
        match transition {
            Transition::Process => {
                self.hub.open(
                    order.id,
                    order.installation,
                    order.assigned_technicians.clone(),
                );
                self.simulator.start_order(order);
            }
            Transition::DepartWorkers | Transition::StartInstallation => {}
            Transition::Complete | Transition::Cancel => {
                self.simulator.cancel_order(order.id);
                self.release_technicians(order).await;
                self.hub.close(order.id, CloseReason::OrderFinished);
            }
        }
    }

    /// Makes every technician on the order available again and clears their
    /// live location. Technicians already released are skipped, so calling
    /// this again, or for an order with nobody assigned, changes nothing.
    ///
    /// Returns how many technicians were actually released.
    pub async fn release_technicians(&self, order: &Order) -> usize {
        let mut released: usize = 0;
        for technician_id in &order.assigned_technicians {
            match self.users.release(*technician_id, order.id).await {
                Ok(true) => released += 1,
                Ok(false) => debug!(order_id = %order.id, %technician_id, "Already released"),
                Err(e) => {
                    error!(order_id = %order.id, %technician_id, error = %e, "Release failed");
                }
            }
            self.hub.clear_location(*technician_id, order.id);
        }
        if released > 0 {
            info!(order_id = %order.id, released, "Technicians released");
        }
        released
    }

    /// Starts simulation for an order that is in progress.
    ///
    /// # Errors
    ///
    /// * `CoreError::OrderNotFound` if the order does not exist
    /// * `CoreError::InvalidState` unless the order is in progress
    pub async fn start_simulation(&self, order_id: OrderId) -> Result<SimulationReport, CoreError> {
        let order: Order = self.order(order_id).await?;
        if order.status != FulfillmentStatus::InProgress {
            return Err(CoreError::InvalidState {
                order_id,
                status: order.status,
            });
        }
        self.hub
            .open(order.id, order.installation, order.assigned_technicians.clone());
        Ok(self.simulator.start_order(&order))
    }

    /// Cancels every running simulation for the order.
    pub fn stop_simulation(&self, order_id: OrderId) -> usize {
        self.simulator.cancel_order(order_id)
    }

    /// Records a technician-reported position.
    ///
    /// If the technician has no live location yet but is assigned to an
    /// active order, the location is seeded for that order first.
    ///
    /// # Errors
    ///
    /// `CoreError::TechnicianNotTracked` if the technician is on no active order.
    pub async fn update_location(
        &self,
        technician_id: TechnicianId,
        coordinate: Coordinate,
    ) -> Result<LocationUpdate, CoreError> {
        match self.hub.update_location(technician_id, coordinate) {
            Err(CoreError::TechnicianNotTracked(_)) => {}
            other => return other,
        }

        let Some(order) = self.orders.find_active_by_technician(technician_id).await? else {
            return Err(CoreError::TechnicianNotTracked(technician_id));
        };
        self.hub.seed_location(technician_id, order.id, coordinate);
        self.hub.update_location(technician_id, coordinate)
    }

    #[must_use]
    pub fn technician_location(&self, technician_id: TechnicianId) -> Option<LiveLocation> {
        self.hub.location(technician_id)
    }

    /// Returns true once every technician on the order arrived.
    ///
    /// # Errors
    ///
    /// `CoreError::OrderNotFound` if the order does not exist.
    pub async fn all_arrived(&self, order_id: OrderId) -> Result<bool, CoreError> {
        let order: Order = self.order(order_id).await?;
        Ok(self.hub.all_arrived(order.id))
    }

    /// Turns one internal event into a transition. Events that no longer
    /// apply (e.g. a second arrival) are ignored.
    pub async fn handle_event(&self, event: FulfillmentEvent) {
        let (order_id, trigger): (OrderId, Trigger) = match event {
            FulfillmentEvent::SimulationStarted { order_id } => {
                (order_id, Trigger::SimulationStarted)
            }
            FulfillmentEvent::TechnicianArrived { order_id, .. } => {
                (order_id, Trigger::TechnicianArrived)
            }
        };

        match self.apply_trigger(order_id, trigger).await {
            Ok(_) => {}
            Err(CoreError::DomainViolation(e)) => {
                debug!(%order_id, %trigger, reason = %e, "Event left order unchanged");
            }
            Err(e) => error!(%order_id, %trigger, error = %e, "Event handling failed"),
        }
    }

    /// Drains internal events until `shutdown` fires.
    pub async fn run(&self, mut events: FulfillmentEvents, shutdown: CancellationToken) {
        info!("Dispatcher event loop started");
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        info!("Dispatcher event loop stopped");
    }

    /// Cancels simulations and tracking loops and waits for them to exit.
    pub async fn shutdown(&self) {
        self.simulator.shutdown().await;
        self.hub.shutdown().await;
    }
}
