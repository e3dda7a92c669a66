// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-memory collaborators with knobs for failure injection.

use crate::{
    Collaborators, DirectionsProvider, Dispatcher, FulfillmentEvents, Geocoder, LegRequest,
    OrderStore, ProviderError, RuntimeConfig, SimulationConfig, StockCheck, StoreError,
    TrackingConfig, UserDirectory, WarehouseDirectory,
};
use async_trait::async_trait;
use fieldops_domain::{
    Coordinate, EquipmentRequirement, Leg, Order, OrderId, OrderType, StockRequirement,
    Technician, TechnicianId, Warehouse, WarehouseId, distance_km,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const JOB: (f64, f64) = (47.0105, 28.8638);

pub fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).unwrap()
}

pub fn create_test_job() -> Coordinate {
    coord(JOB.0, JOB.1)
}

pub fn create_test_technician(name: &str, latitude: f64, longitude: f64) -> Technician {
    Technician::new(
        TechnicianId::new(),
        String::from(name),
        String::from("+37360000000"),
        coord(latitude, longitude),
    )
}

pub fn create_test_warehouse(name: &str, latitude: f64, longitude: f64) -> Warehouse {
    Warehouse::new(WarehouseId::new(), String::from(name), coord(latitude, longitude))
}

pub fn create_test_requirement() -> StockRequirement {
    StockRequirement::new(
        OrderType::Installation,
        Some(EquipmentRequirement {
            model_name: Some(String::from("Daikin FTXM35")),
            min_btu: None,
        }),
    )
}

/// Fast timings so simulations finish within a test.
pub fn create_test_config() -> RuntimeConfig {
    RuntimeConfig {
        simulation: SimulationConfig {
            step_interval: Duration::from_millis(2),
            jitter: 0.0,
            pause_probability: 0.0,
            metres_per_step: 100_000.0,
            min_steps: 2,
            max_steps: 3,
            stop_pause: Duration::from_millis(1),
        },
        tracking: TrackingConfig {
            push_interval: Duration::from_millis(5),
            ..TrackingConfig::default()
        },
        ..RuntimeConfig::default()
    }
}

/// Straight-line directions with optional failures and latency.
#[derive(Default)]
pub struct FakeDirections {
    /// Requests whose origin equals one of these fail.
    pub failing_origins: Mutex<Vec<Coordinate>>,
    pub latency: Mutex<Option<Duration>>,
    pub requests: Mutex<Vec<LegRequest>>,
    pub calls: AtomicUsize,
}

impl FakeDirections {
    pub fn fail_from(&self, origin: Coordinate) {
        self.failing_origins.lock().unwrap().push(origin);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn recorded(&self) -> Vec<LegRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectionsProvider for FakeDirections {
    async fn directions(&self, request: &LegRequest) -> Result<Leg, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let latency: Option<Duration> = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self
            .failing_origins
            .lock()
            .unwrap()
            .contains(&request.origin)
        {
            return Err(ProviderError::new("no route"));
        }

        let distance: f64 = distance_km(&request.origin, &request.destination);
        Ok(Leg {
            distance_km: distance,
            duration_min: distance * 1.5,
            waypoints: vec![request.origin, request.destination],
        })
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    pub known: Mutex<HashMap<String, Coordinate>>,
}

impl FakeGeocoder {
    pub fn with(address: &str, coordinate: Coordinate) -> Self {
        let geocoder: Self = Self::default();
        geocoder
            .known
            .lock()
            .unwrap()
            .insert(String::from(address), coordinate);
        geocoder
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinate> {
        self.known.lock().unwrap().get(address).copied()
    }
}

/// Versioned order store; `conflicts` makes the next N updates fail.
#[derive(Default)]
pub struct FakeOrderStore {
    pub orders: Mutex<HashMap<OrderId, Order>>,
    pub conflicts: AtomicUsize,
    pub fail_inserts: Mutex<bool>,
    pub updates: AtomicUsize,
}

impl FakeOrderStore {
    pub fn inject_conflicts(&self, count: usize) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    pub fn stored(&self, id: OrderId) -> Order {
        self.orders.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for FakeOrderStore {
    async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        self.orders
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Order {id}")))
    }

    async fn insert(&self, mut order: Order) -> Result<Order, StoreError> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(StoreError::Unavailable(String::from("insert disabled")));
        }
        order.version = 1;
        self.orders.lock().unwrap().insert(order.id, order.clone());
        Ok(order)
    }

    async fn update(&self, mut order: Order) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let current: &mut Order = orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::NotFound(format!("Order {}", order.id)))?;

        let pending: usize = self.conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::VersionConflict {
                expected: order.version,
                found: order.version + 1,
            });
        }
        if current.version != order.version {
            return Err(StoreError::VersionConflict {
                expected: order.version,
                found: current.version,
            });
        }
        order.version += 1;
        *current = order.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(order)
    }

    async fn find_active_by_technician(
        &self,
        technician_id: TechnicianId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|o| !o.is_terminal() && o.is_assigned(&technician_id))
            .cloned())
    }
}

#[derive(Default)]
pub struct FakeUsers {
    pub technicians: Mutex<Vec<Technician>>,
    /// Reservations of these ids fail as if taken concurrently.
    pub contended: Mutex<HashSet<TechnicianId>>,
}

impl FakeUsers {
    pub fn with(technicians: Vec<Technician>) -> Self {
        Self {
            technicians: Mutex::new(technicians),
            contended: Mutex::new(HashSet::new()),
        }
    }

    pub fn get(&self, id: TechnicianId) -> Technician {
        self.technicians
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn technicians(&self) -> Result<Vec<Technician>, StoreError> {
        Ok(self.technicians.lock().unwrap().clone())
    }

    async fn reserve(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError> {
        if self.contended.lock().unwrap().contains(&id) {
            return Ok(false);
        }
        let mut technicians = self.technicians.lock().unwrap();
        let technician: &mut Technician = technicians
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Technician {id}")))?;
        if !technician.is_assignable() {
            return Ok(false);
        }
        technician.assign(order_id);
        Ok(true)
    }

    async fn release(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError> {
        let mut technicians = self.technicians.lock().unwrap();
        let technician: &mut Technician = technicians
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Technician {id}")))?;
        if technician.current_order_id != Some(order_id) {
            return Ok(false);
        }
        technician.release();
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeWarehouses {
    pub warehouses: Mutex<Vec<Warehouse>>,
}

#[async_trait]
impl WarehouseDirectory for FakeWarehouses {
    async fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        Ok(self.warehouses.lock().unwrap().clone())
    }
}

/// Stock as two sets of warehouse ids plus a reservation log.
#[derive(Default)]
pub struct FakeStock {
    pub with_equipment: Mutex<HashSet<WarehouseId>>,
    pub with_supplies: Mutex<HashSet<WarehouseId>>,
    pub fail_reserve: Mutex<bool>,
    pub reserved: AtomicUsize,
    pub restored: AtomicUsize,
}

impl FakeStock {
    pub fn stock_all(&self, warehouse: WarehouseId) {
        self.with_equipment.lock().unwrap().insert(warehouse);
        self.with_supplies.lock().unwrap().insert(warehouse);
    }
}

#[async_trait]
impl StockCheck for FakeStock {
    async fn has_equipment(
        &self,
        warehouse_id: WarehouseId,
        _requirement: &EquipmentRequirement,
    ) -> Result<bool, StoreError> {
        Ok(self.with_equipment.lock().unwrap().contains(&warehouse_id))
    }

    async fn has_supplies(
        &self,
        warehouse_id: WarehouseId,
        _order_type: OrderType,
    ) -> Result<bool, StoreError> {
        Ok(self.with_supplies.lock().unwrap().contains(&warehouse_id))
    }

    async fn reserve(
        &self,
        _primary: WarehouseId,
        _equipment_source: WarehouseId,
        _requirement: &StockRequirement,
    ) -> Result<(), StoreError> {
        if *self.fail_reserve.lock().unwrap() {
            return Err(StoreError::NotFound(String::from("Stock")));
        }
        self.reserved.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn restore(
        &self,
        _primary: WarehouseId,
        _equipment_source: WarehouseId,
        _requirement: &StockRequirement,
    ) -> Result<(), StoreError> {
        self.restored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A dispatcher wired to fakes the test can still reach.
pub struct TestWorld {
    pub dispatcher: Dispatcher,
    pub events: Option<FulfillmentEvents>,
    pub orders: Arc<FakeOrderStore>,
    pub users: Arc<FakeUsers>,
    pub warehouses: Arc<FakeWarehouses>,
    pub stock: Arc<FakeStock>,
    pub directions: Arc<FakeDirections>,
}

impl TestWorld {
    pub fn technician(&self, id: TechnicianId) -> Technician {
        self.users.get(id)
    }

    /// Runs the dispatcher's event loop until the returned token is cancelled.
    pub fn spawn_event_loop(&mut self) -> CancellationToken {
        let events: FulfillmentEvents = self.events.take().unwrap();
        let shutdown: CancellationToken = CancellationToken::new();
        let dispatcher: Dispatcher = self.dispatcher.clone();
        let token: CancellationToken = shutdown.clone();
        tokio::spawn(async move { dispatcher.run(events, token).await });
        shutdown
    }
}

/// Two technicians near the job, one fully stocked warehouse.
pub fn create_test_world() -> TestWorld {
    let technicians: Vec<Technician> = vec![
        create_test_technician("Ion", 47.02, 28.87),
        create_test_technician("Maria", 47.05, 28.90),
    ];
    let warehouse: Warehouse = create_test_warehouse("Central", 47.03, 28.83);
    create_test_world_with(technicians, vec![warehouse], true)
}

pub fn create_test_world_with(
    technicians: Vec<Technician>,
    warehouses: Vec<Warehouse>,
    stock_all: bool,
) -> TestWorld {
    create_configured_world(technicians, warehouses, stock_all, create_test_config())
}

pub fn create_configured_world(
    technicians: Vec<Technician>,
    warehouses: Vec<Warehouse>,
    stock_all: bool,
    config: RuntimeConfig,
) -> TestWorld {
    let stock: Arc<FakeStock> = Arc::new(FakeStock::default());
    if stock_all {
        for warehouse in &warehouses {
            stock.stock_all(warehouse.id);
        }
    }
    let orders: Arc<FakeOrderStore> = Arc::new(FakeOrderStore::default());
    let users: Arc<FakeUsers> = Arc::new(FakeUsers::with(technicians));
    let warehouse_directory: Arc<FakeWarehouses> = Arc::new(FakeWarehouses {
        warehouses: Mutex::new(warehouses),
    });
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let geocoder: Arc<FakeGeocoder> = Arc::new(FakeGeocoder::with(
        "Strada Studentilor 9, Chisinau",
        create_test_job(),
    ));

    let collaborators: Collaborators = Collaborators {
        orders: orders.clone(),
        users: users.clone(),
        warehouses: warehouse_directory.clone(),
        stock: stock.clone(),
        directions: directions.clone(),
        geocoder,
    };
    let (dispatcher, events) = Dispatcher::new(collaborators, config);

    TestWorld {
        dispatcher,
        events: Some(events),
        orders,
        users,
        warehouses: warehouse_directory,
        stock,
        directions,
    }
}

/// Polls `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
