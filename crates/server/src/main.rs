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
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod live;
mod seed;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use clap::Parser;
use fieldops::{
    Collaborators, CoreError, DirectionsProvider, DispatchConfig, DispatchPlan, DispatchRequest,
    Dispatcher, Geocoder, LocationUpdate, PlaceOrderRequest, RuntimeConfig, SimulationConfig,
    SimulationReport, TrackingConfig,
};
use fieldops_domain::{
    Coordinate, DomainError, FulfillmentStatus, LiveLocation, Order, OrderId, TechnicianId,
};
use fieldops_persistence::InMemoryBackend;
use fieldops_routing::{
    NominatimConfig, NominatimGeocoder, OpenRouteService, OpenRouteServiceConfig,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Field-service dispatch server with live technician tracking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(long, env = "FIELDOPS_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port to bind the server to
    #[arg(short, long, env = "FIELDOPS_PORT", default_value_t = 3000)]
    port: u16,

    /// JSON file with technicians, warehouses and stock to start with
    #[arg(long, env = "FIELDOPS_SEED")]
    seed: Option<PathBuf>,

    /// OpenRouteService base URL
    #[arg(long, env = "ORS_BASE_URL", default_value = "https://api.openrouteservice.org")]
    ors_base_url: String,

    /// OpenRouteService API key
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,

    /// OpenRouteService routing profile
    #[arg(long, env = "ORS_PROFILE", default_value = "driving-car")]
    ors_profile: String,

    /// HTTP timeout for one directions request, in seconds
    #[arg(long, env = "ORS_TIMEOUT_SECS", default_value_t = 10)]
    ors_timeout_secs: u64,

    /// Nominatim base URL
    #[arg(
        long,
        env = "NOMINATIM_BASE_URL",
        default_value = "https://nominatim.openstreetmap.org"
    )]
    nominatim_base_url: String,

    /// Countries geocoding results are restricted to
    #[arg(long, env = "NOMINATIM_COUNTRY_CODES", default_value = "md")]
    nominatim_country_codes: String,

    /// User agent sent to Nominatim; required by its usage policy
    #[arg(long, env = "NOMINATIM_USER_AGENT")]
    nominatim_user_agent: Option<String>,

    /// Delay between two simulated position updates, in milliseconds
    #[arg(long, env = "FIELDOPS_STEP_INTERVAL_MS", default_value_t = 2000)]
    step_interval_ms: u64,

    /// Interval between tracking pushes, in milliseconds
    #[arg(long, env = "FIELDOPS_PUSH_INTERVAL_MS", default_value_t = 1000)]
    push_interval_ms: u64,

    /// Distance from the job at which a technician counts as arrived, in metres
    #[arg(long, env = "FIELDOPS_ARRIVAL_THRESHOLD_M", default_value_t = 100.0)]
    arrival_threshold_m: f64,

    /// Technicians assigned when a request does not say
    #[arg(long, env = "FIELDOPS_TECHNICIAN_COUNT", default_value_t = 2)]
    technician_count: usize,

    /// Time after which a route leg counts as failed, in seconds
    #[arg(long, env = "FIELDOPS_LEG_TIMEOUT_SECS", default_value_t = 10)]
    leg_timeout_secs: u64,
}

impl Args {
    fn runtime_config(&self) -> RuntimeConfig {
        let step_interval: Duration = Duration::from_millis(self.step_interval_ms);
        RuntimeConfig {
            dispatch: DispatchConfig {
                default_technician_count: self.technician_count,
                leg_timeout: Duration::from_secs(self.leg_timeout_secs),
            },
            simulation: SimulationConfig {
                step_interval,
                stop_pause: step_interval,
                ..SimulationConfig::default()
            },
            tracking: TrackingConfig {
                push_interval: Duration::from_millis(self.push_interval_ms),
                arrival_threshold_km: self.arrival_threshold_m / 1000.0,
                ..TrackingConfig::default()
            },
        }
    }

    fn directions_config(&self) -> OpenRouteServiceConfig {
        OpenRouteServiceConfig {
            base_url: self.ors_base_url.clone(),
            api_key: self.ors_api_key.clone(),
            profile: self.ors_profile.clone(),
            timeout: Duration::from_secs(self.ors_timeout_secs),
            ..OpenRouteServiceConfig::default()
        }
    }

    fn geocoder_config(&self) -> NominatimConfig {
        let mut config: NominatimConfig = NominatimConfig {
            base_url: self.nominatim_base_url.clone(),
            country_codes: self.nominatim_country_codes.clone(),
            ..NominatimConfig::default()
        };
        if let Some(user_agent) = &self.nominatim_user_agent {
            config.user_agent.clone_from(user_agent);
        }
        config
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
}

/// Wires the in-memory stores and the external providers into a dispatcher.
fn collaborators(
    backend: &InMemoryBackend,
    directions: Arc<dyn DirectionsProvider>,
    geocoder: Arc<dyn Geocoder>,
) -> Collaborators {
    Collaborators {
        orders: backend.orders.clone(),
        users: backend.users.clone(),
        warehouses: backend.warehouses.clone(),
        stock: Arc::new(backend.stock_check()),
        directions,
        geocoder,
    }
}

/// API request for changing an order's status.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct StatusChangeRequest {
    status: FulfillmentStatus,
}

/// API response for the arrival query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalResponse {
    order_id: OrderId,
    all_arrived: bool,
}

/// API response for starting a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationStartResponse {
    order_id: OrderId,
    started: usize,
    already_running: usize,
    without_route: usize,
}

/// API response for stopping a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationStopResponse {
    order_id: OrderId,
    cancelled: usize,
}

/// API response for a reported location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationReportResponse {
    technician_id: TechnicianId,
    outcome: String,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        let status: StatusCode = match &err {
            CoreError::NotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::TechnicianNotTracked(_) => StatusCode::NOT_FOUND,
            CoreError::DomainViolation(
                DomainError::InvalidStatusTransition { .. }
                | DomainError::TerminalOrder { .. }
                | DomainError::InsufficientStock { .. },
            )
            | CoreError::InvalidState { .. }
            | CoreError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
            CoreError::DomainViolation(_) => StatusCode::BAD_REQUEST,
            CoreError::Store(store_error) => {
                error!(error = %store_error, "Store error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Handler for POST `/dispatch`.
///
/// Computes an assignment without committing anything.
async fn handle_dispatch(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<DispatchPlan>, HttpError> {
    info!(
        order_type = req.requirement.order_type.as_str(),
        lat = req.job.latitude(),
        lon = req.job.longitude(),
        "Handling dispatch request"
    );
    let plan: DispatchPlan = app_state.dispatcher.dispatch(&req).await?;
    Ok(Json(plan))
}

/// Handler for POST `/orders`.
async fn handle_place_order(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), HttpError> {
    info!(
        order_type = req.requirement.order_type.as_str(),
        "Handling place order request"
    );
    let order: Order = app_state.dispatcher.place_order(req).await?;
    info!(order_id = %order.id, "Order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// Handler for GET `/orders/{id}`.
async fn handle_get_order(
    AxumState(app_state): AxumState<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, HttpError> {
    Ok(Json(app_state.dispatcher.order(order_id).await?))
}

/// Handler for POST `/orders/{id}/status`.
async fn handle_change_status(
    AxumState(app_state): AxumState<AppState>,
    Path(order_id): Path<OrderId>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Order>, HttpError> {
    info!(%order_id, requested = req.status.as_str(), "Handling status change request");
    let order: Order = app_state
        .dispatcher
        .advance_status(order_id, req.status)
        .await?;
    Ok(Json(order))
}

/// Handler for GET `/orders/{id}/arrival`.
async fn handle_arrival(
    AxumState(app_state): AxumState<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<ArrivalResponse>, HttpError> {
    let all_arrived: bool = app_state.dispatcher.all_arrived(order_id).await?;
    Ok(Json(ArrivalResponse {
        order_id,
        all_arrived,
    }))
}

/// Handler for POST `/simulation/orders/{id}/start`.
async fn handle_start_simulation(
    AxumState(app_state): AxumState<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<SimulationStartResponse>, HttpError> {
    let report: SimulationReport = app_state.dispatcher.start_simulation(order_id).await?;
    Ok(Json(SimulationStartResponse {
        order_id,
        started: report.started,
        already_running: report.already_running,
        without_route: report.without_route,
    }))
}

/// Handler for POST `/simulation/orders/{id}/stop`.
async fn handle_stop_simulation(
    AxumState(app_state): AxumState<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<SimulationStopResponse>, HttpError> {
    let cancelled: usize = app_state.dispatcher.stop_simulation(order_id);
    if cancelled == 0 {
        return Err(HttpError::not_found(format!(
            "No simulation running for order {order_id}"
        )));
    }
    Ok(Json(SimulationStopResponse {
        order_id,
        cancelled,
    }))
}

/// Handler for PATCH `/technicians/{id}/location`.
async fn handle_report_location(
    AxumState(app_state): AxumState<AppState>,
    Path(technician_id): Path<TechnicianId>,
    Json(coordinate): Json<Coordinate>,
) -> Result<Json<LocationReportResponse>, HttpError> {
    let update: LocationUpdate = app_state
        .dispatcher
        .update_location(technician_id, coordinate)
        .await
        .inspect_err(|e| warn!(%technician_id, error = %e, "Location report rejected"))?;
    Ok(Json(LocationReportResponse {
        technician_id,
        outcome: update.as_str().to_string(),
    }))
}

/// Handler for GET `/technicians/{id}/location`.
async fn handle_get_location(
    AxumState(app_state): AxumState<AppState>,
    Path(technician_id): Path<TechnicianId>,
) -> Result<Json<LiveLocation>, HttpError> {
    app_state
        .dispatcher
        .technician_location(technician_id)
        .map(Json)
        .ok_or_else(|| {
            HttpError::not_found(format!("Technician {technician_id} has no live location"))
        })
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/dispatch", post(handle_dispatch))
        .route("/orders", post(handle_place_order))
        .route("/orders/{id}", get(handle_get_order))
        .route("/orders/{id}/status", post(handle_change_status))
        .route("/orders/{id}/arrival", get(handle_arrival))
        .route("/orders/{id}/track", get(live::track_order_handler))
        .route(
            "/simulation/orders/{id}/start",
            post(handle_start_simulation),
        )
        .route("/simulation/orders/{id}/stop", post(handle_stop_simulation))
        .route(
            "/technicians/{id}/location",
            patch(handle_report_location).get(handle_get_location),
        )
        .route("/technicians/{id}/report", get(live::technician_report_handler))
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing fieldops server");

    let backend: InMemoryBackend = seed::load_backend(args.seed.as_deref()).await?;
    let directions: Arc<OpenRouteService> =
        Arc::new(OpenRouteService::new(args.directions_config())?);
    let geocoder: Arc<NominatimGeocoder> =
        Arc::new(NominatimGeocoder::new(args.geocoder_config())?);

    let (dispatcher, events) = Dispatcher::new(
        collaborators(&backend, directions, geocoder),
        args.runtime_config(),
    );

    let shutdown: CancellationToken = CancellationToken::new();
    let event_loop: tokio::task::JoinHandle<()> = tokio::spawn({
        let dispatcher: Dispatcher = dispatcher.clone();
        let shutdown: CancellationToken = shutdown.clone();
        async move { dispatcher.run(events, shutdown).await }
    });

    let app: Router = build_router(AppState {
        dispatcher: dispatcher.clone(),
    });

    let addr: SocketAddr = SocketAddr::new(args.bind, args.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    event_loop.await?;
    dispatcher.shutdown().await;
    info!("Server stopped");

    Ok(())
}
