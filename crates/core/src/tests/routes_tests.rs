// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    FakeDirections, create_test_job, create_test_technician, create_test_warehouse,
};
use crate::{AvoidFeature, LegRequest, RouteBuilder};
use fieldops_domain::{Coordinate, Route, RoutePoint, Technician, Warehouse};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn create_builder(directions: &Arc<FakeDirections>) -> RouteBuilder {
    RouteBuilder::new(directions.clone(), Duration::from_millis(200))
}

fn stop_points(route: &Route) -> Vec<RoutePoint> {
    route
        .waypoints
        .iter()
        .filter(|p| p.is_stop_point)
        .copied()
        .collect()
}

#[tokio::test]
async fn test_one_warehouse_route_has_single_stop_at_warehouse() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let technician: Technician = create_test_technician("Ion", 47.05, 28.90);
    let warehouse: Warehouse = create_test_warehouse("Central", 47.03, 28.83);

    let routes: Vec<Route> = builder
        .build_routes(create_test_job(), &[warehouse.clone()], &[technician.clone()])
        .await;

    assert_eq!(routes.len(), 1);
    let route: &Route = &routes[0];
    let stops: Vec<RoutePoint> = stop_points(route);
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].coordinate, warehouse.coordinate);
    assert!(route.via_warehouse);
    assert_eq!(route.technician_id, technician.id);
    assert_eq!(route.waypoints.first().unwrap().coordinate, technician.home);
    assert_eq!(route.waypoints.last().unwrap().coordinate, create_test_job());
    assert_eq!(directions.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_two_warehouse_route_has_two_stops_in_order() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let technician: Technician = create_test_technician("Ion", 47.05, 28.90);
    let first: Warehouse = create_test_warehouse("Supplies", 47.03, 28.83);
    let second: Warehouse = create_test_warehouse("Equipment", 46.98, 28.80);

    let routes: Vec<Route> = builder
        .build_routes(
            create_test_job(),
            &[first.clone(), second.clone()],
            &[technician],
        )
        .await;

    let stops: Vec<RoutePoint> = stop_points(&routes[0]);
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].coordinate, first.coordinate);
    assert_eq!(stops[1].coordinate, second.coordinate);
    assert_eq!(directions.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_only_nearest_technician_detours() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let far: Technician = create_test_technician("Far", 47.20, 29.00);
    let near: Technician = create_test_technician("Near", 47.02, 28.87);
    let warehouse: Warehouse = create_test_warehouse("Central", 47.03, 28.83);

    let routes: Vec<Route> = builder
        .build_routes(create_test_job(), &[warehouse], &[far.clone(), near.clone()])
        .await;

    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].technician_id, near.id);
    assert!(routes[0].via_warehouse);
    assert_eq!(routes[1].technician_id, far.id);
    assert!(!routes[1].via_warehouse);
    assert!(stop_points(&routes[1]).is_empty());
}

#[tokio::test]
async fn test_no_warehouse_gives_direct_routes() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let technician: Technician = create_test_technician("Ion", 47.05, 28.90);

    let routes: Vec<Route> = builder
        .build_routes(create_test_job(), &[], &[technician])
        .await;

    assert_eq!(routes.len(), 1);
    assert!(!routes[0].via_warehouse);
    assert_eq!(directions.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_leg_drops_only_that_route() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let near: Technician = create_test_technician("Near", 47.02, 28.87);
    let far: Technician = create_test_technician("Far", 47.20, 29.00);
    let warehouse: Warehouse = create_test_warehouse("Central", 47.03, 28.83);
    // second leg of the nearest technician's route
    directions.fail_from(warehouse.coordinate);

    let routes: Vec<Route> = builder
        .build_routes(create_test_job(), &[warehouse], &[near, far.clone()])
        .await;

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].technician_id, far.id);
}

#[tokio::test]
async fn test_timed_out_leg_fails_the_route() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    directions.set_latency(Duration::from_millis(500));
    let builder: RouteBuilder =
        RouteBuilder::new(directions.clone(), Duration::from_millis(20));

    let routes: Vec<Route> = builder
        .build_routes(
            create_test_job(),
            &[],
            &[create_test_technician("Ion", 47.05, 28.90)],
        )
        .await;

    assert!(routes.is_empty());
}

#[tokio::test]
async fn test_every_leg_avoids_ferries_and_tollways() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);

    let _ = builder
        .build_routes(
            create_test_job(),
            &[create_test_warehouse("Central", 47.03, 28.83)],
            &[
                create_test_technician("Ion", 47.05, 28.90),
                create_test_technician("Maria", 47.10, 28.95),
            ],
        )
        .await;

    let recorded: Vec<LegRequest> = directions.recorded();
    assert_eq!(recorded.len(), 3);
    for request in recorded {
        assert!(request.avoid.contains(&AvoidFeature::Ferries));
        assert!(request.avoid.contains(&AvoidFeature::Tollways));
    }
}

#[tokio::test]
async fn test_totals_are_sum_of_legs() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);
    let technician: Technician = create_test_technician("Ion", 47.05, 28.90);
    let warehouse: Warehouse = create_test_warehouse("Central", 47.03, 28.83);
    let job: Coordinate = create_test_job();

    let route: Route = builder
        .build_route(job, &technician, &[warehouse.coordinate])
        .await
        .unwrap();

    let expected: f64 = fieldops_domain::round2(
        fieldops_domain::distance_km(&technician.home, &warehouse.coordinate)
            + fieldops_domain::distance_km(&warehouse.coordinate, &job),
    );
    assert!((route.total_distance_km - expected).abs() < 0.011);
}

#[tokio::test]
async fn test_no_technicians_builds_nothing() {
    let directions: Arc<FakeDirections> = Arc::new(FakeDirections::default());
    let builder: RouteBuilder = create_builder(&directions);

    assert!(builder.build_routes(create_test_job(), &[], &[]).await.is_empty());
    assert_eq!(directions.calls.load(Ordering::SeqCst), 0);
}
