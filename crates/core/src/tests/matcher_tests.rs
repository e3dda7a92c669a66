// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    coord, create_test_job, create_test_technician, create_test_warehouse,
};
use crate::{find_nearest_warehouse, find_technicians, nearest_technician, rank_warehouses};
use fieldops_domain::{
    Coordinate, OrderId, Technician, TechnicianId, Warehouse, WarehouseId, distance_km,
};

#[test]
fn test_nearest_warehouse_minimizes_distance() {
    let job: Coordinate = create_test_job();
    let warehouses: Vec<Warehouse> = vec![
        create_test_warehouse("Far", 47.30, 29.10),
        create_test_warehouse("Near", 47.02, 28.87),
        create_test_warehouse("Middle", 47.10, 28.95),
    ];

    let nearest: &Warehouse = find_nearest_warehouse(&job, &warehouses).unwrap();

    let best: f64 = warehouses
        .iter()
        .map(|w| distance_km(&job, &w.coordinate))
        .fold(f64::INFINITY, f64::min);
    assert_eq!(nearest.name, "Near");
    assert!((distance_km(&job, &nearest.coordinate) - best).abs() < f64::EPSILON);
}

#[test]
fn test_nearest_warehouse_none_for_empty_set() {
    assert!(find_nearest_warehouse(&create_test_job(), &[]).is_none());
}

#[test]
fn test_rank_warehouses_skips_unknown_location() {
    let unknown: Warehouse = Warehouse::new(
        WarehouseId::new(),
        String::from("Placeholder"),
        coord(0.0, 0.0),
    );
    let real: Warehouse = create_test_warehouse("Real", 47.5, 29.5);

    let warehouses: Vec<Warehouse> = vec![unknown, real];

    let ranked: Vec<&Warehouse> = rank_warehouses(&create_test_job(), &warehouses);

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].name, "Real");
}

#[test]
fn test_rank_warehouses_keeps_input_order_on_ties() {
    let a: Warehouse = create_test_warehouse("A", 47.02, 28.87);
    let b: Warehouse = Warehouse::new(WarehouseId::new(), String::from("B"), a.coordinate);

    let warehouses: Vec<Warehouse> = vec![a, b];

    let ranked: Vec<&Warehouse> = rank_warehouses(&create_test_job(), &warehouses);

    assert_eq!(ranked[0].name, "A");
    assert_eq!(ranked[1].name, "B");
}

#[test]
fn test_automatic_selection_is_sorted_and_bounded() {
    let job: Coordinate = create_test_job();
    let technicians: Vec<Technician> = vec![
        create_test_technician("Far", 47.40, 29.20),
        create_test_technician("Near", 47.011, 28.865),
        create_test_technician("Middle", 47.10, 28.95),
        create_test_technician("Close", 47.03, 28.88),
    ];

    let picked: Vec<Technician> = find_technicians(&job, &technicians, &[], 3);

    assert_eq!(picked.len(), 3);
    let names: Vec<&str> = picked.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Near", "Close", "Middle"]);
    assert!(
        picked
            .windows(2)
            .all(|pair| distance_km(&job, &pair[0].home) <= distance_km(&job, &pair[1].home))
    );
}

#[test]
fn test_automatic_selection_length_is_min_of_count_and_available() {
    let job: Coordinate = create_test_job();
    let mut busy: Technician = create_test_technician("Busy", 47.01, 28.86);
    busy.assign(OrderId::new());
    let technicians: Vec<Technician> = vec![
        busy,
        create_test_technician("Free", 47.05, 28.90),
    ];

    let picked: Vec<Technician> = find_technicians(&job, &technicians, &[], 5);

    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].name, "Free");
}

#[test]
fn test_equal_distance_breaks_tie_by_id() {
    let job: Coordinate = create_test_job();
    let home: Coordinate = coord(47.02, 28.87);
    let first: Technician = create_test_technician("First", 47.02, 28.87);
    let second: Technician = Technician::new(
        TechnicianId::new(),
        String::from("Second"),
        String::from("1"),
        home,
    );
    let expected_first: TechnicianId = first.id.min(second.id);

    let forward: Vec<Technician> =
        find_technicians(&job, &[first.clone(), second.clone()], &[], 1);
    let backward: Vec<Technician> = find_technicians(&job, &[second, first], &[], 1);

    assert_eq!(forward[0].id, expected_first);
    assert_eq!(backward[0].id, expected_first);
}

#[test]
fn test_explicit_selection_is_intersection_with_available() {
    let job: Coordinate = create_test_job();
    let far: Technician = create_test_technician("Far", 47.40, 29.20);
    let near: Technician = create_test_technician("Near", 47.011, 28.865);
    let mut busy: Technician = create_test_technician("Busy", 47.02, 28.87);
    busy.assign(OrderId::new());
    let ignored: Technician = create_test_technician("Ignored", 47.012, 28.866);
    let technicians: Vec<Technician> = vec![far.clone(), near.clone(), busy.clone(), ignored];

    let picked: Vec<Technician> =
        find_technicians(&job, &technicians, &[near.id, busy.id, far.id], 1);

    // not ranked by distance and not truncated to `count`
    let ids: Vec<TechnicianId> = picked.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![far.id, near.id]);
}

#[test]
fn test_unknown_job_matches_nobody() {
    let technicians: Vec<Technician> = vec![create_test_technician("Ion", 47.0, 28.8)];

    assert!(find_technicians(&coord(0.0, 0.0), &technicians, &[], 2).is_empty());
}

#[test]
fn test_technician_with_unknown_home_is_skipped() {
    let homeless: Technician = create_test_technician("Homeless", 0.0, 0.0);

    assert!(find_technicians(&create_test_job(), &[homeless], &[], 2).is_empty());
}

#[test]
fn test_nearest_technician_first_wins_ties() {
    let a: Technician = create_test_technician("A", 47.02, 28.87);
    let b: Technician = create_test_technician("B", 47.02, 28.87);
    let c: Technician = create_test_technician("C", 47.50, 29.50);

    assert_eq!(nearest_technician(&create_test_job(), &[c, a, b]), Some(1));
    assert_eq!(nearest_technician(&create_test_job(), &[]), None);
}
