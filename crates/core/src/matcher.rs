// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Distance-based matching of warehouses and technicians to a job.
//!
//! These functions only rank and filter what they are given. Stock checks are
//! layered on top by the dispatcher.

use fieldops_domain::{Coordinate, Technician, TechnicianId, Warehouse, distance_km};

/// Warehouses with a known location, nearest first.
///
/// Equal distances keep their input order.
#[must_use]
pub fn rank_warehouses<'a>(job: &Coordinate, warehouses: &'a [Warehouse]) -> Vec<&'a Warehouse> {
    let mut ranked: Vec<(f64, &Warehouse)> = warehouses
        .iter()
        .filter(|w| !w.coordinate.is_unknown())
        .map(|w| (distance_km(job, &w.coordinate), w))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.into_iter().map(|(_, w)| w).collect()
}

/// The warehouse nearest to `job`, or `None` if there are none.
#[must_use]
pub fn find_nearest_warehouse<'a>(
    job: &Coordinate,
    warehouses: &'a [Warehouse],
) -> Option<&'a Warehouse> {
    rank_warehouses(job, warehouses).into_iter().next()
}

/// Selects technicians for a job.
///
/// With `explicit_ids`, returns the available technicians among them in
/// input order; the selection is an override, not a ranking hint. Otherwise
/// returns up to `count` available technicians nearest first, ties broken by
/// id so the result does not depend on directory order.
///
/// # Arguments
///
/// * `job` - The job location
/// * `technicians` - Every known technician
/// * `explicit_ids` - Technicians requested by name; empty for automatic selection
/// * `count` - How many to pick when selecting automatically
#[must_use]
pub fn find_technicians(
    job: &Coordinate,
    technicians: &[Technician],
    explicit_ids: &[TechnicianId],
    count: usize,
) -> Vec<Technician> {
    if job.is_unknown() {
        return Vec::new();
    }

    let available = technicians.iter().filter(|t| t.is_assignable());

    if !explicit_ids.is_empty() {
        return available
            .filter(|t| explicit_ids.contains(&t.id))
            .cloned()
            .collect();
    }

    let mut ranked: Vec<(f64, &Technician)> = available
        .map(|t| (distance_km(job, &t.home), t))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
    ranked
        .into_iter()
        .take(count)
        .map(|(_, t)| t.clone())
        .collect()
}

/// Index of the technician whose home is nearest to `job`.
///
/// The first one wins on a tie.
#[must_use]
pub fn nearest_technician(job: &Coordinate, technicians: &[Technician]) -> Option<usize> {
    technicians
        .iter()
        .enumerate()
        .min_by(|a, b| distance_km(job, &a.1.home).total_cmp(&distance_km(job, &b.1.home)))
        .map(|(index, _)| index)
}
