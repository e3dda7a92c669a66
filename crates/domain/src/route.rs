// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Routes and their stitching from provider legs.

use crate::geo::{Coordinate, round2};
use crate::types::{Technician, TechnicianId};
use serde::{Deserialize, Serialize};

/// One waypoint of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub coordinate: Coordinate,
    /// True for a physical stop (warehouse pickup), false for pass-through geometry.
    pub is_stop_point: bool,
}

impl RoutePoint {
    #[must_use]
    pub const fn pass_through(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            is_stop_point: false,
        }
    }

    #[must_use]
    pub const fn stop(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            is_stop_point: true,
        }
    }
}

/// A single point-to-point segment as returned by the directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub distance_km: f64,
    pub duration_min: f64,
    pub waypoints: Vec<Coordinate>,
}

/// A technician's full path to the job.
///
/// Immutable once stored on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub technician_id: TechnicianId,
    pub technician_name: String,
    pub phone: String,
    pub waypoints: Vec<RoutePoint>,
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    pub via_warehouse: bool,
}

impl Route {
    /// Concatenates legs into one route.
    ///
    /// After every leg except the last, a stop point is inserted at the
    /// matching entry of `stops`; `stops` holds the intermediate destinations
    /// in travel order, so `legs.len()` must be `stops.len() + 1`. Totals are
    /// summed and rounded to two decimals.
    ///
    /// # Arguments
    ///
    /// * `technician` - Whose route this is
    /// * `legs` - Legs in travel order
    /// * `stops` - Warehouse coordinates between consecutive legs
    ///
    /// # Returns
    ///
    /// `None` if there are no legs or the leg and stop counts disagree.
    #[must_use]
    pub fn stitch(technician: &Technician, legs: Vec<Leg>, stops: &[Coordinate]) -> Option<Self> {
        if legs.is_empty() || legs.len() != stops.len() + 1 {
            return None;
        }

        let mut waypoints: Vec<RoutePoint> = Vec::new();
        let mut total_distance_km: f64 = 0.0;
        let mut total_duration_min: f64 = 0.0;

        for (index, leg) in legs.into_iter().enumerate() {
            total_distance_km += leg.distance_km;
            total_duration_min += leg.duration_min;
            waypoints.extend(leg.waypoints.into_iter().map(RoutePoint::pass_through));
            if let Some(stop) = stops.get(index) {
                waypoints.push(RoutePoint::stop(*stop));
            }
        }

        Some(Self {
            technician_id: technician.id,
            technician_name: technician.name.clone(),
            phone: technician.phone.clone(),
            waypoints,
            total_distance_km: round2(total_distance_km),
            total_duration_min: round2(total_duration_min),
            via_warehouse: !stops.is_empty(),
        })
    }

    /// Number of waypoints flagged as stops.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.waypoints.iter().filter(|p| p.is_stop_point).count()
    }

    /// The final waypoint, if any.
    #[must_use]
    pub fn destination(&self) -> Option<Coordinate> {
        self.waypoints.last().map(|p| p.coordinate)
    }
}
