// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Multi-leg route assembly on top of a directions provider.
//!
//! Only the technician nearest to the job detours through the warehouse
//! stops; everyone else drives straight to the job. All routes are requested
//! concurrently, and so are the legs within a route. A route with any failed
//! or timed-out leg is left out entirely.

use crate::matcher::nearest_technician;
use crate::ports::{DirectionsProvider, LegRequest};
use fieldops_domain::{Coordinate, Leg, Route, Technician, Warehouse};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Builds technician routes for a job.
#[derive(Clone)]
pub struct RouteBuilder {
    provider: Arc<dyn DirectionsProvider>,
    leg_timeout: Duration,
}

impl std::fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("leg_timeout", &self.leg_timeout)
            .finish_non_exhaustive()
    }
}

impl RouteBuilder {
    #[must_use]
    pub fn new(provider: Arc<dyn DirectionsProvider>, leg_timeout: Duration) -> Self {
        Self {
            provider,
            leg_timeout,
        }
    }

    /// Builds one route per technician.
    ///
    /// The nearest technician's route passes through `warehouses` in order
    /// (each marked as a stop point); all others are direct. The nearest
    /// technician's route, if built, comes first; the rest follow in input
    /// order. Technicians whose route could not be completed are omitted.
    ///
    /// # Arguments
    ///
    /// * `job` - Where every route ends
    /// * `warehouses` - Pickup stops for the nearest technician, usually zero to two
    /// * `technicians` - Candidates, each starting from their home coordinate
    pub async fn build_routes(
        &self,
        job: Coordinate,
        warehouses: &[Warehouse],
        technicians: &[Technician],
    ) -> Vec<Route> {
        let Some(nearest) = nearest_technician(&job, technicians) else {
            return Vec::new();
        };

        let stops: Vec<Coordinate> = warehouses.iter().map(|w| w.coordinate).collect();
        let mut ordered: Vec<(&Technician, &[Coordinate])> = Vec::with_capacity(technicians.len());
        ordered.push((&technicians[nearest], stops.as_slice()));
        ordered.extend(
            technicians
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != nearest)
                .map(|(_, technician)| (technician, &[] as &[Coordinate])),
        );

        let built: Vec<Option<Route>> = join_all(
            ordered
                .into_iter()
                .map(|(technician, stops)| self.build_route(job, technician, stops)),
        )
        .await;

        let routes: Vec<Route> = built.into_iter().flatten().collect();
        debug!(
            requested = technicians.len(),
            built = routes.len(),
            "Routes built"
        );
        routes
    }

    /// Builds a single route from the technician's home through `stops` to `job`.
    ///
    /// Returns `None` if any leg fails.
    pub async fn build_route(
        &self,
        job: Coordinate,
        technician: &Technician,
        stops: &[Coordinate],
    ) -> Option<Route> {
        let mut points: Vec<Coordinate> = Vec::with_capacity(stops.len() + 2);
        points.push(technician.home);
        points.extend_from_slice(stops);
        points.push(job);

        let legs: Vec<Option<Leg>> =
            join_all(points.windows(2).map(|pair| self.leg(pair[0], pair[1]))).await;

        let Some(legs) = legs.into_iter().collect::<Option<Vec<Leg>>>() else {
            warn!(technician_id = %technician.id, "Route dropped; a leg failed");
            return None;
        };
        Route::stitch(technician, legs, stops)
    }

    async fn leg(&self, origin: Coordinate, destination: Coordinate) -> Option<Leg> {
        let request: LegRequest = LegRequest::driving(origin, destination);
        match tokio::time::timeout(self.leg_timeout, self.provider.directions(&request)).await {
            Ok(Ok(mut leg)) => {
                if leg.waypoints.is_empty() {
                    leg.waypoints = vec![origin, destination];
                }
                Some(leg)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Directions request failed");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.leg_timeout, "Directions request timed out");
                None
            }
        }
    }
}
