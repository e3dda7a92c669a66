// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! OpenRouteService directions client.

use crate::error::RoutingError;
use crate::polyline;
use async_trait::async_trait;
use fieldops::{AvoidFeature, DirectionsProvider, LegRequest, ProviderError};
use fieldops_domain::{Coordinate, Leg, round2};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings for [`OpenRouteService`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRouteServiceConfig {
    pub base_url: String,
    /// Sent verbatim in the `Authorization` header when set.
    pub api_key: Option<String>,
    pub profile: String,
    /// Applies to the whole request, connect included.
    pub timeout: Duration,
    /// Multiplier applied to the provider's duration to account for traffic.
    pub traffic_factor: f64,
}

impl Default for OpenRouteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.openrouteservice.org"),
            api_key: None,
            profile: String::from("driving-car"),
            timeout: Duration::from_secs(10),
            traffic_factor: 1.2,
        }
    }
}

#[derive(Debug, Serialize)]
struct DirectionsBody<'a> {
    coordinates: [[f64; 2]; 2],
    geometry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<DirectionsOptions<'a>>,
}

#[derive(Debug, Serialize)]
struct DirectionsOptions<'a> {
    avoid_features: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    summary: Summary,
    geometry: String,
}

// A zero-length route comes back with an empty summary.
#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

const fn lon_lat(coordinate: &Coordinate) -> [f64; 2] {
    [coordinate.longitude(), coordinate.latitude()]
}

/// Driving directions from OpenRouteService.
#[derive(Debug, Clone)]
pub struct OpenRouteService {
    config: OpenRouteServiceConfig,
    client: reqwest::Client,
}

impl OpenRouteService {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Transport` if the HTTP client cannot be built.
    pub fn new(config: OpenRouteServiceConfig) -> Result<Self, RoutingError> {
        let client: reqwest::Client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &OpenRouteServiceConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/v2/directions/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        )
    }

    /// Requests one leg and converts it to kilometres and minutes.
    ///
    /// # Errors
    ///
    /// Returns a `RoutingError` if the request fails, the provider answers
    /// with a non-success status, or the body cannot be decoded.
    pub async fn leg(&self, request: &LegRequest) -> Result<Leg, RoutingError> {
        let options: Option<DirectionsOptions<'_>> = if request.avoid.is_empty() {
            None
        } else {
            Some(DirectionsOptions {
                avoid_features: request.avoid.iter().map(AvoidFeature::as_str).collect(),
            })
        };
        let body: DirectionsBody<'_> = DirectionsBody {
            coordinates: [lon_lat(&request.origin), lon_lat(&request.destination)],
            geometry: true,
            options,
        };

        let mut builder: reqwest::RequestBuilder = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.header(AUTHORIZATION, key);
        }

        let response: reqwest::Response = builder.send().await?;
        let status: reqwest::StatusCode = response.status();
        let text: String = response.text().await?;
        if !status.is_success() {
            return Err(RoutingError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: DirectionsResponse = serde_json::from_str(&text)?;
        let route: DirectionsRoute = parsed
            .routes
            .into_iter()
            .next()
            .ok_or(RoutingError::NoRoute)?;
        let waypoints: Vec<Coordinate> = polyline::decode(&route.geometry)?;

        let leg: Leg = Leg {
            distance_km: round2(route.summary.distance / 1000.0),
            duration_min: round2(route.summary.duration * self.config.traffic_factor / 60.0),
            waypoints,
        };
        debug!(
            distance_km = leg.distance_km,
            duration_min = leg.duration_min,
            points = leg.waypoints.len(),
            "Directions received"
        );
        Ok(leg)
    }
}

#[async_trait]
impl DirectionsProvider for OpenRouteService {
    async fn directions(&self, request: &LegRequest) -> Result<Leg, ProviderError> {
        self.leg(request).await.map_err(|e| {
            warn!(
                origin = ?request.origin,
                destination = ?request.destination,
                error = %e,
                "Directions request failed"
            );
            ProviderError::from(e)
        })
    }
}
