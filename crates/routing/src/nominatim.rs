// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Nominatim address search.
//!
//! The public Nominatim instance allows one request per second per client,
//! so searches are serialized through a semaphore and each language after
//! the first waits `retry_delay` before it is tried.

use crate::error::RoutingError;
use async_trait::async_trait;
use fieldops::Geocoder;
use fieldops_domain::Coordinate;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Connection settings for [`NominatimGeocoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Comma-separated ISO 3166-1 codes results are restricted to.
    pub country_codes: String,
    /// `accept-language` values, tried in order until one yields a result.
    pub languages: Vec<String>,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry_delay: Duration,
    /// Searches allowed in flight at once.
    pub max_concurrent: usize,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://nominatim.openstreetmap.org"),
            country_codes: String::from("md"),
            languages: vec![String::from("ro"), String::from("ru"), String::from("en")],
            user_agent: format!("fieldops/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(500),
            max_concurrent: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    importance: f64,
    #[serde(default)]
    display_name: String,
}

impl Place {
    fn coordinate(&self) -> Option<Coordinate> {
        let latitude: f64 = self.lat.trim().parse().ok()?;
        let longitude: f64 = self.lon.trim().parse().ok()?;
        Coordinate::known(latitude, longitude).ok()
    }
}

/// The most important candidate with a usable coordinate.
fn best_match(places: &[Place]) -> Option<(&Place, Coordinate)> {
    places
        .iter()
        .filter_map(|place| place.coordinate().map(|c| (place, c)))
        .max_by(|a, b| a.0.importance.total_cmp(&b.0.importance))
}

/// [`Geocoder`] backed by a Nominatim search endpoint.
#[derive(Debug)]
pub struct NominatimGeocoder {
    config: NominatimConfig,
    client: reqwest::Client,
    permits: Semaphore,
}

impl NominatimGeocoder {
    /// Builds a geocoder that identifies itself with the configured user agent.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::Transport` if the HTTP client cannot be built.
    pub fn new(config: NominatimConfig) -> Result<Self, RoutingError> {
        let client: reqwest::Client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        let permits: Semaphore = Semaphore::new(config.max_concurrent.max(1));
        Ok(Self {
            config,
            client,
            permits,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &NominatimConfig {
        &self.config
    }

    async fn search(&self, address: &str, language: &str) -> Result<Vec<Place>, RoutingError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RoutingError::Closed)?;

        let url: String = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let response: reqwest::Response = self
            .client
            .get(url)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("accept-language", language),
                ("countrycodes", self.config.country_codes.as_str()),
            ])
            .send()
            .await?;
        let status: reqwest::StatusCode = response.status();
        let text: String = response.text().await?;
        if !status.is_success() {
            return Err(RoutingError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinate> {
        for (attempt, language) in self.config.languages.iter().enumerate() {
            if attempt > 0 && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }

            match self.search(address, language).await {
                Ok(places) => {
                    if let Some((place, coordinate)) = best_match(&places) {
                        info!(
                            address,
                            language = language.as_str(),
                            display_name = place.display_name.as_str(),
                            importance = place.importance,
                            "Address geocoded"
                        );
                        return Some(coordinate);
                    }
                    debug!(address, language = language.as_str(), "No geocoding result");
                }
                Err(e) => {
                    warn!(
                        address,
                        language = language.as_str(),
                        error = %e,
                        "Geocoding request failed"
                    );
                }
            }
        }
        warn!(address, "Address could not be geocoded");
        None
    }
}
