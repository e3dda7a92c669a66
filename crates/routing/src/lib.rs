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
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

//! HTTP adapters for the external providers dispatch depends on.
//!
//! - [`OpenRouteService`] implements [`fieldops::DirectionsProvider`] against
//!   the OpenRouteService directions API.
//! - [`NominatimGeocoder`] implements [`fieldops::Geocoder`] against a
//!   Nominatim search endpoint.
//!
//! Both take a plain config struct whose `Default` points at the public
//! service.

mod error;
mod nominatim;
mod openrouteservice;
pub mod polyline;

#[cfg(test)]
mod tests;

pub use error::RoutingError;
pub use nominatim::{NominatimConfig, NominatimGeocoder};
pub use openrouteservice::{OpenRouteService, OpenRouteServiceConfig};
