// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Geographic coordinates and great-circle distance.
//!
//! All ranking (warehouses, technicians) and every arrival check go through
//! [`distance_km`], so the same Earth radius applies everywhere. The arrival
//! radius is passed in by the caller; [`ARRIVAL_THRESHOLD_KM`] is its default.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A technician within this distance of the job coordinate has arrived (100 m).
pub const ARRIVAL_THRESHOLD_KM: f64 = 0.1;

/// A validated WGS84 position.
///
/// Construction through [`Coordinate::new`] or deserialization rejects
/// out-of-range values. The `(0, 0)` point is representable but is treated
/// as "unknown" by matching logic; see [`Coordinate::is_unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = DomainError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// # Arguments
    ///
    /// * `latitude` - Degrees north, within `[-90, 90]`
    /// * `longitude` - Degrees east, within `[-180, 180]`
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCoordinate` if either value is not finite
    /// or outside its range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let valid: bool = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(DomainError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Creates a coordinate that must also be a real, known location.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCoordinate` for out-of-range values and
    /// `DomainError::UnknownLocation` for `(0, 0)`.
    pub fn known(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let coordinate: Self = Self::new(latitude, longitude)?;
        if coordinate.is_unknown() {
            return Err(DomainError::UnknownLocation);
        }
        Ok(coordinate)
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns true for the `(0, 0)` placeholder used by upstream systems
    /// when no location is recorded.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.latitude.abs() < f64::EPSILON && self.longitude.abs() < f64::EPSILON
    }

    /// Linear interpolation between two coordinates.
    ///
    /// `fraction` is clamped to `[0, 1]`; the result always lies on the
    /// segment between `self` and `other` and is therefore in range.
    #[must_use]
    pub fn lerp(&self, other: &Self, fraction: f64) -> Self {
        let t: f64 = fraction.clamp(0.0, 1.0);
        Self {
            latitude: (other.latitude - self.latitude).mul_add(t, self.latitude),
            longitude: (other.longitude - self.longitude).mul_add(t, self.longitude),
        }
    }

    /// Returns true if `self` is no further than `radius_km` from `target`.
    #[must_use]
    pub fn is_within(&self, target: &Self, radius_km: f64) -> bool {
        distance_km(self, target) <= radius_km
    }
}

/// Great-circle distance between two coordinates in kilometres (haversine).
///
/// Symmetric, zero for identical points, never fails.
#[must_use]
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1: f64 = a.latitude.to_radians();
    let lat2: f64 = b.latitude.to_radians();
    let dlat: f64 = (b.latitude - a.latitude).to_radians();
    let dlon: f64 = (b.longitude - a.longitude).to_radians();

    let h: f64 = (lat1.cos() * lat2.cos())
        .mul_add((dlon / 2.0).sin().powi(2), (dlat / 2.0).sin().powi(2));
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Rounds a distance or duration to two decimals, the precision routes are
/// reported with.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
