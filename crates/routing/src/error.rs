// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use fieldops::ProviderError;
use fieldops_domain::DomainError;
use thiserror::Error;

/// Failures talking to an external routing or geocoding provider.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("HTTP transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Malformed polyline: {0}")]
    Polyline(String),

    #[error("Provider returned an invalid coordinate: {0}")]
    Coordinate(#[from] DomainError),

    #[error("Provider returned no route")]
    NoRoute,

    #[error("Provider client is shut down")]
    Closed,
}

impl From<RoutingError> for ProviderError {
    fn from(err: RoutingError) -> Self {
        Self::new(err.to_string())
    }
}
