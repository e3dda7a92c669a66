// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Start-up seed data.

use fieldops_persistence::{InMemoryBackend, PersistenceError, SeedData};
use std::path::{Path, PathBuf};
use tracing::info;

/// Why the seed file could not be loaded.
#[derive(Debug)]
pub enum SeedError {
    /// The file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file was read but its contents are unusable.
    Invalid {
        path: PathBuf,
        source: PersistenceError,
    },
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read seed file {}: {source}", path.display())
            }
            Self::Invalid { path, source } => {
                write!(f, "Invalid seed file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Invalid { source, .. } => Some(source),
        }
    }
}

/// Builds the backend, from `path` when one is given and empty otherwise.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or does not describe a
/// consistent fleet.
pub async fn load_backend(path: Option<&Path>) -> Result<InMemoryBackend, SeedError> {
    let Some(path) = path else {
        info!("No seed file given; starting with empty stores");
        return Ok(InMemoryBackend::new());
    };

    info!(path = %path.display(), "Loading seed data");
    let json: String = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    SeedData::from_json(&json)
        .and_then(InMemoryBackend::from_seed)
        .map_err(|source| SeedError::Invalid {
            path: path.to_path_buf(),
            source,
        })
}
