// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use fieldops::StoreError;
use fieldops_domain::DomainError;

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// The requested record was not found.
    NotFound(String),
    /// A record with the same id already exists.
    Duplicate(String),
    /// The stored version moved on since the record was read.
    VersionConflict { expected: u64, found: u64 },
    /// A stock item could not cover the requested amount.
    InsufficientStock(DomainError),
    /// Seed data could not be parsed or is inconsistent.
    InvalidSeed(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::Duplicate(what) => write!(f, "Already exists: {what}"),
            Self::VersionConflict { expected, found } => {
                write!(f, "Version conflict: expected {expected}, found {found}")
            }
            Self::InsufficientStock(err) => write!(f, "{err}"),
            Self::InvalidSeed(msg) => write!(f, "Invalid seed data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSeed(err.to_string())
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => Self::NotFound(what),
            PersistenceError::Duplicate(what) => Self::Duplicate(what),
            PersistenceError::VersionConflict { expected, found } => {
                Self::VersionConflict { expected, found }
            }
            PersistenceError::InsufficientStock(err) => Self::NotFound(err.to_string()),
            PersistenceError::InvalidSeed(msg) => Self::Unavailable(msg),
        }
    }
}
