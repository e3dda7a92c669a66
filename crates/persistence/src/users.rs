// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::PersistenceError;
use async_trait::async_trait;
use dashmap::DashMap;
use fieldops::{StoreError, UserDirectory};
use fieldops_domain::{OrderId, Technician, TechnicianId};
use tracing::{debug, info};

/// Technician records with atomic availability changes.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    technicians: DashMap<TechnicianId, Technician>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a technician record.
    pub fn upsert(&self, technician: Technician) {
        self.technicians.insert(technician.id, technician);
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the technician does not exist.
    pub fn remove(&self, id: TechnicianId) -> Result<Technician, PersistenceError> {
        self.technicians
            .remove(&id)
            .map(|(_, technician)| technician)
            .ok_or_else(|| PersistenceError::NotFound(format!("Technician {id}")))
    }

    /// All technicians ordered by name, then id.
    #[must_use]
    pub fn list(&self) -> Vec<Technician> {
        let mut technicians: Vec<Technician> =
            self.technicians.iter().map(|e| e.value().clone()).collect();
        technicians.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        technicians
    }

    #[must_use]
    pub fn get(&self, id: TechnicianId) -> Option<Technician> {
        self.technicians.get(&id).map(|e| e.value().clone())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn technicians(&self) -> Result<Vec<Technician>, StoreError> {
        Ok(self.list())
    }

    async fn reserve(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError> {
        let mut technician = self
            .technicians
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Technician {id}")))?;

        if !technician.is_assignable() {
            debug!(technician_id = %id, %order_id, "Technician not available");
            return Ok(false);
        }
        technician.assign(order_id);
        info!(technician_id = %id, %order_id, "Technician reserved");
        Ok(true)
    }

    async fn release(&self, id: TechnicianId, order_id: OrderId) -> Result<bool, StoreError> {
        let mut technician = self
            .technicians
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Technician {id}")))?;

        if technician.current_order_id != Some(order_id) {
            return Ok(false);
        }
        technician.release();
        info!(technician_id = %id, %order_id, "Technician released");
        Ok(true)
    }
}
