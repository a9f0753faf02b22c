//! Performed medical-care acts
//!
//! A [`ConsultationCare`] records that a care act from the catalog was
//! performed during a consultation. The unit price is copied from the catalog
//! when the record is created. Records are never edited in place: a
//! correction is a removal followed by a new record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use core_kernel::{CareId, ConsultationCareId, ConsultationId, Money, StaffId};

use crate::error::ClinicalError;
use crate::ports::CatalogPort;

/// A care act performed during a consultation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationCare {
    pub id: ConsultationCareId,
    pub consultation_id: ConsultationId,
    pub care_id: CareId,
    pub quantity: u32,
    /// Catalog price at the time the care was recorded
    pub unit_price: Money,
    pub total_price: Money,
    pub performed_at: DateTime<Utc>,
    pub performed_by: Option<StaffId>,
    pub notes: Option<String>,
}

/// Request to record a care act
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConsultationCare {
    pub care_id: CareId,
    pub quantity: u32,
    #[serde(default)]
    pub performed_by: Option<StaffId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewConsultationCare {
    pub fn new(care_id: CareId, quantity: u32) -> Self {
        Self {
            care_id,
            quantity,
            performed_by: None,
            notes: None,
        }
    }

    pub fn performed_by(mut self, staff_id: StaffId) -> Self {
        self.performed_by = Some(staff_id);
        self
    }
}

/// Register of care acts performed per consultation
pub struct CareRegister {
    catalog: Arc<dyn CatalogPort>,
    records: RwLock<HashMap<ConsultationCareId, ConsultationCare>>,
}

impl CareRegister {
    pub fn new(catalog: Arc<dyn CatalogPort>) -> Self {
        Self {
            catalog,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Records a care act, snapshotting the current catalog price
    #[instrument(skip(self, request), fields(consultation_id = %consultation_id, care_id = %request.care_id))]
    pub async fn add_care(
        &self,
        consultation_id: ConsultationId,
        request: NewConsultationCare,
    ) -> Result<ConsultationCare, ClinicalError> {
        if request.quantity == 0 {
            return Err(ClinicalError::InvalidQuantity(
                "care quantity must be greater than zero".to_string(),
            ));
        }

        let care = self.catalog.get_medical_care(request.care_id).await?;
        let record = ConsultationCare {
            id: ConsultationCareId::new_v7(),
            consultation_id,
            care_id: care.id,
            quantity: request.quantity,
            unit_price: care.unit_price,
            total_price: care.unit_price.times(request.quantity)?,
            performed_at: Utc::now(),
            performed_by: request.performed_by,
            notes: request.notes,
        };

        self.records.write().await.insert(record.id, record.clone());
        info!(record_id = %record.id, total = %record.total_price, "Care recorded");
        Ok(record)
    }

    /// Deletes a care record
    #[instrument(skip(self))]
    pub async fn remove_care(&self, id: ConsultationCareId) -> Result<ConsultationCare, ClinicalError> {
        let removed = self
            .records
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| ClinicalError::CareRecordNotFound(id.to_string()))?;
        info!(consultation_id = %removed.consultation_id, "Care removed");
        Ok(removed)
    }

    pub async fn get(&self, id: ConsultationCareId) -> Result<ConsultationCare, ClinicalError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ClinicalError::CareRecordNotFound(id.to_string()))
    }

    /// Care records of a consultation, in the order they were performed
    pub async fn list_for_consultation(&self, consultation_id: ConsultationId) -> Vec<ConsultationCare> {
        let mut cares: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|c| c.consultation_id == consultation_id)
            .cloned()
            .collect();
        cares.sort_by_key(|c| (c.performed_at, c.id));
        cares
    }
}
