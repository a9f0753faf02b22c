//! Command replay
//!
//! Runs a scripted sequence of operations against a freshly seeded service
//! and reports one outcome per step. Used to reproduce front-desk sessions
//! and to exercise the core without a transport layer.
//!
//! A seed describes the catalog:
//!
//! ```json
//! {
//!   "patients": [{"id": "...", "first_name": "Ana", "last_name": "Lima", "allergies": "penicillin"}],
//!   "cares": [{"id": "...", "name": "Dressing", "unit_price": {"amount": "25", "currency": "USD"}}],
//!   "supplies": [{"id": "...", "name": "Gauze", "unit_price": {"amount": "5", "currency": "USD"}, "stock_quantity": 10}],
//!   "consultations": [{"id": "...", "patient_id": "...", "doctor_id": "..."}]
//! }
//! ```
//!
//! A script is a JSON array of steps. Each step names its operation in `op`
//! and may carry a `label`; later steps refer to the id produced by a
//! labelled step as `"@label"`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use core_kernel::{
    CareId, ConsultationCareId, ConsultationId, ConsultationSupplyId, InvoiceId, Money, PatientId,
    PrescriptionId, StaffId, SupplyId, UserRole,
};
use domain_billing::{InvoiceLine, InvoiceStatus, PaymentMethod};
use domain_clinical::{
    Consultation, ConsultationStatus, InMemoryClinicDirectory, MedicalCare, MedicalExam, Medication,
    NewConsultationCare, NewPrescription, Patient,
};
use domain_inventory::MedicalSupply;

use crate::config::ServiceConfig;
use crate::error::{ErrorBody, ServiceError};
use crate::service::{Actor, ClinicService};

/// Catalog contents loaded before a replay
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub patients: Vec<Patient>,
    pub cares: Vec<MedicalCare>,
    pub medications: Vec<Medication>,
    pub exams: Vec<MedicalExam>,
    pub supplies: Vec<SupplySeed>,
    pub consultations: Vec<ConsultationSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplySeed {
    pub id: SupplyId,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_price: Money,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub min_stock_level: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_unit() -> String {
    "piece".to_string()
}

fn default_active() -> bool {
    true
}

impl From<SupplySeed> for MedicalSupply {
    fn from(seed: SupplySeed) -> Self {
        let supply = MedicalSupply::new(seed.id, seed.name, seed.unit_price)
            .with_unit(seed.unit)
            .with_stock(seed.stock_quantity)
            .with_min_stock_level(seed.min_stock_level);
        if seed.is_active {
            supply
        } else {
            supply.deactivated()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationSeed {
    pub id: ConsultationId,
    pub patient_id: PatientId,
    pub doctor_id: StaffId,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default = "default_consultation_status")]
    pub status: ConsultationStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_consultation_status() -> ConsultationStatus {
    ConsultationStatus::InProgress
}

impl From<ConsultationSeed> for Consultation {
    fn from(seed: ConsultationSeed) -> Self {
        Consultation {
            id: seed.id,
            patient_id: seed.patient_id,
            doctor_id: seed.doctor_id,
            scheduled_at: seed.scheduled_at.unwrap_or_else(Utc::now),
            status: seed.status,
            reason: seed.reason,
        }
    }
}

/// One scripted operation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    RegisterSupply {
        actor: Actor,
        supply: SupplySeed,
    },
    RestockSupply {
        actor: Actor,
        supply_id: SupplyId,
        quantity: u32,
    },
    ConsumeSupply {
        actor: Actor,
        consultation_id: ConsultationId,
        supply_id: SupplyId,
        quantity: u32,
    },
    ReverseSupply {
        actor: Actor,
        consumption_id: ConsultationSupplyId,
    },
    AddCare {
        actor: Actor,
        consultation_id: ConsultationId,
        care_id: CareId,
        quantity: u32,
        #[serde(default)]
        notes: Option<String>,
    },
    RemoveCare {
        actor: Actor,
        care_record_id: ConsultationCareId,
    },
    RegisterPrescription {
        actor: Actor,
        prescription: NewPrescription,
        #[serde(default)]
        acknowledged: bool,
    },
    CompletePrescription {
        actor: Actor,
        prescription_id: PrescriptionId,
        #[serde(default)]
        as_of: Option<NaiveDate>,
    },
    CancelPrescription {
        actor: Actor,
        prescription_id: PrescriptionId,
    },
    SetConsultationStatus {
        consultation_id: ConsultationId,
        status: ConsultationStatus,
    },
    CreateInvoice {
        actor: Actor,
        consultation_id: ConsultationId,
        #[serde(default)]
        custom_items: Vec<InvoiceLine>,
    },
    UpdateInvoice {
        actor: Actor,
        invoice_id: InvoiceId,
        items: Vec<InvoiceLine>,
    },
    SetInvoiceStatus {
        actor: Actor,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    },
    RecordPayment {
        actor: Actor,
        invoice_id: InvoiceId,
        amount: Money,
        method: PaymentMethod,
        #[serde(default)]
        reference: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    MarkOverdue {
        actor: Actor,
        as_of: NaiveDate,
    },
    GetInvoice {
        invoice_id: InvoiceId,
    },
    LowStockReport,
}

/// Result of one step, written as a JSON line
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl StepOutcome {
    fn failed(step: usize, op: String, error: ErrorBody) -> Self {
        Self {
            step,
            op,
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

/// A seeded service plus the labels recorded so far
pub struct Replay {
    directory: Arc<InMemoryClinicDirectory>,
    service: ClinicService,
    labels: HashMap<String, String>,
}

impl Replay {
    /// Builds a service over the seeded catalog and puts the seeded supplies
    /// under stock control
    pub async fn new(seed: Seed, config: &ServiceConfig) -> Result<Self, ServiceError> {
        let directory = Arc::new(InMemoryClinicDirectory::new());
        for patient in seed.patients {
            directory.upsert_patient(patient).await;
        }
        for care in seed.cares {
            directory.upsert_care(care).await;
        }
        for medication in seed.medications {
            directory.upsert_medication(medication).await;
        }
        for exam in seed.exams {
            directory.upsert_exam(exam).await;
        }
        for consultation in seed.consultations {
            directory.upsert_consultation(consultation.into()).await;
        }

        let service = ClinicService::with_directory(directory.clone(), config)?;
        let seeder = Actor::new(StaffId::new_v7(), UserRole::Admin);
        for supply in seed.supplies {
            let supply = MedicalSupply::from(supply);
            directory.upsert_supply(supply.clone()).await;
            service.register_supply(&seeder, supply).await?;
        }

        info!("Replay seeded");
        Ok(Self {
            directory,
            service,
            labels: HashMap::new(),
        })
    }

    pub fn service(&self) -> &ClinicService {
        &self.service
    }

    /// The id recorded under a label
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Runs every step in order; a failed step does not stop the script
    pub async fn run(&mut self, steps: Vec<Value>) -> Vec<StepOutcome> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            outcomes.push(self.run_step(index + 1, step).await);
        }
        outcomes
    }

    pub async fn run_step(&mut self, step: usize, raw: Value) -> StepOutcome {
        let Value::Object(mut fields) = raw else {
            return StepOutcome::failed(step, String::new(), invalid_command("a step must be a JSON object"));
        };
        let op = fields
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let label = match fields.remove("label") {
            Some(Value::String(label)) => Some(label),
            Some(_) => return StepOutcome::failed(step, op, invalid_command("label must be a string")),
            None => None,
        };

        let mut body = Value::Object(fields);
        if let Err(missing) = self.substitute(&mut body) {
            return StepOutcome::failed(step, op, invalid_command(&format!("unknown label @{missing}")));
        }
        let command = match serde_json::from_value::<Command>(body) {
            Ok(command) => command,
            Err(e) => return StepOutcome::failed(step, op, invalid_command(&e.to_string())),
        };

        debug!(step, %op, "Running step");
        match self.execute(command).await {
            Ok(result) => {
                if let Some(label) = label {
                    if let Some(id) = primary_id(&result) {
                        self.labels.insert(label, id);
                    }
                }
                StepOutcome {
                    step,
                    op,
                    ok: true,
                    result: Some(result),
                    error: None,
                }
            }
            Err(e) => StepOutcome::failed(step, op, e.body()),
        }
    }

    async fn execute(&self, command: Command) -> Result<Value, ServiceError> {
        let service = &self.service;
        let value = match command {
            Command::RegisterSupply { actor, supply } => {
                let supply = MedicalSupply::from(supply);
                self.directory.upsert_supply(supply.clone()).await;
                serde_json::to_value(service.register_supply(&actor, supply).await?)?
            }
            Command::RestockSupply { actor, supply_id, quantity } => {
                serde_json::to_value(service.restock_supply(&actor, supply_id, quantity).await?)?
            }
            Command::ConsumeSupply {
                actor,
                consultation_id,
                supply_id,
                quantity,
            } => serde_json::to_value(
                service
                    .consume_supply(&actor, consultation_id, supply_id, quantity)
                    .await?,
            )?,
            Command::ReverseSupply { actor, consumption_id } => {
                serde_json::to_value(service.reverse_supply_consumption(&actor, consumption_id).await?)?
            }
            Command::AddCare {
                actor,
                consultation_id,
                care_id,
                quantity,
                notes,
            } => {
                let care = NewConsultationCare {
                    notes,
                    ..NewConsultationCare::new(care_id, quantity)
                };
                serde_json::to_value(service.add_consultation_care(&actor, consultation_id, care).await?)?
            }
            Command::RemoveCare { actor, care_record_id } => {
                serde_json::to_value(service.remove_consultation_care(&actor, care_record_id).await?)?
            }
            Command::RegisterPrescription {
                actor,
                prescription,
                acknowledged,
            } => serde_json::to_value(
                service
                    .register_prescription(&actor, prescription, acknowledged)
                    .await?,
            )?,
            Command::CompletePrescription {
                actor,
                prescription_id,
                as_of,
            } => {
                let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
                serde_json::to_value(service.complete_prescription(&actor, prescription_id, as_of).await?)?
            }
            Command::CancelPrescription { actor, prescription_id } => {
                serde_json::to_value(service.cancel_prescription(&actor, prescription_id).await?)?
            }
            Command::SetConsultationStatus {
                consultation_id,
                status,
            } => {
                self.directory
                    .set_consultation_status(consultation_id, status)
                    .await?;
                serde_json::json!({ "id": consultation_id, "status": status })
            }
            Command::CreateInvoice {
                actor,
                consultation_id,
                custom_items,
            } => serde_json::to_value(
                service
                    .create_custom_invoice(&actor, consultation_id, custom_items)
                    .await?,
            )?,
            Command::UpdateInvoice {
                actor,
                invoice_id,
                items,
            } => serde_json::to_value(service.update_invoice_content(&actor, invoice_id, items).await?)?,
            Command::SetInvoiceStatus {
                actor,
                invoice_id,
                status,
            } => serde_json::to_value(service.set_invoice_status(&actor, invoice_id, status).await?)?,
            Command::RecordPayment {
                actor,
                invoice_id,
                amount,
                method,
                reference,
                notes,
            } => serde_json::to_value(
                service
                    .record_payment(&actor, invoice_id, amount, method, reference, notes)
                    .await?,
            )?,
            Command::MarkOverdue { actor, as_of } => {
                serde_json::to_value(service.mark_overdue_invoices(&actor, as_of).await?)?
            }
            Command::GetInvoice { invoice_id } => serde_json::to_value(service.invoice(invoice_id).await?)?,
            Command::LowStockReport => serde_json::to_value(service.low_stock_report().await?)?,
        };
        Ok(value)
    }

    /// Replaces `"@label"` strings with recorded ids. Returns the first
    /// unknown label.
    fn substitute(&self, value: &mut Value) -> Result<(), String> {
        match value {
            Value::String(text) => {
                if let Some(name) = text.strip_prefix('@') {
                    let id = self.labels.get(name).ok_or_else(|| name.to_string())?;
                    *text = id.clone();
                }
                Ok(())
            }
            Value::Array(items) => items.iter_mut().try_for_each(|item| self.substitute(item)),
            Value::Object(fields) => fields.values_mut().try_for_each(|field| self.substitute(field)),
            _ => Ok(()),
        }
    }
}

/// The id a labelled step records: the entity's own id, or the created
/// record's id for a consumption
fn primary_id(result: &Value) -> Option<String> {
    result
        .get("id")
        .or_else(|| result.pointer("/record/id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn invalid_command(message: &str) -> ErrorBody {
    ErrorBody {
        kind: "invalid_command",
        message: message.to_string(),
        acknowledgeable: false,
    }
}
