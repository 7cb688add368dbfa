//! Wire types for the tempo time-tracking REST API.
//!
//! This crate is the single source of truth for the request/response shapes
//! the backend speaks. The backend's JSON uses Portuguese field names
//! (`tarefa_id`, `data_inicio`, …); structs here keep English field names
//! and map via serde renames so the rest of the workspace never touches the
//! wire spelling.
//!
//! Everything the server returns is wrapped in a `{success, data, error}`
//! envelope; see [`Envelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export core domain types for convenience
pub use tempo_core::{ActiveSession, Estimate, RealizedKey};

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The `{success, data, error}` wrapper around every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Body of `POST /registro-tempo/iniciar`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTrackingRequest {
    #[serde(rename = "tarefa_id")]
    pub task_id: String,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    /// Always serialized; the backend expects an explicit null
    #[serde(rename = "produto_id")]
    pub product_id: Option<String>,
    #[serde(rename = "tempo_estimado_id")]
    pub estimate_id: String,
}

impl StartTrackingRequest {
    pub fn for_estimate(estimate: &Estimate, user_id: i64) -> Self {
        Self {
            task_id: estimate.task_id.clone(),
            client_id: estimate.client_id.clone(),
            user_id,
            product_id: estimate.product_id.clone(),
            estimate_id: estimate.estimate_id.clone(),
        }
    }
}

/// Body of `PUT /registro-tempo/finalizar/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishTrackingRequest {
    #[serde(rename = "tarefa_id")]
    pub task_id: String,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// A time-record row as the server reports it (`iniciar` response, `ativo`,
/// `ativos`).
///
/// `estimate_id` is optional on the wire because historical rows predate the
/// column; converting to an [`ActiveSession`] rejects records without it
/// rather than guessing a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRecord {
    pub id: i64,
    #[serde(rename = "tarefa_id")]
    pub task_id: String,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    #[serde(rename = "tempo_estimado_id", default)]
    pub estimate_id: Option<String>,
    #[serde(rename = "data_inicio")]
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    #[error("time record {record_id} has no estimate id")]
    MissingEstimateId { record_id: i64 },
}

impl TryFrom<TimeRecord> for ActiveSession {
    type Error = RecordError;

    fn try_from(record: TimeRecord) -> Result<Self, Self::Error> {
        let estimate_id = record
            .estimate_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(RecordError::MissingEstimateId {
                record_id: record.id,
            })?;
        Ok(ActiveSession {
            estimate_id,
            record_id: record.id,
            task_id: record.task_id,
            client_id: record.client_id,
            user_id: record.user_id,
            started_at: record.started_at,
        })
    }
}

/// Payload of `GET /registro-tempo/realizado`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedResponse {
    #[serde(rename = "tempo_realizado_ms", default)]
    pub realized_ms: u64,
}

/// One historical session in the per-estimate drill-down list
/// (`GET /registro-tempo/por-tempo-estimado`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "data_inicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "data_fim", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "duracao_ms", default)]
    pub duration_ms: Option<u64>,
}
