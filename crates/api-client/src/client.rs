use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use tempo_api::{
    Envelope, FinishTrackingRequest, HistoryEntry, RealizedResponse, StartTrackingRequest,
    TimeRecord,
};

use crate::error::ApiError;

/// Typed HTTP client for the time-tracking endpoints.
///
/// One method per endpoint; every response goes through the shared envelope
/// parser so status mapping (401 to `AuthExpired`, 5xx to `Server`, envelope
/// `success: false` to `Rejected`) lives in exactly one place.
pub struct TimeApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl TimeApi {
    /// Create a new client with the given base URL and request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn set_auth(&mut self, token: String) {
        self.auth_token = Some(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    // ── Tracking ──────────────────────────────────────────────────────────

    /// `POST /registro-tempo/iniciar`: open a time record for an estimate.
    pub async fn start_tracking(
        &self,
        req: &StartTrackingRequest,
    ) -> Result<TimeRecord, ApiError> {
        let resp = self
            .authed(self.client.post(self.url("/registro-tempo/iniciar")))
            .json(req)
            .send()
            .await?;
        parse_envelope(resp).await
    }

    /// `PUT /registro-tempo/finalizar/{id}`: close a time record. The
    /// server computes and persists the realized duration.
    pub async fn finish_tracking(
        &self,
        record_id: i64,
        req: &FinishTrackingRequest,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/registro-tempo/finalizar/{record_id}"));
        let resp = self.authed(self.client.put(url)).json(req).send().await?;
        parse_envelope_ok(resp).await
    }

    /// `GET /registro-tempo/ativo`: the active record for one
    /// (user, task, client) scope, if any.
    pub async fn active_for_scope(
        &self,
        user_id: i64,
        task_id: &str,
        client_id: &str,
    ) -> Result<Option<TimeRecord>, ApiError> {
        let resp = self
            .authed(self.client.get(self.url("/registro-tempo/ativo")))
            .query(&[
                ("usuario_id", user_id.to_string().as_str()),
                ("tarefa_id", task_id),
                ("cliente_id", client_id),
            ])
            .send()
            .await?;
        parse_envelope_opt(resp).await
    }

    /// `GET /registro-tempo/ativos`: every active record for a user,
    /// estimate-agnostic. This is what reconciliation polls.
    pub async fn active_for_user(&self, user_id: i64) -> Result<Vec<TimeRecord>, ApiError> {
        let resp = self
            .authed(self.client.get(self.url("/registro-tempo/ativos")))
            .query(&[("usuario_id", user_id)])
            .send()
            .await?;
        let records: Option<Vec<TimeRecord>> = parse_envelope_opt(resp).await?;
        Ok(records.unwrap_or_default())
    }

    /// `GET /registro-tempo/realizado`: cumulative realized milliseconds
    /// for one estimate tuple.
    pub async fn realized(
        &self,
        user_id: i64,
        task_id: &str,
        client_id: &str,
        estimate_id: &str,
    ) -> Result<u64, ApiError> {
        let resp = self
            .authed(self.client.get(self.url("/registro-tempo/realizado")))
            .query(&[
                ("usuario_id", user_id.to_string().as_str()),
                ("tarefa_id", task_id),
                ("cliente_id", client_id),
                ("tempo_estimado_id", estimate_id),
            ])
            .send()
            .await?;
        let realized: Option<RealizedResponse> = parse_envelope_opt(resp).await?;
        Ok(realized.map(|r| r.realized_ms).unwrap_or_default())
    }

    /// `GET /registro-tempo/por-tempo-estimado`: historical records for an
    /// estimate (drill-down list).
    pub async fn history_for_estimate(
        &self,
        estimate_id: &str,
    ) -> Result<Vec<HistoryEntry>, ApiError> {
        let resp = self
            .authed(
                self.client
                    .get(self.url("/registro-tempo/por-tempo-estimado")),
            )
            .query(&[("tempo_estimado_id", estimate_id)])
            .send()
            .await?;
        let entries: Option<Vec<HistoryEntry>> = parse_envelope_opt(resp).await?;
        Ok(entries.unwrap_or_default())
    }
}

// ─── Envelope parsing ────────────────────────────────────────────────────────

/// Map an HTTP response to the error taxonomy, then unwrap the envelope.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Envelope<T>, ApiError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::AuthExpired);
    }

    let body = resp.text().await?;

    if status.is_server_error() {
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: body,
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|e| ApiError::InvalidResponse(format!("{e} (body: {body:.200})")))?;

    if !status.is_success() || !envelope.success {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: envelope
                .error
                .unwrap_or_else(|| format!("HTTP {status}")),
        });
    }

    Ok(envelope)
}

/// Successful envelope with required data.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    decode(resp)
        .await?
        .data
        .ok_or_else(|| ApiError::InvalidResponse("envelope has no data".to_string()))
}

/// Successful envelope where data may legitimately be null/absent.
async fn parse_envelope_opt<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<Option<T>, ApiError> {
    Ok(decode(resp).await?.data)
}

/// Successful envelope, data ignored.
async fn parse_envelope_ok(resp: reqwest::Response) -> Result<(), ApiError> {
    decode::<serde_json::Value>(resp).await.map(|_| ())
}
