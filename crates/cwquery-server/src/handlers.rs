//! Request handlers for the /api surface.
//!
//! Handlers validate caller input, delegate to the auth and client crates,
//! and shape responses. Every execute-query attempt is recorded in history
//! whether it succeeds or fails; a history write failure never fails the
//! request it rides on.

use std::time::Instant;

use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use cwquery_auth::ASSERTION_TTL_SECS;
use cwquery_client::normalize::expect_binary;
use cwquery_client::patient::build_patient_resource;
use cwquery_client::{
    Method, NormalizedBody, QueryParameters, UpstreamRequest, audit, guard, query,
};
use cwquery_core::catalog::{CONTENT_TYPES, LOINC_DOCUMENT_TYPES};
use cwquery_core::{Environment, NewQueryHistoryRecord, QueryOutcome};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "cwquery",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Reference data for the form client.
pub async fn catalog() -> impl IntoResponse {
    Json(json!({
        "documentTypes": LOINC_DOCUMENT_TYPES,
        "contentTypes": CONTENT_TYPES,
    }))
}

// ---- Query execution ----

pub async fn execute_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryParameters>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(params) = payload
        .map_err(|e| ApiError::validation("Invalid query parameters", vec![e.body_text()]))?;
    params
        .validate()
        .map_err(|details| ApiError::validation("Invalid query parameters", details))?;

    let env = state.config.environment(params.environment);
    let timeout_ms = state.executor.timeout_ms();
    let query_url = query::build_query_url(&env.query_base_url, &params)
        .map_err(|e| ApiError::from_client(e, timeout_ms, 0))?;

    let started = Instant::now();
    let result = state
        .executor
        .execute(UpstreamRequest {
            operation: "DocumentReference Query",
            method: Method::GET,
            url: &query_url,
            bearer: &params.bearer_token,
            body: None,
        })
        .await;

    match result {
        Ok(response) => {
            let outcome = if response.is_success() {
                QueryOutcome::Success
            } else {
                QueryOutcome::Error
            };
            let document_count = document_count_of(&response.body);
            record_history(
                &state,
                &params,
                &query_url,
                response.elapsed_ms,
                document_count,
                outcome,
            )
            .await;

            if response.is_success() {
                // 2xx passthrough: the upstream body is the response.
                Ok(Json(response.body).into_response())
            } else {
                Err(ApiError::UpstreamApi {
                    status: response.status,
                    status_text: response.status_text,
                    details: serde_json::to_value(&response.body).unwrap_or(Value::Null),
                    response_time_ms: Some(response.elapsed_ms),
                    patient_object: None,
                })
            }
        }
        Err(error) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            record_history(&state, &params, &query_url, elapsed_ms, 0, QueryOutcome::Error).await;
            Err(ApiError::from_client(error, timeout_ms, elapsed_ms))
        }
    }
}

/// Upstream `total` when present, else the returned page's entry count.
fn document_count_of(body: &NormalizedBody) -> u64 {
    let Some(value) = body.as_json() else {
        return 0;
    };
    value
        .get("total")
        .and_then(Value::as_u64)
        .or_else(|| value.get("entry").and_then(Value::as_array).map(|e| e.len() as u64))
        .unwrap_or(0)
}

async fn record_history(
    state: &AppState,
    params: &QueryParameters,
    query_url: &str,
    response_time_ms: u64,
    document_count: u64,
    status: QueryOutcome,
) {
    let record = NewQueryHistoryRecord {
        query_url: query_url.to_string(),
        environment: params.environment,
        patient_identifier: params.patient_identifier(),
        parameters: serde_json::to_value(params).unwrap_or(Value::Null),
        response_time_ms,
        document_count,
        status,
    };
    if let Err(e) = state.history.append(record).await {
        tracing::warn!(error = %e, "failed to record query history");
    }
}

// ---- Document download ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDocumentRequest {
    pub environment: Environment,
    pub bearer_token: String,
    pub document_url: String,
}

pub async fn download_document(
    State(state): State<AppState>,
    payload: Result<Json<DownloadDocumentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::validation("Invalid download parameters", vec![e.body_text()]))?;

    let mut issues = Vec::new();
    if request.bearer_token.is_empty() {
        issues.push("bearerToken must not be empty".to_string());
    }
    if request.document_url.is_empty() {
        issues.push("documentUrl must not be empty".to_string());
    }
    if !issues.is_empty() {
        return Err(ApiError::validation("Invalid download parameters", issues));
    }

    let env = state.config.environment(request.environment);
    let timeout_ms = state.executor.timeout_ms();

    // The allow-list guard runs before anything is dereferenced.
    guard::validate_document_url(&request.document_url, &env.allowed_host)
        .map_err(|e| ApiError::from_client(e, timeout_ms, 0))?;

    let started = Instant::now();
    let response = state
        .executor
        .execute(UpstreamRequest {
            operation: "Binary Retrieve",
            method: Method::GET,
            url: &request.document_url,
            bearer: &request.bearer_token,
            body: None,
        })
        .await
        .map_err(|e| {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            ApiError::from_client(e, timeout_ms, elapsed_ms)
        })?;

    if response.status != 200 {
        return Err(ApiError::UpstreamApi {
            status: response.status,
            status_text: response.status_text,
            details: serde_json::to_value(&response.body).unwrap_or(Value::Null),
            response_time_ms: None,
            patient_object: None,
        });
    }

    let binary = expect_binary(&response.body)
        .map_err(|e| ApiError::from_client(e, timeout_ms, response.elapsed_ms))?;

    Ok(Json(json!({
        "success": true,
        "contentType": binary.content_type,
        "data": binary.data,
        "id": binary.id,
    }))
    .into_response())
}

// ---- Assertion minting ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateJwtRequest {
    pub identity_token: String,
}

pub async fn generate_jwt(
    State(state): State<AppState>,
    payload: Result<Json<GenerateJwtRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::validation("Invalid request", vec![e.body_text()]))?;
    if request.identity_token.is_empty() {
        return Err(ApiError::validation(
            "Invalid request",
            vec!["identityToken must not be empty".to_string()],
        ));
    }

    tracing::info!(
        operation = "JWT Generation",
        token_preview = %audit::preview(&request.identity_token),
        "starting assertion generation"
    );

    let signed = state.signer.sign(&request.identity_token).inspect_err(|e| {
        tracing::error!(operation = "JWT Generation", error = %e, "assertion generation failed");
    })?;

    tracing::info!(
        operation = "JWT Generation",
        jwt_preview = %audit::preview(&signed.assertion),
        "assertion generation successful"
    );

    Ok(Json(json!({
        "success": true,
        "jwt": signed.assertion,
        "claims": signed.claims,
        "expiresIn": ASSERTION_TTL_SECS,
    }))
    .into_response())
}

// ---- Patient registration ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub environment: Environment,
    pub identity_token: String,
    pub local_patient_id: String,
    pub local_aaid: String,
}

pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::validation("Invalid request", vec![e.body_text()]))?;

    let mut issues = Vec::new();
    for (name, value) in [
        ("identityToken", &request.identity_token),
        ("localPatientId", &request.local_patient_id),
        ("localAaid", &request.local_aaid),
    ] {
        if value.is_empty() {
            issues.push(format!("{name} must not be empty"));
        }
    }
    if !issues.is_empty() {
        return Err(ApiError::validation("Invalid request", issues));
    }

    // The assertion is regenerated per call; the decoded claims feed the
    // registration document.
    let signed = state.signer.sign(&request.identity_token)?;
    let patient = build_patient_resource(
        &signed.claims,
        &request.local_patient_id,
        &request.local_aaid,
        &state.config.upstream.org_name,
        &state.config.upstream.identity_issuer_oid,
    );
    let patient_value = serde_json::to_value(&patient)
        .map_err(|e| ApiError::internal("Failed to create patient", e.to_string()))?;

    let env = state.config.environment(request.environment);
    let patient_url = env.patient_url(&state.config.upstream.org_oid);
    let timeout_ms = state.executor.timeout_ms();

    let started = Instant::now();
    let response = state
        .executor
        .execute(UpstreamRequest {
            operation: "Patient Create",
            method: Method::POST,
            url: &patient_url,
            bearer: &signed.assertion,
            body: Some(&patient_value),
        })
        .await
        .map_err(|e| {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            ApiError::from_client(e, timeout_ms, elapsed_ms)
        })?;

    if response.is_success() {
        Ok(Json(json!({
            "success": true,
            "patient": response.body,
            "patientObject": patient_value,
        }))
        .into_response())
    } else {
        Err(ApiError::UpstreamApi {
            status: response.status,
            status_text: response.status_text,
            details: serde_json::to_value(&response.body).unwrap_or(Value::Null),
            response_time_ms: None,
            patient_object: Some(patient_value),
        })
    }
}

// ---- Query history ----

pub async fn get_query_history(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state
        .history
        .recent()
        .await
        .map_err(|e| ApiError::internal("Failed to get query history", e.to_string()))?;
    Ok(Json(records).into_response())
}

pub async fn clear_query_history(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .history
        .clear()
        .await
        .map_err(|e| ApiError::internal("Failed to clear query history", e.to_string()))?;
    Ok(Json(json!({ "success": true })).into_response())
}
