//! Axum route handlers for the session API.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery, JsonOrDefault};
use crate::models::{Delivery, Prospect, RunStatus, SenderProfile};
use crate::orchestrator::export::{ExportFormat, RunReport};
use crate::orchestrator::pipeline::SearchParams;
use crate::orchestrator::session::Session;
use crate::outreach::SendOptions;
use crate::search::SearchMode;
use crate::state::AppState;

const DEFAULT_MAX_RESULTS: usize = 10;
const DEFAULT_MAX_COMPANIES: usize = 20;
const DEFAULT_MAX_PROSPECTS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Every successful body carries `"success": true` next to its payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    #[default]
    Linkedin,
    CompanyBased,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchBody {
    #[serde(default)]
    pub profile: SenderProfile,
    /// Overrides `profile.goal` when present.
    pub goal: Option<String>,
    #[serde(default)]
    pub mode: ModeName,
    #[validate(range(min = 1, max = 50))]
    pub max_results: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub max_companies: Option<usize>,
    #[validate(range(min = 1, max = 20))]
    pub max_prospects: Option<usize>,
    #[validate(range(min = 1, max = 365))]
    pub recency_days: Option<u32>,
}

impl SearchBody {
    fn into_params(self) -> Result<SearchParams, AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut profile = self.profile;
        if let Some(goal) = self.goal {
            profile.goal = goal;
        }
        profile.goal = profile.goal.trim().to_string();
        profile
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mode = match self.mode {
            ModeName::Linkedin => SearchMode::Linkedin {
                max_results: self.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            },
            ModeName::CompanyBased => SearchMode::CompanyBased {
                max_companies: self.max_companies.unwrap_or(DEFAULT_MAX_COMPANIES),
                max_prospects: self.max_prospects.unwrap_or(DEFAULT_MAX_PROSPECTS),
            },
        };

        Ok(SearchParams {
            profile,
            mode,
            recency_days: self.recency_days,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub prospects: Vec<Prospect>,
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub delivery: Delivery,
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct ProspectResponse {
    pub prospect: Prospect,
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

fn session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    let session = state.sessions.create();
    info!("Created session {}", session.id());
    (
        StatusCode::CREATED,
        ok(SessionResponse {
            session_id: session.id(),
            created_at: session.created_at(),
            status: session.status(),
        }),
    )
}

/// POST /api/v1/sessions/:id/search
///
/// Runs search and email resolution to completion, then returns the prospects.
pub async fn handle_search(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<SearchBody>,
) -> Result<Json<ApiResponse<SearchResponse>>, AppError> {
    let session = session(&state, id)?;
    let params = body.into_params()?;

    let status = state.orchestrator.search(&session, params).await?;

    Ok(ok(SearchResponse {
        prospects: session.prospects(),
        status,
    }))
}

/// POST /api/v1/sessions/:id/send
///
/// Claims the session and runs the bulk send in the background. Poll status
/// for progress.
pub async fn handle_send_all(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    JsonOrDefault(options): JsonOrDefault<SendOptions>,
) -> Result<(StatusCode, Json<ApiResponse<StatusResponse>>), AppError> {
    let session = session(&state, id)?;

    let job = state.orchestrator.begin_send_all(&session, options)?;
    info!("Session {}: starting bulk send of {} emails", id, job.len());

    let orchestrator = state.orchestrator.clone();
    let running = session.clone();
    tokio::spawn(async move {
        let status = orchestrator.run_send_all(&running, job).await;
        if status.emails_failed > 0 {
            error!(
                "Session {}: {} emails failed",
                running.id(),
                status.emails_failed
            );
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        ok(StatusResponse {
            status: session.status(),
        }),
    ))
}

/// POST /api/v1/sessions/:id/prospects/:index/send
pub async fn handle_send_one(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(Uuid, usize)>,
    JsonOrDefault(options): JsonOrDefault<SendOptions>,
) -> Result<Json<ApiResponse<DeliveryResponse>>, AppError> {
    let session = session(&state, id)?;

    let delivery = state.orchestrator.send_one(&session, index, options).await?;

    Ok(ok(DeliveryResponse {
        delivery,
        status: session.status(),
    }))
}

/// GET /api/v1/sessions/:id/prospects/:index
pub async fn handle_get_prospect(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(Uuid, usize)>,
) -> Result<Json<ApiResponse<ProspectResponse>>, AppError> {
    let session = session(&state, id)?;
    let (prospect, delivery) = session
        .prospect(index)
        .ok_or_else(|| AppError::NotFound(format!("prospect {index}")))?;

    Ok(ok(ProspectResponse { prospect, delivery }))
}

/// GET /api/v1/sessions/:id/status
pub async fn handle_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let session = session(&state, id)?;
    Ok(ok(StatusResponse {
        status: state.orchestrator.status(&session),
    }))
}

/// POST /api/v1/sessions/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let session = session(&state, id)?;
    let status = state.orchestrator.cancel(&session)?;
    Ok(ok(StatusResponse { status }))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let session = session(&state, id)?;
    let status = state.orchestrator.reset(&session)?;
    Ok(ok(StatusResponse { status }))
}

/// GET /api/v1/sessions/:id/export?format=json|csv
pub async fn handle_export(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ExportQuery>,
) -> Result<Response, AppError> {
    let session = session(&state, id)?;
    let report = RunReport::from_session(&session);
    let document = report
        .render(query.format)
        .map_err(|e| AppError::Internal(e.into()))?;

    let filename = format!(
        "job_agent_results_{}.{}",
        report.exported_at.format("%Y%m%d_%H%M%S"),
        query.format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        document,
    )
        .into_response())
}
