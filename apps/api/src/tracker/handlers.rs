use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::models::candidate::{CandidateFields, CandidateRecord, Decision, ScreeningStatus};
use crate::state::AppState;
use crate::tracker::conversion::{ConversionLookup, ConversionUpdate};
use crate::tracker::engine::StatusCheck;
use crate::tracker::{Partition, Submission, SubmitOutcome, TrackerError};

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    /// Overrides the configured base folder. Must already exist.
    pub base_folder: Option<String>,
    pub position: Option<String>,
    pub candidate: CandidateFields,
    pub vendor_name: Option<String>,
    pub profile_shared_date: Option<NaiveDate>,
    /// Omitted: decided from the scores and the configured thresholds.
    pub decision: Option<Decision>,
    #[serde(default)]
    pub admin_override: bool,
    pub similarity_score: f64,
    pub average_score: f64,
    #[serde(default)]
    pub feedback: String,
    /// Resume file to copy into `Shortlisted/` when the candidate is shortlisted.
    pub source_document: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub decision: Decision,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub shortlisted_cv_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct StatusCheckRequest {
    pub base_folder: Option<String>,
    pub position: Option<String>,
    pub candidate: CandidateFields,
    pub vendor_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversionRequest {
    pub base_folder: Option<String>,
    pub position: Option<String>,
    #[serde(flatten)]
    pub lookup: ConversionLookup,
    pub converted_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartitionQuery {
    pub base_folder: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingConversionsResponse {
    pub store_path: PathBuf,
    pub candidates: Vec<CandidateRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/tracker/submissions
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let partition = partition_for(&state, req.base_folder.as_deref(), req.position.as_deref())?;
    let decision = req.decision.unwrap_or_else(|| {
        state
            .config
            .thresholds()
            .decide(req.similarity_score, req.average_score)
    });

    let source = req
        .source_document
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);
    let cv_target = match (&source, decision) {
        (Some(source), Decision::Shortlisted) => {
            if !source.is_file() {
                return Err(AppError::Validation(format!(
                    "source_document {} does not exist",
                    source.display()
                )));
            }
            let extension = source.extension().and_then(|e| e.to_str());
            Some(partition.shortlisted_cv_path(req.candidate.candidate_name.as_deref(), extension))
        }
        _ => None,
    };

    let submission = Submission {
        fields: req.candidate,
        decision,
        vendor_name: req.vendor_name,
        profile_shared_date: req.profile_shared_date,
        admin_override: req.admin_override,
        similarity_score: req.similarity_score,
        average_score: req.average_score,
        feedback: req.feedback,
        shortlisted_cv_path: cv_target.as_ref().map(|p| p.display().to_string()),
    };

    let tracker = state.tracker.clone();
    let task_partition = partition.clone();
    let outcome = run_blocking(move || tracker.submit(&task_partition, &submission)).await?;

    let shortlisted_cv_path = match (&source, cv_target) {
        (Some(source), Some(target)) if outcome.recorded_status == Some(ScreeningStatus::Shortlisted) => {
            copy_source_document(source, &target).await;
            Some(target)
        }
        _ => None,
    };

    Ok(Json(SubmissionResponse {
        decision,
        outcome,
        shortlisted_cv_path,
    }))
}

/// POST /api/v1/tracker/status
pub async fn handle_check_status(
    State(state): State<AppState>,
    Json(req): Json<StatusCheckRequest>,
) -> Result<Json<StatusCheck>, AppError> {
    let partition = partition_for(&state, req.base_folder.as_deref(), req.position.as_deref())?;
    let tracker = state.tracker.clone();
    let check = run_blocking(move || {
        tracker.check_status(&partition, &req.candidate, req.vendor_name.as_deref())
    })
    .await?;
    Ok(Json(check))
}

/// POST /api/v1/tracker/conversions
pub async fn handle_mark_converted(
    State(state): State<AppState>,
    Json(req): Json<ConversionRequest>,
) -> Result<Json<ConversionUpdate>, AppError> {
    let partition = partition_for(&state, req.base_folder.as_deref(), req.position.as_deref())?;
    let tracker = state.tracker.clone();
    let update = run_blocking(move || {
        tracker.mark_cv_converted(
            &partition.store_path(),
            &req.lookup,
            req.converted_path.as_deref(),
        )
    })
    .await?;
    Ok(Json(update))
}

/// GET /api/v1/tracker/conversions/pending
pub async fn handle_pending_conversions(
    State(state): State<AppState>,
    Query(params): Query<PartitionQuery>,
) -> Result<Json<PendingConversionsResponse>, AppError> {
    let partition = partition_for(&state, params.base_folder.as_deref(), params.position.as_deref())?;
    let store_path = partition.store_path();
    let tracker = state.tracker.clone();
    let candidates = run_blocking(move || tracker.pending_conversions(&partition)).await?;
    Ok(Json(PendingConversionsResponse {
        store_path,
        candidates,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn partition_for(
    state: &AppState,
    base_folder: Option<&str>,
    position: Option<&str>,
) -> Result<Partition, AppError> {
    let base = base_folder
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.base_folder.clone());
    if !base.is_dir() {
        return Err(AppError::Validation(format!(
            "base folder {} does not exist",
            base.display()
        )));
    }
    Ok(Partition::new(base, position))
}

/// Tracker calls do blocking file I/O and hold file locks.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, TrackerError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .context("tracker task failed")?;
    Ok(result?)
}

/// The tracker row is already written; a failed copy is logged, not returned.
async fn copy_source_document(source: &Path, target: &Path) {
    if let Err(e) = tokio::fs::copy(source, target).await {
        warn!(
            "Failed to copy {} to {}: {e}",
            source.display(),
            target.display()
        );
    }
}
