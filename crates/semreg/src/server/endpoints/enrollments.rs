//! Unit enrollment endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::EnrollmentType;
use crate::enrollment::{EnrollmentDecision, EnrollmentRequest};
use crate::error::ValidationError;
use crate::server::types::{api_result, ApiErrorType};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrollmentDecisionBody {
    pub decision: EnrollmentDecision,
    pub decided_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /enrollments
///
/// The semester's enrollment window is checked before anything else: normal
/// and retake enrollments need the normal window, resits the resit window.
pub async fn post_enroll(
    State(s): State<Arc<AppState>>,
    Json(body): Json<EnrollmentRequest>,
) -> Response {
    info!(
        "POST /enrollments student={} unit={} semester={} type={}",
        body.student_id, body.programme_unit_id, body.semester_id, body.enrollment_type
    );

    let window = match s.workflow.enrollment_window(body.semester_id) {
        Ok(window) => window,
        Err(e) => return ApiErrorType::from(e).into_response(),
    };
    if !window.admits(body.enrollment_type) {
        warn!(
            "Enrollment window closed for semester {} ({})",
            body.semester_id, body.enrollment_type
        );
        let kind = match body.enrollment_type {
            EnrollmentType::Resit => "Resit",
            EnrollmentType::Normal | EnrollmentType::Retake => "Normal",
        };
        return ApiErrorType::from(crate::WorkflowError::from(ValidationError::WindowClosed {
            kind,
            semester_id: body.semester_id,
        }))
        .into_response();
    }

    api_result(s.workflow.enroll_unit(&body))
}

/// POST /enrollments/:id/decision
pub async fn post_enrollment_decision(
    Path(enrollment_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<EnrollmentDecisionBody>,
) -> Response {
    info!(
        "POST /enrollments/{}/decision {:?}",
        enrollment_id, body.decision
    );
    api_result(
        s.workflow
            .decide_enrollment(
                enrollment_id,
                body.decision,
                &body.decided_by,
                body.reason.as_deref(),
            )
            .map(|status| json!({ "enrollment_id": enrollment_id, "status": status })),
    )
}

/// POST /enrollments/:id/drop
pub async fn post_drop_enrollment(
    Path(enrollment_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("POST /enrollments/{}/drop", enrollment_id);
    api_result(
        s.workflow
            .drop_enrollment(enrollment_id)
            .map(|status| json!({ "enrollment_id": enrollment_id, "status": status })),
    )
}

/// GET /students/:id/enrollments/:semester_id
pub async fn get_enrollment_summary(
    Path((student_id, semester_id)): Path<(i64, i64)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    api_result(s.workflow.enrollment_summary(student_id, semester_id))
}

/// GET /students/:id/available_units/:semester_id
pub async fn get_available_units(
    Path((student_id, semester_id)): Path<(i64, i64)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    api_result(
        s.workflow
            .units_available_for_enrollment(student_id, semester_id),
    )
}
