//! Semester report endpoints.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::progression::ReportDecision;
use crate::server::types::api_result;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct FileReportBody {
    pub student_id: i64,
    pub semester_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReportDecisionBody {
    pub decision: ReportDecision,
    pub decided_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /reports
pub async fn post_file_report(
    State(s): State<Arc<AppState>>,
    Json(body): Json<FileReportBody>,
) -> Response {
    info!(
        "POST /reports student={} semester={}",
        body.student_id, body.semester_id
    );
    api_result(
        s.workflow
            .file_semester_report(body.student_id, body.semester_id),
    )
}

/// POST /reports/:id/decision
pub async fn post_report_decision(
    Path(report_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<ReportDecisionBody>,
) -> Response {
    info!("POST /reports/{}/decision {:?}", report_id, body.decision);
    api_result(
        s.workflow
            .decide_semester_report(
                report_id,
                body.decision,
                &body.decided_by,
                body.reason.as_deref(),
            )
            .map(|status| json!({ "report_id": report_id, "status": status })),
    )
}

/// GET /students/:id/reports
pub async fn get_student_reports(
    Path(student_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    api_result(s.workflow.progression_history(student_id))
}
