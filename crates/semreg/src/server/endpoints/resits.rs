//! Resit exam endpoints.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::server::types::api_result;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterResitBody {
    pub student_id: i64,
    pub semester_result_id: i64,
    pub resit_semester_id: i64,
    #[serde(default)]
    pub fee: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct DecidedByBody {
    pub decided_by: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct MarksBody {
    pub marks: Decimal,
    pub marked_by: String,
}

/// POST /resits
pub async fn post_register_resit(
    State(s): State<Arc<AppState>>,
    Json(body): Json<RegisterResitBody>,
) -> Response {
    info!(
        "POST /resits student={} result={} semester={}",
        body.student_id, body.semester_result_id, body.resit_semester_id
    );
    api_result(s.workflow.register_resit(
        body.student_id,
        body.semester_result_id,
        body.resit_semester_id,
        body.fee,
    ))
}

/// POST /resits/:id/approve
pub async fn post_approve_resit(
    Path(resit_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<DecidedByBody>,
) -> Response {
    info!("POST /resits/{}/approve by {}", resit_id, body.decided_by);
    api_result(s.workflow.approve_resit(resit_id, &body.decided_by))
}

/// POST /resits/:id/reject
pub async fn post_reject_resit(
    Path(resit_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<DecidedByBody>,
) -> Response {
    info!("POST /resits/{}/reject by {}", resit_id, body.decided_by);
    api_result(s.workflow.reject_resit(resit_id, &body.decided_by))
}

/// POST /resits/:id/missed
pub async fn post_resit_missed(
    Path(resit_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("POST /resits/{}/missed", resit_id);
    api_result(s.workflow.mark_resit_missed(resit_id))
}

/// POST /resits/:id/payment
pub async fn post_resit_payment(
    Path(resit_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<PaymentBody>,
) -> Response {
    info!("POST /resits/{}/payment", resit_id);
    api_result(s.workflow.record_resit_payment(resit_id, &body.reference))
}

/// POST /resits/:id/complete
pub async fn post_complete_resit(
    Path(resit_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<MarksBody>,
) -> Response {
    info!(
        "POST /resits/{}/complete marks={} by {}",
        resit_id, body.marks, body.marked_by
    );
    api_result(s.workflow.complete_resit(resit_id, body.marks, &body.marked_by))
}

/// GET /students/:id/resit_candidates/:semester_id
pub async fn get_resit_candidates(
    Path((student_id, semester_id)): Path<(i64, i64)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    api_result(s.workflow.failed_units_for_resit(student_id, semester_id))
}
