use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::types::{api_result, ApiErrorType};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct CurrentSemesterBody {
    pub semester_id: i64,
}

/// GET /calendar/current
pub async fn get_current(State(s): State<Arc<AppState>>) -> Response {
    api_result(s.workflow.current_term())
}

/// POST /calendar/current_semester
pub async fn post_current_semester(
    State(s): State<Arc<AppState>>,
    Json(body): Json<CurrentSemesterBody>,
) -> Response {
    info!("POST /calendar/current_semester {}", body.semester_id);
    api_result(s.workflow.set_current_semester(body.semester_id))
}

/// GET /calendar/enrollment_window/:semester_id
pub async fn get_enrollment_window(
    Path(semester_id): Path<i64>,
    State(s): State<Arc<AppState>>,
) -> Response {
    api_result(s.workflow.enrollment_window(semester_id))
}

/// POST /calendar/enrollment_periods/auto
pub async fn post_auto_enrollment_periods(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /calendar/enrollment_periods/auto");
    match s.workflow.auto_create_enrollment_periods() {
        Ok(created) => (
            StatusCode::OK,
            Json(json!({
                "created": created.len(),
                "enrollment_period_ids": created,
            })),
        )
            .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
