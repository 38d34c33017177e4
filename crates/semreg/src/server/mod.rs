use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{calendar, enrollments, reports, resits, status};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let calendar_router = Router::new()
        .route("/calendar/current", get(calendar::get_current))
        .route(
            "/calendar/current_semester",
            post(calendar::post_current_semester),
        )
        .route(
            "/calendar/enrollment_window/:semester_id",
            get(calendar::get_enrollment_window),
        )
        .route(
            "/calendar/enrollment_periods/auto",
            post(calendar::post_auto_enrollment_periods),
        );

    let report_router = Router::new()
        .route("/reports", post(reports::post_file_report))
        .route("/reports/:id/decision", post(reports::post_report_decision))
        .route("/students/:id/reports", get(reports::get_student_reports));

    let enrollment_router = Router::new()
        .route("/enrollments", post(enrollments::post_enroll))
        .route(
            "/enrollments/:id/decision",
            post(enrollments::post_enrollment_decision),
        )
        .route("/enrollments/:id/drop", post(enrollments::post_drop_enrollment))
        .route(
            "/students/:id/enrollments/:semester_id",
            get(enrollments::get_enrollment_summary),
        )
        .route(
            "/students/:id/available_units/:semester_id",
            get(enrollments::get_available_units),
        );

    let resit_router = Router::new()
        .route("/resits", post(resits::post_register_resit))
        .route("/resits/:id/approve", post(resits::post_approve_resit))
        .route("/resits/:id/reject", post(resits::post_reject_resit))
        .route("/resits/:id/missed", post(resits::post_resit_missed))
        .route("/resits/:id/payment", post(resits::post_resit_payment))
        .route("/resits/:id/complete", post(resits::post_complete_resit))
        .route(
            "/students/:id/resit_candidates/:semester_id",
            get(resits::get_resit_candidates),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .merge(calendar_router)
        .merge(report_router)
        .merge(enrollment_router)
        .merge(resit_router)
        .with_state(app_state)
}
