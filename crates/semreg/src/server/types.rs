use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::WorkflowError;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status_code: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status_code, error, context): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status_code,
            error: error.to_string(),
            context,
        }
    }
}

impl From<WorkflowError> for ApiErrorType {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(v) => {
                warn!("Refused: {}", v);
                Self {
                    status_code: StatusCode::UNPROCESSABLE_ENTITY,
                    error: v.to_string(),
                    context: None,
                }
            }
            WorkflowError::NotFound { .. } => Self {
                status_code: StatusCode::NOT_FOUND,
                error: err.to_string(),
                context: None,
            },
            other => {
                error!("Workflow failure: {}", other);
                Self {
                    status_code: StatusCode::INTERNAL_SERVER_ERROR,
                    error: "Internal error".to_string(),
                    context: Some(other.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

/// Serializes a workflow result as `200 OK` JSON or the mapped error.
pub fn api_result<T: Serialize>(result: crate::Result<T>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_status_mapping() {
        let validation = ApiErrorType::from(WorkflowError::from(ValidationError::DuplicateReport));
        assert_eq!(validation.status_code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(validation.error, "Already reported for this semester.");

        let missing = ApiErrorType::from(WorkflowError::not_found("student", 7));
        assert_eq!(missing.status_code, StatusCode::NOT_FOUND);

        let poisoned = ApiErrorType::from(WorkflowError::LockPoisoned);
        assert_eq!(poisoned.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(poisoned.context.as_deref(), Some("Database lock poisoned"));
    }
}
