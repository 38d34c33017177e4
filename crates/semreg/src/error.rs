//! Error types for the progression workflow.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business-rule violations. Always surfaced to the caller as a message,
/// never treated as fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Too many outstanding failed units to progress
    #[error("Not eligible: {failed_units} failed units. Maximum allowed is {max_allowed} failed units.")]
    Ineligible { failed_units: u32, max_allowed: u32 },

    /// Fee balance for the target semester has not been cleared
    #[error("Not financially cleared: outstanding fee balance of {balance}.")]
    NotFinanciallyCleared { balance: Decimal },

    /// The student is in the programme's final semester
    #[error("Programme {programme} completed: no semester follows year {duration_years}.")]
    ProgrammeCompleted { programme: String, duration_years: u32 },

    /// A pending or approved report already exists for the target semester
    #[error("Already reported for this semester.")]
    DuplicateReport,

    /// No approved report for the semester being enrolled in
    #[error("You must report for the semester before enrolling in units.")]
    ReportRequired,

    /// No dean-approved allocation for the unit in the semester
    #[error("Unit {unit_code} is not offered in {semester}.")]
    UnitNotOffered { unit_code: String, semester: String },

    /// Resit registration against a semester that does not offer the unit
    #[error("Unit {unit_code} is not offered in {semester}. You can only register for resit when the unit is being offered.")]
    ResitNotOffered { unit_code: String, semester: String },

    /// A pending or approved enrollment already exists
    #[error("You are already enrolled in {unit_code} for this semester.")]
    AlreadyEnrolled { unit_code: String },

    /// Resit enrollment without a failed attempt to resit
    #[error("No failed result found for {unit_code}. You can only enroll for resit if you have a failed result.")]
    NoFailedResult { unit_code: String },

    /// Resit already registered for this result in this semester
    #[error("You have already registered for a resit of this unit in this semester.")]
    AlreadyRegisteredForResit,

    /// Resit registration against a result that was passed
    #[error("Result {result_id} is not a failed result and cannot be resat.")]
    ResultNotFailed { result_id: i64 },

    /// Linked resit exam does not match the enrollment being created
    #[error("Resit exam {resit_id} cannot be linked to this enrollment: {reason}")]
    ResitMismatch { resit_id: i64, reason: String },

    /// State machine refused the move
    #[error("Cannot move {entity} {id} from {from} to {to}.")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        from: String,
        to: String,
    },

    /// Grading bands do not cover the marks
    #[error("No grading band of unit {unit_code} covers {marks} marks.")]
    NoGradeBand { unit_code: String, marks: Decimal },

    /// The semester's enrollment window for this kind of enrollment is closed
    #[error("{kind} enrollment is not open for semester {semester_id}.")]
    WindowClosed { kind: &'static str, semester_id: i64 },

    /// Marks outside 0..=100
    #[error("Marks must be between 0 and 100, got {marks}.")]
    MarksOutOfRange { marks: Decimal },
}

/// Errors returned by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Business-rule violation, reported to the user as is
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Storage failure; the enclosing transaction has been rolled back
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A previous holder of the connection lock panicked
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// Configuration could not be loaded
    #[error("Config error: {message}")]
    Config { message: String },
}

impl WorkflowError {
    /// Returns true if the error carries a message meant for the end user.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, WorkflowError::Validation(_))
    }

    /// Returns true if the error names a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkflowError::NotFound { .. })
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        WorkflowError::NotFound { entity, id }
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        WorkflowError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Config {
            message: err.to_string(),
        }
    }
}

/// Returns true if a storage error is a UNIQUE constraint violation, i.e. a
/// concurrent identical request won the race.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// Maps a unique violation to the given validation error and passes every
/// other storage error through.
pub(crate) fn on_unique(err: rusqlite::Error, duplicate: ValidationError) -> WorkflowError {
    if is_unique_violation(&err) {
        WorkflowError::Validation(duplicate)
    } else {
        WorkflowError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
