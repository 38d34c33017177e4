//! Resit exams: registration, approval lifecycle and marking.
//!
//! Completing a resit overwrites the original semester result and leaves an
//! audit line in its remarks keyed by the resit id.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PolicyConfig;
use crate::db::records::{
    failed_results, grade_bands_for_unit, is_unit_offered, load_programme_unit, load_resit,
    load_result, load_semester, load_student, resit_registered,
};
use crate::db::{DbResitExam, DbSemesterResult, ResitStatus};
use crate::error::{on_unique, Result, ValidationError, WorkflowError};
use crate::grading::{resolve_grade, GradeOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct ResitReceipt {
    pub resit_id: i64,
    pub status: ResitStatus,
    pub resit_fee_amount: Decimal,
}

/// A failed result that can be resat in a given semester
#[derive(Debug, Clone, Serialize)]
pub struct ResitCandidate {
    pub unit_code: String,
    pub unit_name: String,
    pub result: DbSemesterResult,
}

/// Registers a resit of a failed result in the given semester.
///
/// The original marks, grade, grade point and semester are copied onto the
/// resit row so later overwrites of the result do not change them.
pub fn register_resit(
    conn: &Connection,
    policy: &PolicyConfig,
    student_id: i64,
    result_id: i64,
    resit_semester_id: i64,
    fee: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<ResitReceipt> {
    let student = load_student(conn, student_id)?;
    let result = load_result(conn, result_id)?;
    if result.student_id != student.student_id {
        return Err(WorkflowError::not_found("semester result", result_id));
    }
    if result.is_passed {
        return Err(ValidationError::ResultNotFailed { result_id }.into());
    }

    let semester = load_semester(conn, resit_semester_id)?;
    let unit = load_programme_unit(conn, result.programme_unit_id)?;

    if !is_unit_offered(conn, unit.programme_unit_id, semester.semester_id)? {
        warn!(
            "Resit of {} refused for {}: not offered in {}",
            unit.unit_code, student.registration_number, semester.name
        );
        return Err(ValidationError::ResitNotOffered {
            unit_code: unit.unit_code,
            semester: semester.name,
        }
        .into());
    }

    if resit_registered(conn, student_id, result_id, resit_semester_id)? {
        return Err(ValidationError::AlreadyRegisteredForResit.into());
    }

    let resit_fee_amount = fee.unwrap_or(policy.default_resit_fee);
    conn.execute(
        "INSERT INTO resit_exams (
            student_id, original_result_id, resit_semester_id, original_semester_id,
            original_marks, original_grade, original_grade_point, resit_fee_amount, status,
            registration_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        (
            student_id,
            result_id,
            resit_semester_id,
            result.semester_id,
            result.total_marks.to_string(),
            &result.grade,
            result.grade_point.to_string(),
            resit_fee_amount.to_string(),
            ResitStatus::Registered,
            now,
        ),
    )
    .map_err(|e| on_unique(e, ValidationError::AlreadyRegisteredForResit))?;
    let resit_id = conn.last_insert_rowid();

    info!(
        "Resit {} registered: {} resits {} in {} (fee {})",
        resit_id, student.registration_number, unit.unit_code, semester.name, resit_fee_amount
    );

    Ok(ResitReceipt {
        resit_id,
        status: ResitStatus::Registered,
        resit_fee_amount,
    })
}

/// Moves a resit from one of `from` to `to`. Already being in `to` is a no-op.
fn transition(
    conn: &Connection,
    resit_id: i64,
    from: &[ResitStatus],
    to: ResitStatus,
    decided_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DbResitExam> {
    let resit = load_resit(conn, resit_id)?;
    if resit.status == to {
        debug!("Resit {} already {}", resit_id, to);
        return Ok(resit);
    }
    if !from.contains(&resit.status) {
        return Err(ValidationError::InvalidTransition {
            entity: "resit exam",
            id: resit_id,
            from: resit.status.to_string(),
            to: to.to_string(),
        }
        .into());
    }

    match decided_by {
        Some(by) => conn.execute(
            "UPDATE resit_exams SET status = ?1, decided_by = ?2, decision_date = ?3
             WHERE resit_id = ?4",
            (to, by, now, resit_id),
        )?,
        None => conn.execute(
            "UPDATE resit_exams SET status = ?1 WHERE resit_id = ?2",
            (to, resit_id),
        )?,
    };

    info!("Resit {} {} -> {}", resit_id, resit.status, to);
    Ok(DbResitExam { status: to, ..resit })
}

pub fn approve_resit(
    conn: &Connection,
    resit_id: i64,
    decided_by: &str,
    now: DateTime<Utc>,
) -> Result<DbResitExam> {
    transition(
        conn,
        resit_id,
        &[ResitStatus::Registered],
        ResitStatus::Approved,
        Some(decided_by),
        now,
    )
}

pub fn reject_resit(
    conn: &Connection,
    resit_id: i64,
    decided_by: &str,
    now: DateTime<Utc>,
) -> Result<DbResitExam> {
    transition(
        conn,
        resit_id,
        &[ResitStatus::Registered],
        ResitStatus::Rejected,
        Some(decided_by),
        now,
    )
}

/// Records that the student did not sit an approved resit
pub fn mark_resit_missed(conn: &Connection, resit_id: i64, now: DateTime<Utc>) -> Result<DbResitExam> {
    transition(
        conn,
        resit_id,
        &[ResitStatus::Approved],
        ResitStatus::Missed,
        None,
        now,
    )
}

/// Marks the resit fee as paid under the given payment reference
pub fn record_resit_payment(
    conn: &Connection,
    resit_id: i64,
    reference: &str,
    now: DateTime<Utc>,
) -> Result<DbResitExam> {
    let resit = load_resit(conn, resit_id)?;
    if !matches!(resit.status, ResitStatus::Registered | ResitStatus::Approved) {
        return Err(ValidationError::InvalidTransition {
            entity: "resit exam",
            id: resit_id,
            from: resit.status.to_string(),
            to: "paid".to_string(),
        }
        .into());
    }

    conn.execute(
        "UPDATE resit_exams SET fee_paid = 1, payment_reference = ?1, payment_date = ?2
         WHERE resit_id = ?3",
        (reference, now, resit_id),
    )?;
    info!("Resit {} fee paid, reference {}", resit_id, reference);

    Ok(DbResitExam {
        fee_paid: true,
        payment_reference: Some(reference.to_string()),
        payment_date: Some(now),
        ..resit
    })
}

fn audit_tag(resit_id: i64) -> String {
    format!("[resit #{resit_id}]")
}

/// Replaces this resit's audit line in `remarks`, keeping every other line.
fn with_audit_line(remarks: &str, resit_id: i64, line: &str) -> String {
    let tag = audit_tag(resit_id);
    remarks
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with(&tag))
        .chain(std::iter::once(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Marks an approved resit and writes the outcome back to the original result.
///
/// Running it again on a completed resit re-marks it; the audit line is
/// replaced, not duplicated. Nothing is written if the marks fall outside
/// every grading band.
pub fn complete_resit(
    conn: &Connection,
    policy: &PolicyConfig,
    resit_id: i64,
    marks: Decimal,
    marked_by: &str,
    now: DateTime<Utc>,
) -> Result<GradeOutcome> {
    if marks < Decimal::ZERO || marks > Decimal::ONE_HUNDRED {
        return Err(ValidationError::MarksOutOfRange { marks }.into());
    }

    let resit = load_resit(conn, resit_id)?;
    if !matches!(resit.status, ResitStatus::Approved | ResitStatus::Completed) {
        return Err(ValidationError::InvalidTransition {
            entity: "resit exam",
            id: resit_id,
            from: resit.status.to_string(),
            to: ResitStatus::Completed.to_string(),
        }
        .into());
    }

    let result = load_result(conn, resit.original_result_id)?;
    let unit = load_programme_unit(conn, result.programme_unit_id)?;
    let bands = grade_bands_for_unit(conn, unit.unit_id)?;
    let Some(outcome) = resolve_grade(&bands, marks, policy.resit_pass_rule) else {
        warn!("Resit {}: no band of {} covers {} marks", resit_id, unit.unit_code, marks);
        return Err(ValidationError::NoGradeBand {
            unit_code: unit.unit_code,
            marks,
        }
        .into());
    };

    let semester = load_semester(conn, resit.resit_semester_id)?;
    let line = format!(
        "{} Resit completed in {}. Original: {} ({})",
        audit_tag(resit_id),
        semester.name,
        resit.original_marks,
        resit.original_grade
    );
    let remarks = with_audit_line(&result.remarks, resit_id, &line);

    conn.execute(
        "UPDATE semester_results
         SET total_marks = ?1, grade = ?2, grade_point = ?3, is_passed = ?4,
             is_supplementary = 1, remarks = ?5, updated_at = ?6
         WHERE result_id = ?7",
        (
            marks.to_string(),
            &outcome.grade,
            outcome.grade_point.to_string(),
            outcome.is_passed,
            remarks,
            now,
            result.result_id,
        ),
    )?;
    conn.execute(
        "UPDATE resit_exams
         SET resit_marks = ?1, resit_grade = ?2, resit_grade_point = ?3, status = ?4,
             marked_by = ?5, marking_date = ?6
         WHERE resit_id = ?7",
        (
            marks.to_string(),
            &outcome.grade,
            outcome.grade_point.to_string(),
            ResitStatus::Completed,
            marked_by,
            now,
            resit_id,
        ),
    )?;

    info!(
        "Resit {} marked by {}: {} scored {} ({}), {}",
        resit_id,
        marked_by,
        unit.unit_code,
        marks,
        outcome.grade,
        if outcome.is_passed { "passed" } else { "failed" }
    );
    Ok(outcome)
}

/// Failed results of a student whose unit is offered in the semester and that
/// have no resit registered there yet
pub fn failed_units_for_resit(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
) -> Result<Vec<ResitCandidate>> {
    load_student(conn, student_id)?;
    load_semester(conn, semester_id)?;

    let mut candidates = Vec::new();
    for result in failed_results(conn, student_id)? {
        if !is_unit_offered(conn, result.programme_unit_id, semester_id)?
            || resit_registered(conn, student_id, result.result_id, semester_id)?
        {
            continue;
        }
        let unit = load_programme_unit(conn, result.programme_unit_id)?;
        candidates.push(ResitCandidate {
            unit_code: unit.unit_code,
            unit_name: unit.unit_name,
            result,
        });
    }
    Ok(candidates)
}
