//! Unit enrollment after an approved semester report.
//!
//! The enrollment window is the caller's concern; this module only checks
//! referential and business rules.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::records::{
    enrollment_for_resit, enrollments_for_semester, failed_result_for_unit, is_unit_offered,
    load_enrollment, load_programme_unit, load_resit, load_result, load_semester, load_student,
    offered_programme_units, open_enrollment, report_for_semester,
};
use crate::db::{
    DbProgrammeUnit, DbUnitEnrollment, EnrollmentStatus, EnrollmentType, RegistrationStatus,
    ReportStatus, ResitStatus,
};
use crate::error::{on_unique, Result, ValidationError};

/// A request to enroll a student in one unit for one semester
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub student_id: i64,
    pub programme_unit_id: i64,
    pub semester_id: i64,
    #[serde(default = "default_enrollment_type")]
    pub enrollment_type: EnrollmentType,
    #[serde(default)]
    pub resit_exam_id: Option<i64>,
}

fn default_enrollment_type() -> EnrollmentType {
    EnrollmentType::Normal
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub enrollment_id: i64,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentDecision {
    Approve,
    Reject,
}

/// Enrollments of a student in a semester with counts by status and type
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrollmentSummary {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub dropped: u32,
    pub normal: u32,
    pub resit: u32,
    pub retake: u32,
    pub enrollments: Vec<DbUnitEnrollment>,
}

/// Creates a pending enrollment.
///
/// Checks run in a fixed order: approved report, unit offered, not already
/// enrolled, failed result for resits, then the linked resit exam if any.
pub fn enroll(
    conn: &Connection,
    request: &EnrollmentRequest,
    now: DateTime<Utc>,
) -> Result<EnrollmentReceipt> {
    let student = load_student(conn, request.student_id)?;
    let semester = load_semester(conn, request.semester_id)?;
    let unit = load_programme_unit(conn, request.programme_unit_id)?;

    let Some(report) = report_for_semester(
        conn,
        student.student_id,
        semester.semester_id,
        &[ReportStatus::Approved],
    )?
    else {
        warn!(
            "{} tried to enroll in {} without an approved report for {}",
            student.registration_number, unit.unit_code, semester.name
        );
        return Err(ValidationError::ReportRequired.into());
    };

    if !is_unit_offered(conn, unit.programme_unit_id, semester.semester_id)? {
        return Err(ValidationError::UnitNotOffered {
            unit_code: unit.unit_code,
            semester: semester.name,
        }
        .into());
    }

    if open_enrollment(conn, student.student_id, unit.programme_unit_id, semester.semester_id)?.is_some() {
        return Err(ValidationError::AlreadyEnrolled {
            unit_code: unit.unit_code,
        }
        .into());
    }

    if request.enrollment_type == EnrollmentType::Resit
        && failed_result_for_unit(conn, student.student_id, unit.programme_unit_id)?.is_none()
    {
        return Err(ValidationError::NoFailedResult {
            unit_code: unit.unit_code,
        }
        .into());
    }

    if let Some(resit_id) = request.resit_exam_id {
        check_resit_link(conn, resit_id, student.student_id, &unit)?;
    }

    conn.execute(
        "INSERT INTO unit_enrollments (
            student_id, report_id, programme_unit_id, semester_id, enrollment_type, status,
            resit_exam_id, enrollment_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            student.student_id,
            report.report_id,
            unit.programme_unit_id,
            semester.semester_id,
            request.enrollment_type,
            EnrollmentStatus::Pending,
            request.resit_exam_id,
            now,
        ),
    )
    .map_err(|e| {
        on_unique(
            e,
            ValidationError::AlreadyEnrolled {
                unit_code: unit.unit_code.clone(),
            },
        )
    })?;
    let enrollment_id = conn.last_insert_rowid();

    info!(
        "Enrollment {} created: {} in {} ({}) for {}",
        enrollment_id,
        student.registration_number,
        unit.unit_code,
        request.enrollment_type,
        semester.name
    );

    Ok(EnrollmentReceipt {
        enrollment_id,
        status: EnrollmentStatus::Pending,
    })
}

fn check_resit_link(
    conn: &Connection,
    resit_id: i64,
    student_id: i64,
    unit: &DbProgrammeUnit,
) -> Result<()> {
    let resit = load_resit(conn, resit_id)?;
    let mismatch = |reason: String| ValidationError::ResitMismatch { resit_id, reason };

    if resit.student_id != student_id {
        return Err(mismatch("it belongs to another student".to_string()).into());
    }
    if matches!(resit.status, ResitStatus::Rejected | ResitStatus::Missed) {
        return Err(mismatch(format!("it is {}", resit.status)).into());
    }

    let original = load_result(conn, resit.original_result_id)?;
    if original.programme_unit_id != unit.programme_unit_id {
        return Err(mismatch(format!("it is not a resit of {}", unit.unit_code)).into());
    }

    if let Some(linked) = enrollment_for_resit(conn, resit_id)? {
        return Err(mismatch(format!(
            "it is already linked to enrollment {}",
            linked.enrollment_id
        ))
        .into());
    }

    debug!("Resit {} may be linked to a {} enrollment", resit_id, unit.unit_code);
    Ok(())
}

/// Approves or rejects a pending enrollment. Approval mirrors the enrollment
/// into `unit_registrations`; approving an approved enrollment is a no-op.
pub fn decide_enrollment(
    conn: &Connection,
    enrollment_id: i64,
    decision: EnrollmentDecision,
    decided_by: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<EnrollmentStatus> {
    let enrollment = load_enrollment(conn, enrollment_id)?;
    let target = match decision {
        EnrollmentDecision::Approve => EnrollmentStatus::Approved,
        EnrollmentDecision::Reject => EnrollmentStatus::Rejected,
    };

    if enrollment.status == EnrollmentStatus::Approved && target == EnrollmentStatus::Approved {
        debug!("Enrollment {} already approved, nothing to do", enrollment_id);
        return Ok(EnrollmentStatus::Approved);
    }

    if enrollment.status != EnrollmentStatus::Pending {
        return Err(ValidationError::InvalidTransition {
            entity: "unit enrollment",
            id: enrollment_id,
            from: enrollment.status.to_string(),
            to: target.to_string(),
        }
        .into());
    }

    conn.execute(
        "UPDATE unit_enrollments
         SET status = ?1, decided_by = ?2, decision_date = ?3, rejection_reason = ?4
         WHERE enrollment_id = ?5",
        (target, decided_by, now, reason.unwrap_or_default(), enrollment_id),
    )?;

    if target == EnrollmentStatus::Approved {
        // A row left behind by an earlier drop is brought back rather than duplicated.
        conn.execute(
            "INSERT INTO unit_registrations (
                student_id, programme_unit_id, semester_id, status, is_retake, approved_by,
                registration_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (student_id, programme_unit_id, semester_id)
            DO UPDATE SET status = excluded.status, is_retake = excluded.is_retake,
                          approved_by = excluded.approved_by
            WHERE unit_registrations.status = 'dropped'",
            (
                enrollment.student_id,
                enrollment.programme_unit_id,
                enrollment.semester_id,
                RegistrationStatus::Registered,
                enrollment.enrollment_type.is_retake(),
                decided_by,
                now,
            ),
        )?;
    }

    info!("Enrollment {} {} by {}", enrollment_id, target, decided_by);
    Ok(target)
}

/// Drops a pending or approved enrollment and its registration mirror
pub fn drop_enrollment(
    conn: &Connection,
    enrollment_id: i64,
    now: DateTime<Utc>,
) -> Result<EnrollmentStatus> {
    let enrollment = load_enrollment(conn, enrollment_id)?;

    if !matches!(
        enrollment.status,
        EnrollmentStatus::Pending | EnrollmentStatus::Approved
    ) {
        return Err(ValidationError::InvalidTransition {
            entity: "unit enrollment",
            id: enrollment_id,
            from: enrollment.status.to_string(),
            to: EnrollmentStatus::Dropped.to_string(),
        }
        .into());
    }

    conn.execute(
        "UPDATE unit_enrollments SET status = ?1, decision_date = ?2 WHERE enrollment_id = ?3",
        (EnrollmentStatus::Dropped, now, enrollment_id),
    )?;
    let mirrored = conn.execute(
        "UPDATE unit_registrations SET status = ?1
         WHERE student_id = ?2 AND programme_unit_id = ?3 AND semester_id = ?4",
        (
            RegistrationStatus::Dropped,
            enrollment.student_id,
            enrollment.programme_unit_id,
            enrollment.semester_id,
        ),
    )?;

    info!(
        "Enrollment {} dropped ({} registration rows updated)",
        enrollment_id, mirrored
    );
    Ok(EnrollmentStatus::Dropped)
}

/// Offered units of the student's programme at the student's current year and
/// the semester's number
pub fn units_available_for_enrollment(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
) -> Result<Vec<DbProgrammeUnit>> {
    let student = load_student(conn, student_id)?;
    let semester = load_semester(conn, semester_id)?;
    offered_programme_units(
        conn,
        student.programme_id,
        student.current_year,
        semester.semester_number,
        semester.semester_id,
    )
}

pub fn enrollment_summary(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
) -> Result<EnrollmentSummary> {
    load_student(conn, student_id)?;
    let enrollments = enrollments_for_semester(conn, student_id, semester_id)?;

    let mut summary = EnrollmentSummary::default();
    for e in &enrollments {
        match e.status {
            EnrollmentStatus::Pending => summary.pending += 1,
            EnrollmentStatus::Approved => summary.approved += 1,
            EnrollmentStatus::Rejected => summary.rejected += 1,
            EnrollmentStatus::Dropped => summary.dropped += 1,
        }
        match e.enrollment_type {
            EnrollmentType::Normal => summary.normal += 1,
            EnrollmentType::Resit => summary.resit += 1,
            EnrollmentType::Retake => summary.retake += 1,
        }
    }
    summary.enrollments = enrollments;
    Ok(summary)
}
