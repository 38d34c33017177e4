//! Row loaders shared by the engines.
//!
//! Every function takes a plain `&Connection` so it can run on either a
//! transaction (which derefs to one) or a read lock.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use super::types::*;
use super::{decimal_at, opt_decimal_at};
use crate::error::{Result, WorkflowError};

const SEMESTER_COLUMNS: &str = "semester_id, academic_year_id, name, semester_number, start_date, end_date,
     registration_start_date, registration_end_date, is_active";

const PROGRAMME_UNIT_COLUMNS: &str = "pu.programme_unit_id, pu.programme_id, pu.unit_id, u.code, u.name,
     u.credit_hours, pu.academic_year_id, pu.year_of_study, pu.semester_number, pu.is_active";

const RESULT_COLUMNS: &str = "result_id, student_id, programme_unit_id, semester_id, total_marks, grade,
     grade_point, credit_hours, is_passed, is_supplementary, remarks";

const REPORT_COLUMNS: &str = "report_id, student_id, to_academic_year_id, to_semester_id,
     from_year_of_study, to_year_of_study, from_semester_number, to_semester_number,
     failed_units_count, is_eligible, eligibility_checked_at, eligibility_remarks, fee_balance,
     is_financially_cleared, previous_semester_gpa, cumulative_gpa, total_credits_earned, status,
     decided_by, decision_date, rejection_reason, report_date";

const ENROLLMENT_COLUMNS: &str = "enrollment_id, student_id, report_id, programme_unit_id, semester_id,
     enrollment_type, status, resit_exam_id, decided_by, decision_date, rejection_reason,
     enrollment_date";

const RESIT_COLUMNS: &str = "resit_id, student_id, original_result_id, resit_semester_id,
     original_semester_id, original_marks, original_grade, original_grade_point, resit_marks,
     resit_grade, resit_grade_point, resit_fee_amount, fee_paid, payment_reference, payment_date,
     status, decided_by, decision_date, marked_by, marking_date, registration_date";

fn semester_from_row(row: &Row<'_>) -> rusqlite::Result<DbSemester> {
    Ok(DbSemester {
        semester_id: row.get(0)?,
        academic_year_id: row.get(1)?,
        name: row.get(2)?,
        semester_number: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        registration_start_date: row.get(6)?,
        registration_end_date: row.get(7)?,
        is_active: row.get(8)?,
    })
}

fn programme_unit_from_row(row: &Row<'_>) -> rusqlite::Result<DbProgrammeUnit> {
    Ok(DbProgrammeUnit {
        programme_unit_id: row.get(0)?,
        programme_id: row.get(1)?,
        unit_id: row.get(2)?,
        unit_code: row.get(3)?,
        unit_name: row.get(4)?,
        credit_hours: row.get(5)?,
        academic_year_id: row.get(6)?,
        year_of_study: row.get(7)?,
        semester_number: row.get(8)?,
        is_active: row.get(9)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<DbSemesterResult> {
    Ok(DbSemesterResult {
        result_id: row.get(0)?,
        student_id: row.get(1)?,
        programme_unit_id: row.get(2)?,
        semester_id: row.get(3)?,
        total_marks: decimal_at(row, 4)?,
        grade: row.get(5)?,
        grade_point: decimal_at(row, 6)?,
        credit_hours: row.get(7)?,
        is_passed: row.get(8)?,
        is_supplementary: row.get(9)?,
        remarks: row.get(10)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<DbSemesterReport> {
    Ok(DbSemesterReport {
        report_id: row.get(0)?,
        student_id: row.get(1)?,
        to_academic_year_id: row.get(2)?,
        to_semester_id: row.get(3)?,
        from_year_of_study: row.get(4)?,
        to_year_of_study: row.get(5)?,
        from_semester_number: row.get(6)?,
        to_semester_number: row.get(7)?,
        failed_units_count: row.get(8)?,
        is_eligible: row.get(9)?,
        eligibility_checked_at: row.get(10)?,
        eligibility_remarks: row.get(11)?,
        fee_balance: decimal_at(row, 12)?,
        is_financially_cleared: row.get(13)?,
        previous_semester_gpa: opt_decimal_at(row, 14)?,
        cumulative_gpa: opt_decimal_at(row, 15)?,
        total_credits_earned: row.get(16)?,
        status: row.get(17)?,
        decided_by: row.get(18)?,
        decision_date: row.get(19)?,
        rejection_reason: row.get(20)?,
        report_date: row.get(21)?,
    })
}

fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<DbUnitEnrollment> {
    Ok(DbUnitEnrollment {
        enrollment_id: row.get(0)?,
        student_id: row.get(1)?,
        report_id: row.get(2)?,
        programme_unit_id: row.get(3)?,
        semester_id: row.get(4)?,
        enrollment_type: row.get(5)?,
        status: row.get(6)?,
        resit_exam_id: row.get(7)?,
        decided_by: row.get(8)?,
        decision_date: row.get(9)?,
        rejection_reason: row.get(10)?,
        enrollment_date: row.get(11)?,
    })
}

fn resit_from_row(row: &Row<'_>) -> rusqlite::Result<DbResitExam> {
    Ok(DbResitExam {
        resit_id: row.get(0)?,
        student_id: row.get(1)?,
        original_result_id: row.get(2)?,
        resit_semester_id: row.get(3)?,
        original_semester_id: row.get(4)?,
        original_marks: decimal_at(row, 5)?,
        original_grade: row.get(6)?,
        original_grade_point: decimal_at(row, 7)?,
        resit_marks: opt_decimal_at(row, 8)?,
        resit_grade: row.get(9)?,
        resit_grade_point: opt_decimal_at(row, 10)?,
        resit_fee_amount: decimal_at(row, 11)?,
        fee_paid: row.get(12)?,
        payment_reference: row.get(13)?,
        payment_date: row.get(14)?,
        status: row.get(15)?,
        decided_by: row.get(16)?,
        decision_date: row.get(17)?,
        marked_by: row.get(18)?,
        marking_date: row.get(19)?,
        registration_date: row.get(20)?,
    })
}

fn required<T>(value: Option<T>, entity: &'static str, id: i64) -> Result<T> {
    value.ok_or_else(|| WorkflowError::not_found(entity, id))
}

pub fn load_academic_year(conn: &Connection, academic_year_id: i64) -> Result<DbAcademicYear> {
    let year = conn
        .query_row(
            "SELECT academic_year_id, name, start_date, end_date, is_active
             FROM academic_years WHERE academic_year_id = ?",
            [academic_year_id],
            |row| {
                Ok(DbAcademicYear {
                    academic_year_id: row.get(0)?,
                    name: row.get(1)?,
                    start_date: row.get(2)?,
                    end_date: row.get(3)?,
                    is_active: row.get(4)?,
                })
            },
        )
        .optional()?;
    required(year, "academic year", academic_year_id)
}

pub fn load_semester(conn: &Connection, semester_id: i64) -> Result<DbSemester> {
    let semester = conn
        .query_row(
            &format!("SELECT {SEMESTER_COLUMNS} FROM semesters WHERE semester_id = ?"),
            [semester_id],
            semester_from_row,
        )
        .optional()?;
    required(semester, "semester", semester_id)
}

/// Active semesters ordered by start date
pub fn active_semesters(conn: &Connection) -> Result<Vec<DbSemester>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SEMESTER_COLUMNS} FROM semesters WHERE is_active = 1 ORDER BY start_date"
    ))?;
    let semesters = stmt
        .query_map([], semester_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(semesters)
}

pub fn load_programme(conn: &Connection, programme_id: i64) -> Result<DbProgramme> {
    let programme = conn
        .query_row(
            "SELECT programme_id, code, name, duration_years, total_semesters, semesters_per_year
             FROM programmes WHERE programme_id = ?",
            [programme_id],
            |row| {
                Ok(DbProgramme {
                    programme_id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    duration_years: row.get(3)?,
                    total_semesters: row.get(4)?,
                    semesters_per_year: row.get(5)?,
                })
            },
        )
        .optional()?;
    required(programme, "programme", programme_id)
}

pub fn load_programme_unit(conn: &Connection, programme_unit_id: i64) -> Result<DbProgrammeUnit> {
    let unit = conn
        .query_row(
            &format!(
                "SELECT {PROGRAMME_UNIT_COLUMNS}
                 FROM programme_units pu JOIN units u ON u.unit_id = pu.unit_id
                 WHERE pu.programme_unit_id = ?"
            ),
            [programme_unit_id],
            programme_unit_from_row,
        )
        .optional()?;
    required(unit, "programme unit", programme_unit_id)
}

/// Active programme units of a programme at a year/semester, catalogued for
/// the academic year of `semester_id` and with a dean-approved allocation in it
pub fn offered_programme_units(
    conn: &Connection,
    programme_id: i64,
    year_of_study: u32,
    semester_number: SemesterNumber,
    semester_id: i64,
) -> Result<Vec<DbProgrammeUnit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROGRAMME_UNIT_COLUMNS}
         FROM programme_units pu JOIN units u ON u.unit_id = pu.unit_id
         WHERE pu.programme_id = ?1 AND pu.year_of_study = ?2 AND pu.semester_number = ?3
           AND pu.is_active = 1
           AND pu.academic_year_id = (SELECT academic_year_id FROM semesters WHERE semester_id = ?4)
           AND EXISTS (SELECT 1 FROM unit_allocations a
                       WHERE a.programme_unit_id = pu.programme_unit_id
                         AND a.semester_id = ?4 AND a.status = 'approved_dean')
         ORDER BY u.code"
    ))?;
    let units = stmt
        .query_map(
            (programme_id, year_of_study, semester_number, semester_id),
            programme_unit_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(units)
}

pub fn load_student(conn: &Connection, student_id: i64) -> Result<DbStudent> {
    let student = conn
        .query_row(
            "SELECT student_id, registration_number, programme_id, current_year, current_semester
             FROM students WHERE student_id = ?",
            [student_id],
            |row| {
                Ok(DbStudent {
                    student_id: row.get(0)?,
                    registration_number: row.get(1)?,
                    programme_id: row.get(2)?,
                    current_year: row.get(3)?,
                    current_semester: row.get(4)?,
                })
            },
        )
        .optional()?;
    required(student, "student", student_id)
}

/// Checks whether a programme unit has a dean-approved allocation in a semester
pub fn is_unit_offered(conn: &Connection, programme_unit_id: i64, semester_id: i64) -> Result<bool> {
    let offered = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM unit_allocations
                        WHERE programme_unit_id = ?1 AND semester_id = ?2 AND status = ?3)",
        (programme_unit_id, semester_id, AllocationStatus::ApprovedDean),
        |row| row.get(0),
    )?;
    Ok(offered)
}

/// Grading bands of a unit, highest band first
pub fn grade_bands_for_unit(conn: &Connection, unit_id: i64) -> Result<Vec<DbGradeBand>> {
    let mut stmt = conn.prepare(
        "SELECT grading_id, unit_id, grade, min_marks, max_marks, grade_point, is_pass
         FROM unit_grading_systems WHERE unit_id = ?",
    )?;
    let mut bands = stmt
        .query_map([unit_id], |row| {
            Ok(DbGradeBand {
                grading_id: row.get(0)?,
                unit_id: row.get(1)?,
                grade: row.get(2)?,
                min_marks: decimal_at(row, 3)?,
                max_marks: decimal_at(row, 4)?,
                grade_point: decimal_at(row, 5)?,
                is_pass: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    // Stored as TEXT, so order numerically here rather than in SQL.
    bands.sort_by(|a, b| b.min_marks.cmp(&a.min_marks));
    Ok(bands)
}

pub fn load_result(conn: &Connection, result_id: i64) -> Result<DbSemesterResult> {
    let result = conn
        .query_row(
            &format!("SELECT {RESULT_COLUMNS} FROM semester_results WHERE result_id = ?"),
            [result_id],
            result_from_row,
        )
        .optional()?;
    required(result, "semester result", result_id)
}

/// All results of a student with their semester's start date, oldest first
pub fn results_for_student(
    conn: &Connection,
    student_id: i64,
) -> Result<Vec<(DbSemesterResult, NaiveDate)>> {
    let mut stmt = conn.prepare(
        "SELECT r.result_id, r.student_id, r.programme_unit_id, r.semester_id, r.total_marks,
                r.grade, r.grade_point, r.credit_hours, r.is_passed, r.is_supplementary, r.remarks,
                s.start_date
         FROM semester_results r JOIN semesters s ON s.semester_id = r.semester_id
         WHERE r.student_id = ?
         ORDER BY s.start_date, r.result_id",
    )?;
    let results = stmt
        .query_map([student_id], |row| {
            let start_date: NaiveDate = row.get(11)?;
            Ok((result_from_row(row)?, start_date))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(results)
}

/// Most recent failed result of a student for a programme unit, if any
pub fn failed_result_for_unit(
    conn: &Connection,
    student_id: i64,
    programme_unit_id: i64,
) -> Result<Option<DbSemesterResult>> {
    let result = conn
        .query_row(
            &format!(
                "SELECT {RESULT_COLUMNS} FROM semester_results
                 WHERE student_id = ?1 AND programme_unit_id = ?2 AND is_passed = 0
                 ORDER BY result_id DESC LIMIT 1"
            ),
            (student_id, programme_unit_id),
            result_from_row,
        )
        .optional()?;
    Ok(result)
}

/// Failed results of a student, oldest first
pub fn failed_results(conn: &Connection, student_id: i64) -> Result<Vec<DbSemesterResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM semester_results
         WHERE student_id = ? AND is_passed = 0 ORDER BY result_id"
    ))?;
    let results = stmt
        .query_map([student_id], result_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(results)
}

pub fn fee_balance_for(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
) -> Result<Option<DbFeeBalance>> {
    let fee = conn
        .query_row(
            "SELECT student_id, semester_id, total_fees, amount_paid
             FROM fee_balances WHERE student_id = ?1 AND semester_id = ?2",
            (student_id, semester_id),
            |row| {
                Ok(DbFeeBalance {
                    student_id: row.get(0)?,
                    semester_id: row.get(1)?,
                    total_fees: decimal_at(row, 2)?,
                    amount_paid: decimal_at(row, 3)?,
                })
            },
        )
        .optional()?;
    Ok(fee)
}

pub fn load_report(conn: &Connection, report_id: i64) -> Result<DbSemesterReport> {
    let report = conn
        .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM semester_reports WHERE report_id = ?"),
            [report_id],
            report_from_row,
        )
        .optional()?;
    required(report, "semester report", report_id)
}

/// The student's report for a semester in one of the given statuses
pub fn report_for_semester(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
    statuses: &[ReportStatus],
) -> Result<Option<DbSemesterReport>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM semester_reports
         WHERE student_id = ?1 AND to_semester_id = ?2
         ORDER BY report_date DESC, report_id DESC"
    ))?;
    let reports = stmt
        .query_map((student_id, semester_id), report_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reports.into_iter().find(|r| statuses.contains(&r.status)))
}

/// All reports of a student, newest first
pub fn reports_for_student(conn: &Connection, student_id: i64) -> Result<Vec<DbSemesterReport>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM semester_reports
         WHERE student_id = ? ORDER BY report_date DESC, report_id DESC"
    ))?;
    let reports = stmt
        .query_map([student_id], report_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reports)
}

pub fn load_enrollment(conn: &Connection, enrollment_id: i64) -> Result<DbUnitEnrollment> {
    let enrollment = conn
        .query_row(
            &format!("SELECT {ENROLLMENT_COLUMNS} FROM unit_enrollments WHERE enrollment_id = ?"),
            [enrollment_id],
            enrollment_from_row,
        )
        .optional()?;
    required(enrollment, "unit enrollment", enrollment_id)
}

/// Pending or approved enrollment of a student in a unit for a semester
pub fn open_enrollment(
    conn: &Connection,
    student_id: i64,
    programme_unit_id: i64,
    semester_id: i64,
) -> Result<Option<DbUnitEnrollment>> {
    let enrollment = conn
        .query_row(
            &format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM unit_enrollments
                 WHERE student_id = ?1 AND programme_unit_id = ?2 AND semester_id = ?3
                   AND status IN ('pending', 'approved')"
            ),
            (student_id, programme_unit_id, semester_id),
            enrollment_from_row,
        )
        .optional()?;
    Ok(enrollment)
}

pub fn enrollments_for_semester(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
) -> Result<Vec<DbUnitEnrollment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM unit_enrollments
         WHERE student_id = ?1 AND semester_id = ?2 ORDER BY enrollment_id"
    ))?;
    let enrollments = stmt
        .query_map((student_id, semester_id), enrollment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(enrollments)
}

/// Enrollment linked to a resit exam, if any
pub fn enrollment_for_resit(conn: &Connection, resit_id: i64) -> Result<Option<DbUnitEnrollment>> {
    let enrollment = conn
        .query_row(
            &format!("SELECT {ENROLLMENT_COLUMNS} FROM unit_enrollments WHERE resit_exam_id = ?"),
            [resit_id],
            enrollment_from_row,
        )
        .optional()?;
    Ok(enrollment)
}

pub fn registration_for(
    conn: &Connection,
    student_id: i64,
    programme_unit_id: i64,
    semester_id: i64,
) -> Result<Option<DbUnitRegistration>> {
    let registration = conn
        .query_row(
            "SELECT registration_id, student_id, programme_unit_id, semester_id, status, is_retake,
                    approved_by
             FROM unit_registrations
             WHERE student_id = ?1 AND programme_unit_id = ?2 AND semester_id = ?3",
            (student_id, programme_unit_id, semester_id),
            |row| {
                Ok(DbUnitRegistration {
                    registration_id: row.get(0)?,
                    student_id: row.get(1)?,
                    programme_unit_id: row.get(2)?,
                    semester_id: row.get(3)?,
                    status: row.get(4)?,
                    is_retake: row.get(5)?,
                    approved_by: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(registration)
}

pub fn load_resit(conn: &Connection, resit_id: i64) -> Result<DbResitExam> {
    let resit = conn
        .query_row(
            &format!("SELECT {RESIT_COLUMNS} FROM resit_exams WHERE resit_id = ?"),
            [resit_id],
            resit_from_row,
        )
        .optional()?;
    required(resit, "resit exam", resit_id)
}

/// Checks whether a resit is already registered for a (student, result, semester) triple
pub fn resit_registered(
    conn: &Connection,
    student_id: i64,
    original_result_id: i64,
    resit_semester_id: i64,
) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM resit_exams
                        WHERE student_id = ?1 AND original_result_id = ?2 AND resit_semester_id = ?3)",
        (student_id, original_result_id, resit_semester_id),
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn enrollment_period_for(
    conn: &Connection,
    semester_id: i64,
) -> Result<Option<DbEnrollmentPeriod>> {
    let period = conn
        .query_row(
            "SELECT enrollment_period_id, semester_id, start_date, end_date, resit_start_date,
                    resit_end_date, is_active
             FROM enrollment_periods WHERE semester_id = ?",
            [semester_id],
            |row| {
                Ok(DbEnrollmentPeriod {
                    enrollment_period_id: row.get(0)?,
                    semester_id: row.get(1)?,
                    start_date: row.get(2)?,
                    end_date: row.get(3)?,
                    resit_start_date: row.get(4)?,
                    resit_end_date: row.get(5)?,
                    is_active: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(period)
}
