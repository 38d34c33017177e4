//! Inserts for the catalogue, calendar and ledger tables.
//!
//! The workflow only reads these tables; they are filled by the admin side of
//! the portal. These helpers are what seeding and the tests use.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::types::{AllocationStatus, SemesterNumber};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct NewSemester {
    pub academic_year_id: i64,
    pub name: String,
    pub semester_number: SemesterNumber,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_start_date: NaiveDate,
    pub registration_end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewProgramme {
    pub code: String,
    pub name: String,
    pub duration_years: u32,
    pub total_semesters: u32,
    pub semesters_per_year: u32,
}

#[derive(Debug, Clone)]
pub struct NewGradeBand {
    pub grade: String,
    pub min_marks: Decimal,
    pub max_marks: Decimal,
    pub grade_point: Decimal,
    pub is_pass: bool,
}

#[derive(Debug, Clone)]
pub struct NewResult {
    pub student_id: i64,
    pub programme_unit_id: i64,
    pub semester_id: i64,
    pub total_marks: Decimal,
    pub grade: String,
    pub grade_point: Decimal,
    pub credit_hours: u32,
    pub is_passed: bool,
}

pub fn insert_academic_year(
    conn: &Connection,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO academic_years (name, start_date, end_date) VALUES (?1, ?2, ?3)",
        (name, start_date, end_date),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_semester(conn: &Connection, semester: &NewSemester) -> Result<i64> {
    conn.execute(
        "INSERT INTO semesters (
            academic_year_id, name, semester_number, start_date, end_date,
            registration_start_date, registration_end_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            semester.academic_year_id,
            &semester.name,
            semester.semester_number,
            semester.start_date,
            semester.end_date,
            semester.registration_start_date,
            semester.registration_end_date,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_programme(conn: &Connection, programme: &NewProgramme) -> Result<i64> {
    conn.execute(
        "INSERT INTO programmes (code, name, duration_years, total_semesters, semesters_per_year)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &programme.code,
            &programme.name,
            programme.duration_years,
            programme.total_semesters,
            programme.semesters_per_year,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_unit(conn: &Connection, code: &str, name: &str, credit_hours: u32) -> Result<i64> {
    conn.execute(
        "INSERT INTO units (code, name, credit_hours) VALUES (?1, ?2, ?3)",
        (code, name, credit_hours),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_programme_unit(
    conn: &Connection,
    programme_id: i64,
    unit_id: i64,
    academic_year_id: i64,
    year_of_study: u32,
    semester_number: SemesterNumber,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO programme_units (
            programme_id, unit_id, academic_year_id, year_of_study, semester_number
        ) VALUES (?1, ?2, ?3, ?4, ?5)",
        (programme_id, unit_id, academic_year_id, year_of_study, semester_number),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_grade_bands(conn: &Connection, unit_id: i64, bands: &[NewGradeBand]) -> Result<()> {
    for band in bands {
        conn.execute(
            "INSERT INTO unit_grading_systems (unit_id, grade, min_marks, max_marks, grade_point, is_pass)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                unit_id,
                &band.grade,
                band.min_marks.to_string(),
                band.max_marks.to_string(),
                band.grade_point.to_string(),
                band.is_pass,
            ),
        )?;
    }
    Ok(())
}

pub fn insert_allocation(
    conn: &Connection,
    programme_unit_id: i64,
    semester_id: i64,
    lecturer: &str,
    status: AllocationStatus,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO unit_allocations (programme_unit_id, semester_id, lecturer, status)
         VALUES (?1, ?2, ?3, ?4)",
        (programme_unit_id, semester_id, lecturer, status),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_student(
    conn: &Connection,
    registration_number: &str,
    programme_id: i64,
    current_year: u32,
    current_semester: SemesterNumber,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO students (registration_number, programme_id, current_year, current_semester)
         VALUES (?1, ?2, ?3, ?4)",
        (registration_number, programme_id, current_year, current_semester),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_result(conn: &Connection, result: &NewResult) -> Result<i64> {
    conn.execute(
        "INSERT INTO semester_results (
            student_id, programme_unit_id, semester_id, total_marks, grade, grade_point,
            credit_hours, is_passed, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            result.student_id,
            result.programme_unit_id,
            result.semester_id,
            result.total_marks.to_string(),
            &result.grade,
            result.grade_point.to_string(),
            result.credit_hours,
            result.is_passed,
            Utc::now(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts or replaces the fee balance of a student for a semester
pub fn upsert_fee_balance(
    conn: &Connection,
    student_id: i64,
    semester_id: i64,
    total_fees: Decimal,
    amount_paid: Decimal,
) -> Result<()> {
    conn.execute(
        "INSERT INTO fee_balances (student_id, semester_id, total_fees, amount_paid)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (student_id, semester_id)
         DO UPDATE SET total_fees = excluded.total_fees, amount_paid = excluded.amount_paid",
        (
            student_id,
            semester_id,
            total_fees.to_string(),
            amount_paid.to_string(),
        ),
    )?;
    Ok(())
}
