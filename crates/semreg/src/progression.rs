//! Semester reporting: eligibility, next position and report decisions.
//!
//! A report is filed against a target semester with its eligibility,
//! financial and academic snapshots frozen at filing time. Approval is the
//! only thing that moves the student's current year and semester.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{FailureScope, PolicyConfig};
use crate::db::records::{
    fee_balance_for, load_programme, load_report, load_semester, load_student,
    report_for_semester, reports_for_student, results_for_student,
};
use crate::db::{DbProgramme, DbSemesterReport, DbSemesterResult, ReportStatus, SemesterNumber};
use crate::error::{on_unique, Result, ValidationError};
use crate::grading::gpa;

/// Outcome of the failed-units and fee checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub failed_units: u32,
    pub is_eligible: bool,
    pub remarks: String,
}

/// Where a student lands after progressing one semester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextPosition {
    pub year_of_study: u32,
    pub semester_number: SemesterNumber,
    /// Past the programme's final year
    pub beyond_programme: bool,
}

/// GPA and credit snapshot taken from the result ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcademicSnapshot {
    pub failed_units: u32,
    pub previous_semester_gpa: Option<Decimal>,
    pub cumulative_gpa: Option<Decimal>,
    pub credits_earned: u32,
}

/// Response to filing a report
#[derive(Debug, Clone, Serialize)]
pub struct FiledReport {
    pub report_id: i64,
    pub eligible: bool,
    pub message: String,
    pub status: ReportStatus,
    pub to_year_of_study: u32,
    pub to_semester_number: SemesterNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDecision {
    Approve,
    Reject,
    Defer,
}

impl ReportDecision {
    fn target(&self) -> ReportStatus {
        match self {
            ReportDecision::Approve => ReportStatus::Approved,
            ReportDecision::Reject => ReportStatus::Rejected,
            ReportDecision::Defer => ReportStatus::Deferred,
        }
    }
}

/// Applies the failed-units limit and, if configured, the fee clearance rule.
pub fn assess_eligibility(
    failed_units: u32,
    financially_cleared: bool,
    fee_balance: Decimal,
    policy: &PolicyConfig,
) -> Eligibility {
    let max_allowed = policy.max_failed_units;

    if failed_units > max_allowed {
        let reason = ValidationError::Ineligible {
            failed_units,
            max_allowed,
        };
        return Eligibility {
            failed_units,
            is_eligible: false,
            remarks: format!(
                "{reason} You must clear {} unit(s) through resit exams.",
                failed_units - max_allowed
            ),
        };
    }

    if policy.require_financial_clearance && !financially_cleared {
        return Eligibility {
            failed_units,
            is_eligible: false,
            remarks: ValidationError::NotFinanciallyCleared {
                balance: fee_balance,
            }
            .to_string(),
        };
    }

    Eligibility {
        failed_units,
        is_eligible: true,
        remarks: "Eligible to report for next semester".to_string(),
    }
}

/// Computes the next (year, semester) from the programme's semesters per year.
pub fn next_position(
    current_year: u32,
    current_semester: SemesterNumber,
    programme: &DbProgramme,
) -> NextPosition {
    let per_year = programme.semesters_per_year;
    let (year_of_study, semester_number) =
        match SemesterNumber::from_ordinal(current_semester.ordinal() + 1) {
            Some(next) if next.ordinal() <= per_year => (current_year, next),
            _ => (current_year + 1, SemesterNumber::First),
        };

    NextPosition {
        year_of_study,
        semester_number,
        beyond_programme: year_of_study > programme.duration_years,
    }
}

/// Builds the academic snapshot from a student's results, given oldest first.
pub fn academic_snapshot<D: Ord + Copy>(
    results: &[(DbSemesterResult, D)],
    scope: FailureScope,
) -> AcademicSnapshot {
    let latest = results.iter().map(|(_, start)| *start).max();
    let in_latest = |start: &D| Some(*start) == latest;

    let failed_units = results
        .iter()
        .filter(|(r, start)| {
            !r.is_passed
                && match scope {
                    FailureScope::AllSemesters => true,
                    FailureScope::LatestSemester => in_latest(start),
                }
        })
        .count() as u32;

    let previous_semester_gpa = gpa(results
        .iter()
        .filter(|(_, start)| in_latest(start))
        .map(|(r, _)| (r.grade_point, r.credit_hours)));

    let cumulative_gpa = gpa(results.iter().map(|(r, _)| (r.grade_point, r.credit_hours)));

    let credits_earned = results
        .iter()
        .filter(|(r, _)| r.is_passed)
        .map(|(r, _)| r.credit_hours)
        .sum();

    AcademicSnapshot {
        failed_units,
        previous_semester_gpa,
        cumulative_gpa,
        credits_earned,
    }
}

/// Evaluates eligibility and files a report for the target semester.
///
/// Ineligible reports are stored as `rejected` so the attempt is kept but
/// never blocks a later filing and can never be approved. A student in the
/// programme's final semester is ineligible.
pub fn file_report(
    conn: &Connection,
    policy: &PolicyConfig,
    student_id: i64,
    target_semester_id: i64,
    now: DateTime<Utc>,
) -> Result<FiledReport> {
    let student = load_student(conn, student_id)?;
    let semester = load_semester(conn, target_semester_id)?;

    let open = [ReportStatus::Pending, ReportStatus::Approved];
    if report_for_semester(conn, student_id, target_semester_id, &open)?.is_some() {
        warn!(
            "Student {} already reported for semester {}",
            student.registration_number, semester.name
        );
        return Err(ValidationError::DuplicateReport.into());
    }

    let programme = load_programme(conn, student.programme_id)?;
    let results = results_for_student(conn, student_id)?;
    let snapshot = academic_snapshot(&results, policy.failure_scope);

    let (fee_balance, financially_cleared) = match fee_balance_for(conn, student_id, target_semester_id)? {
        Some(fee) => (fee.balance(), fee.is_cleared()),
        None => (Decimal::ZERO, true),
    };

    let next = next_position(student.current_year, student.current_semester, &programme);
    let eligibility = if next.beyond_programme {
        Eligibility {
            failed_units: snapshot.failed_units,
            is_eligible: false,
            remarks: programme_completed(&programme).to_string(),
        }
    } else {
        assess_eligibility(snapshot.failed_units, financially_cleared, fee_balance, policy)
    };

    let (status, rejection_reason) = if eligibility.is_eligible {
        (ReportStatus::Pending, String::new())
    } else {
        (ReportStatus::Rejected, eligibility.remarks.clone())
    };

    conn.execute(
        "INSERT INTO semester_reports (
            student_id, to_academic_year_id, to_semester_id, from_year_of_study, to_year_of_study,
            from_semester_number, to_semester_number, failed_units_count, is_eligible,
            eligibility_checked_at, eligibility_remarks, fee_balance, is_financially_cleared,
            previous_semester_gpa, cumulative_gpa, total_credits_earned, status, rejection_reason,
            report_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        rusqlite::params![
            student_id,
            semester.academic_year_id,
            target_semester_id,
            student.current_year,
            next.year_of_study,
            student.current_semester,
            next.semester_number,
            eligibility.failed_units,
            eligibility.is_eligible,
            now,
            &eligibility.remarks,
            fee_balance.to_string(),
            financially_cleared,
            snapshot.previous_semester_gpa.map(|g| g.to_string()),
            snapshot.cumulative_gpa.map(|g| g.to_string()),
            snapshot.credits_earned,
            status,
            rejection_reason,
            now,
        ],
    )
    .map_err(|e| on_unique(e, ValidationError::DuplicateReport))?;
    let report_id = conn.last_insert_rowid();

    if eligibility.is_eligible {
        info!(
            "Filed report {} for {}: Y{}S{} -> Y{}S{}",
            report_id,
            student.registration_number,
            student.current_year,
            student.current_semester,
            next.year_of_study,
            next.semester_number
        );
    } else {
        warn!(
            "Filed ineligible report {} for {}: {}",
            report_id, student.registration_number, eligibility.remarks
        );
    }

    Ok(FiledReport {
        report_id,
        eligible: eligibility.is_eligible,
        message: eligibility.remarks,
        status,
        to_year_of_study: next.year_of_study,
        to_semester_number: next.semester_number,
    })
}

/// Approves, rejects or defers a pending report.
///
/// Approving an approved report is a no-op. Approval advances the student in
/// the same transaction.
pub fn decide_report(
    conn: &Connection,
    policy: &PolicyConfig,
    report_id: i64,
    decision: ReportDecision,
    decided_by: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ReportStatus> {
    let report = load_report(conn, report_id)?;
    let target = decision.target();

    if report.status == ReportStatus::Approved && target == ReportStatus::Approved {
        debug!("Report {} already approved, nothing to do", report_id);
        return Ok(ReportStatus::Approved);
    }

    if target == ReportStatus::Approved {
        let programme = programme_of_student(conn, report.student_id)?;
        if report.to_year_of_study > programme.duration_years {
            warn!(
                "Refusing to approve report {}: year {} is past programme {}",
                report_id, report.to_year_of_study, programme.code
            );
            return Err(programme_completed(&programme).into());
        }
        if !report.is_eligible {
            warn!("Refusing to approve ineligible report {}", report_id);
            return Err(ineligibility_of(&report, policy).into());
        }
    }

    if report.status != ReportStatus::Pending {
        return Err(ValidationError::InvalidTransition {
            entity: "semester report",
            id: report_id,
            from: report.status.to_string(),
            to: target.to_string(),
        }
        .into());
    }

    conn.execute(
        "UPDATE semester_reports
         SET status = ?1, decided_by = ?2, decision_date = ?3, rejection_reason = ?4
         WHERE report_id = ?5",
        (target, decided_by, now, reason.unwrap_or_default(), report_id),
    )?;

    if target == ReportStatus::Approved {
        conn.execute(
            "UPDATE students SET current_year = ?1, current_semester = ?2 WHERE student_id = ?3",
            (report.to_year_of_study, report.to_semester_number, report.student_id),
        )?;
        info!(
            "Report {} approved by {}; student {} advanced to Y{}S{}",
            report_id,
            decided_by,
            report.student_id,
            report.to_year_of_study,
            report.to_semester_number
        );
    } else {
        info!("Report {} {} by {}", report_id, target, decided_by);
    }

    Ok(target)
}

fn programme_completed(programme: &DbProgramme) -> ValidationError {
    ValidationError::ProgrammeCompleted {
        programme: programme.code.clone(),
        duration_years: programme.duration_years,
    }
}

fn programme_of_student(conn: &Connection, student_id: i64) -> Result<DbProgramme> {
    let student = load_student(conn, student_id)?;
    load_programme(conn, student.programme_id)
}

fn ineligibility_of(report: &DbSemesterReport, policy: &PolicyConfig) -> ValidationError {
    if report.failed_units_count > policy.max_failed_units {
        ValidationError::Ineligible {
            failed_units: report.failed_units_count,
            max_allowed: policy.max_failed_units,
        }
    } else {
        ValidationError::NotFinanciallyCleared {
            balance: report.fee_balance,
        }
    }
}

/// All reports of a student, newest first
pub fn progression_history(conn: &Connection, student_id: i64) -> Result<Vec<DbSemesterReport>> {
    load_student(conn, student_id)?;
    reports_for_student(conn, student_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::admin::{insert_programme, insert_student, upsert_fee_balance, NewProgramme};
    use crate::db::WorkflowDb;
    use crate::error::WorkflowError;
    use crate::fixtures::{campus, record_result};

    fn programme(semesters_per_year: u32, duration_years: u32) -> DbProgramme {
        DbProgramme {
            programme_id: 1,
            code: "BSC-CS".to_string(),
            name: "Computer Science".to_string(),
            duration_years,
            total_semesters: semesters_per_year * duration_years,
            semesters_per_year,
        }
    }

    fn result(semester_id: i64, grade_point: i64, credits: u32, passed: bool) -> DbSemesterResult {
        DbSemesterResult {
            result_id: 0,
            student_id: 1,
            programme_unit_id: 1,
            semester_id,
            total_marks: Decimal::from(50),
            grade: "C".to_string(),
            grade_point: Decimal::from(grade_point),
            credit_hours: credits,
            is_passed: passed,
            is_supplementary: false,
            remarks: String::new(),
        }
    }

    #[test]
    fn test_next_position_within_year() {
        let next = next_position(1, SemesterNumber::First, &programme(2, 4));
        assert_eq!(next.year_of_study, 1);
        assert_eq!(next.semester_number, SemesterNumber::Second);
        assert!(!next.beyond_programme);
    }

    #[test]
    fn test_next_position_rolls_over_year() {
        let next = next_position(1, SemesterNumber::Second, &programme(2, 4));
        assert_eq!((next.year_of_study, next.semester_number), (2, SemesterNumber::First));
    }

    #[test]
    fn test_next_position_tri_semester() {
        let prog = programme(3, 4);
        let next = next_position(2, SemesterNumber::Second, &prog);
        assert_eq!((next.year_of_study, next.semester_number), (2, SemesterNumber::Third));
        let next = next_position(2, SemesterNumber::Third, &prog);
        assert_eq!((next.year_of_study, next.semester_number), (3, SemesterNumber::First));
    }

    #[test]
    fn test_stored_field_beats_divisible_total() {
        // 6 total semesters over 3 years is divisible by 3 but runs 2 per year.
        let prog = DbProgramme {
            total_semesters: 6,
            ..programme(2, 3)
        };
        let next = next_position(1, SemesterNumber::Second, &prog);
        assert_eq!((next.year_of_study, next.semester_number), (2, SemesterNumber::First));
    }

    #[test]
    fn test_final_semester_goes_beyond_programme() {
        let next = next_position(4, SemesterNumber::Second, &programme(2, 4));
        assert!(next.beyond_programme);
    }

    #[test]
    fn test_three_failures_are_ineligible() {
        let e = assess_eligibility(3, true, Decimal::ZERO, &PolicyConfig::default());
        assert!(!e.is_eligible);
        assert!(e.remarks.contains("3 failed units"));
        assert!(e.remarks.contains("Maximum allowed is 2"));
        assert!(e.remarks.contains("clear 1 unit(s)"));
    }

    #[test]
    fn test_two_failures_are_eligible() {
        let e = assess_eligibility(2, true, Decimal::ZERO, &PolicyConfig::default());
        assert!(e.is_eligible);
    }

    #[test]
    fn test_fee_gate_only_when_configured() {
        let balance = Decimal::from(1500);
        assert!(assess_eligibility(0, false, balance, &PolicyConfig::default()).is_eligible);

        let strict = PolicyConfig {
            require_financial_clearance: true,
            ..PolicyConfig::default()
        };
        let e = assess_eligibility(0, false, balance, &strict);
        assert!(!e.is_eligible);
        assert!(e.remarks.contains("1500"));
    }

    #[test]
    fn test_snapshot_scopes_failures() {
        let results = vec![
            (result(1, 0, 3, false), 1),
            (result(1, 4, 3, true), 1),
            (result(2, 0, 3, false), 2),
            (result(2, 3, 3, true), 2),
        ];

        let all = academic_snapshot(&results, FailureScope::AllSemesters);
        assert_eq!(all.failed_units, 2);
        assert_eq!(all.credits_earned, 6);
        assert_eq!(all.previous_semester_gpa, Some(Decimal::new(150, 2)));
        assert_eq!(all.cumulative_gpa, Some(Decimal::new(175, 2)));

        let latest = academic_snapshot(&results, FailureScope::LatestSemester);
        assert_eq!(latest.failed_units, 1);
    }

    fn now() -> DateTime<Utc> {
        "2025-01-02T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_clean_record_files_and_advances() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            for pu in &campus.y1s1 {
                record_result(tx, campus.student_id, *pu, campus.sem1_id, 65);
            }

            let filed = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            assert!(filed.eligible);
            assert_eq!(filed.status, ReportStatus::Pending);
            assert_eq!((filed.to_year_of_study, filed.to_semester_number), (1, SemesterNumber::Second));

            let report = load_report(tx, filed.report_id)?;
            assert_eq!(report.total_credits_earned, 9);
            assert_eq!(report.cumulative_gpa, Some(Decimal::new(300, 2)));

            let status = decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "registrar", None, now())?;
            assert_eq!(status, ReportStatus::Approved);
            let student = load_student(tx, campus.student_id)?;
            assert_eq!((student.current_year, student.current_semester), (1, SemesterNumber::Second));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_second_filing_is_duplicate() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;

            let err = file_report(tx, &policy, campus.student_id, campus.sem2_id, now()).unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(ValidationError::DuplicateReport)));
            assert_eq!(progression_history(tx, campus.student_id)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ineligible_report_cannot_be_approved() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            for pu in &campus.y1s1 {
                record_result(tx, campus.student_id, *pu, campus.sem1_id, 30);
            }

            let filed = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            assert!(!filed.eligible);
            assert_eq!(filed.status, ReportStatus::Rejected);
            assert!(filed.message.contains("3 failed units"));

            let err = decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "registrar", None, now())
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(ValidationError::Ineligible { .. })));

            let student = load_student(tx, campus.student_id)?;
            assert_eq!((student.current_year, student.current_semester), (1, SemesterNumber::First));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_approving_twice_is_a_no_op() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            let filed = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "registrar", None, now())?;
            let again = decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "dean", None, now())?;
            assert_eq!(again, ReportStatus::Approved);

            let report = load_report(tx, filed.report_id)?;
            assert_eq!(report.decided_by.as_deref(), Some("registrar"));
            let student = load_student(tx, campus.student_id)?;
            assert_eq!((student.current_year, student.current_semester), (1, SemesterNumber::Second));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rejected_report_frees_the_semester() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            let first = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            decide_report(
                tx,
                &policy,
                first.report_id,
                ReportDecision::Reject,
                "registrar",
                Some("Wrong semester"),
                now(),
            )?;

            let err = decide_report(tx, &policy, first.report_id, ReportDecision::Approve, "registrar", None, now())
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Validation(ValidationError::InvalidTransition { .. })
            ));

            let second = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            assert_ne!(second.report_id, first.report_id);
            let history = progression_history(tx, campus.student_id)?;
            assert_eq!(history.len(), 2);
            assert_eq!(history[1].rejection_reason, "Wrong semester");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_fee_snapshot_and_clearance_gate() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            upsert_fee_balance(tx, campus.student_id, campus.sem2_id, Decimal::from(45000), Decimal::from(30000))?;
            let strict = PolicyConfig {
                require_financial_clearance: true,
                ..PolicyConfig::default()
            };

            let filed = file_report(tx, &strict, campus.student_id, campus.sem2_id, now())?;
            assert!(!filed.eligible);
            let report = load_report(tx, filed.report_id)?;
            assert_eq!(report.fee_balance, Decimal::from(15000));
            assert!(!report.is_financially_cleared);

            let err = decide_report(tx, &strict, filed.report_id, ReportDecision::Approve, "registrar", None, now())
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Validation(ValidationError::NotFinanciallyCleared { .. })
            ));

            upsert_fee_balance(tx, campus.student_id, campus.sem2_id, Decimal::from(45000), Decimal::from(45000))?;
            assert!(file_report(tx, &strict, campus.student_id, campus.sem2_id, now())?.eligible);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_final_semester_report_is_ineligible() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            let programme_id = insert_programme(
                tx,
                &NewProgramme {
                    code: "MBCHB".to_string(),
                    name: "Bachelor of Medicine and Surgery".to_string(),
                    duration_years: 7,
                    total_semesters: 14,
                    semesters_per_year: 2,
                },
            )?;
            let student_id = insert_student(tx, "MED/007/2018", programme_id, 7, SemesterNumber::Second)?;

            let filed = file_report(tx, &policy, student_id, campus.sem2_id, now())?;
            assert!(!filed.eligible);
            assert_eq!(filed.status, ReportStatus::Rejected);
            assert!(filed.message.contains("MBCHB completed"));
            assert_eq!(load_report(tx, filed.report_id)?.rejection_reason, filed.message);

            let err = decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "registrar", None, now())
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Validation(ValidationError::ProgrammeCompleted { duration_years: 7, .. })
            ));
            let student = load_student(tx, student_id)?;
            assert_eq!((student.current_year, student.current_semester), (7, SemesterNumber::Second));

            // The rejected filing does not block another attempt.
            assert!(!file_report(tx, &policy, student_id, campus.sem2_id, now())?.eligible);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_pending_report_past_shortened_programme() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let campus = campus(tx);
            let policy = PolicyConfig::default();
            tx.execute(
                "UPDATE students SET current_semester = '2' WHERE student_id = ?1",
                [campus.student_id],
            )?;
            let filed = file_report(tx, &policy, campus.student_id, campus.sem2_id, now())?;
            assert!(filed.eligible);
            assert_eq!((filed.to_year_of_study, filed.to_semester_number), (2, SemesterNumber::First));

            tx.execute(
                "UPDATE programmes SET duration_years = 1, total_semesters = 2 WHERE programme_id = ?1",
                [campus.programme_id],
            )?;
            let err = decide_report(tx, &policy, filed.report_id, ReportDecision::Approve, "registrar", None, now())
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Validation(ValidationError::ProgrammeCompleted { duration_years: 1, .. })
            ));
            assert_eq!(load_report(tx, filed.report_id)?.status, ReportStatus::Pending);
            let student = load_student(tx, campus.student_id)?;
            assert_eq!((student.current_year, student.current_semester), (1, SemesterNumber::Second));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_student_is_not_found() {
        let db = WorkflowDb::open_in_memory().unwrap();
        let err = db
            .transaction(|tx| {
                let campus = campus(tx);
                file_report(tx, &PolicyConfig::default(), 999, campus.sem2_id, now())
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_snapshot_without_results() {
        let snapshot = academic_snapshot::<i32>(&[], FailureScope::AllSemesters);
        assert_eq!(snapshot.failed_units, 0);
        assert_eq!(snapshot.cumulative_gpa, None);
    }
}
