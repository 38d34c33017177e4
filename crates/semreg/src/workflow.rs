//! The workflow service: every operation runs in its own transaction.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::calendar::{self, CurrentTerm, WindowStatus};
use crate::config::{PolicyConfig, WorkflowConfig};
use crate::db::{
    DbAcademicYear, DbProgrammeUnit, DbResitExam, DbSemester, DbSemesterReport, EnrollmentStatus,
    ReportStatus, WorkflowDb,
};
use crate::enrollment::{
    self, EnrollmentDecision, EnrollmentReceipt, EnrollmentRequest, EnrollmentSummary,
};
use crate::error::Result;
use crate::grading::GradeOutcome;
use crate::progression::{self, FiledReport, ReportDecision};
use crate::resit::{self, ResitCandidate, ResitReceipt};

pub struct Workflow {
    db: WorkflowDb,
    policy: PolicyConfig,
}

impl Workflow {
    pub fn new(db: WorkflowDb, policy: PolicyConfig) -> Self {
        Self { db, policy }
    }

    /// Opens the configured database file
    pub fn open(config: &WorkflowConfig) -> Result<Self> {
        let db = WorkflowDb::open(&config.database_path)?;
        Ok(Self::new(db, config.policy.clone()))
    }

    /// Direct access to the store, for seeding and reporting
    pub fn db(&self) -> &WorkflowDb {
        &self.db
    }

    // Progression

    /// Files a semester report. An ineligible student still gets a report
    /// row, returned with `eligible = false` and the reason in `message`.
    pub fn file_semester_report(&self, student_id: i64, target_semester_id: i64) -> Result<FiledReport> {
        self.db.transaction(|tx| {
            progression::file_report(tx, &self.policy, student_id, target_semester_id, Utc::now())
        })
    }

    pub fn decide_semester_report(
        &self,
        report_id: i64,
        decision: ReportDecision,
        decided_by: &str,
        reason: Option<&str>,
    ) -> Result<ReportStatus> {
        self.db.transaction(|tx| {
            progression::decide_report(
                tx,
                &self.policy,
                report_id,
                decision,
                decided_by,
                reason,
                Utc::now(),
            )
        })
    }

    pub fn progression_history(&self, student_id: i64) -> Result<Vec<DbSemesterReport>> {
        self.db
            .read(|conn| progression::progression_history(conn, student_id))
    }

    // Enrollment

    pub fn enroll_unit(&self, request: &EnrollmentRequest) -> Result<EnrollmentReceipt> {
        self.db
            .transaction(|tx| enrollment::enroll(tx, request, Utc::now()))
    }

    pub fn decide_enrollment(
        &self,
        enrollment_id: i64,
        decision: EnrollmentDecision,
        decided_by: &str,
        reason: Option<&str>,
    ) -> Result<EnrollmentStatus> {
        self.db.transaction(|tx| {
            enrollment::decide_enrollment(tx, enrollment_id, decision, decided_by, reason, Utc::now())
        })
    }

    pub fn drop_enrollment(&self, enrollment_id: i64) -> Result<EnrollmentStatus> {
        self.db
            .transaction(|tx| enrollment::drop_enrollment(tx, enrollment_id, Utc::now()))
    }

    pub fn units_available_for_enrollment(
        &self,
        student_id: i64,
        semester_id: i64,
    ) -> Result<Vec<DbProgrammeUnit>> {
        self.db.read(|conn| {
            enrollment::units_available_for_enrollment(conn, student_id, semester_id)
        })
    }

    pub fn enrollment_summary(&self, student_id: i64, semester_id: i64) -> Result<EnrollmentSummary> {
        self.db
            .read(|conn| enrollment::enrollment_summary(conn, student_id, semester_id))
    }

    // Resits

    /// Registers a resit. `fee` falls back to the configured default.
    pub fn register_resit(
        &self,
        student_id: i64,
        semester_result_id: i64,
        resit_semester_id: i64,
        fee: Option<Decimal>,
    ) -> Result<ResitReceipt> {
        self.db.transaction(|tx| {
            resit::register_resit(
                tx,
                &self.policy,
                student_id,
                semester_result_id,
                resit_semester_id,
                fee,
                Utc::now(),
            )
        })
    }

    pub fn approve_resit(&self, resit_id: i64, decided_by: &str) -> Result<DbResitExam> {
        self.db
            .transaction(|tx| resit::approve_resit(tx, resit_id, decided_by, Utc::now()))
    }

    pub fn reject_resit(&self, resit_id: i64, decided_by: &str) -> Result<DbResitExam> {
        self.db
            .transaction(|tx| resit::reject_resit(tx, resit_id, decided_by, Utc::now()))
    }

    pub fn mark_resit_missed(&self, resit_id: i64) -> Result<DbResitExam> {
        self.db
            .transaction(|tx| resit::mark_resit_missed(tx, resit_id, Utc::now()))
    }

    pub fn record_resit_payment(&self, resit_id: i64, reference: &str) -> Result<DbResitExam> {
        self.db
            .transaction(|tx| resit::record_resit_payment(tx, resit_id, reference, Utc::now()))
    }

    pub fn complete_resit(&self, resit_id: i64, marks: Decimal, marked_by: &str) -> Result<GradeOutcome> {
        self.db.transaction(|tx| {
            resit::complete_resit(tx, &self.policy, resit_id, marks, marked_by, Utc::now())
        })
    }

    pub fn failed_units_for_resit(&self, student_id: i64, semester_id: i64) -> Result<Vec<ResitCandidate>> {
        self.db
            .read(|conn| resit::failed_units_for_resit(conn, student_id, semester_id))
    }

    // Calendar

    pub fn current_term(&self) -> Result<CurrentTerm> {
        self.db.read(calendar::current_term)
    }

    pub fn set_current_semester(&self, semester_id: i64) -> Result<DbSemester> {
        self.db
            .transaction(|tx| calendar::set_current_semester(tx, semester_id))
    }

    pub fn set_current_academic_year(&self, academic_year_id: i64) -> Result<DbAcademicYear> {
        self.db
            .transaction(|tx| calendar::set_current_academic_year(tx, academic_year_id))
    }

    pub fn enrollment_window(&self, semester_id: i64) -> Result<WindowStatus> {
        self.db
            .read(|conn| calendar::enrollment_window(conn, semester_id, Utc::now()))
    }

    pub fn auto_create_enrollment_periods(&self) -> Result<Vec<i64>> {
        self.db.transaction(|tx| calendar::auto_create_enrollment_periods(tx))
    }
}
