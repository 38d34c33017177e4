//! Database row types and the status enums stored as TEXT columns

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unknown variant text read from a status column.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Declares a string-backed enum with TEXT column and serde support.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum!(
    /// Semester number within a year of study
    SemesterNumber, "semester number" {
        First => "1",
        Second => "2",
        Third => "3",
    }
);

impl SemesterNumber {
    pub fn ordinal(&self) -> u32 {
        match self {
            SemesterNumber::First => 1,
            SemesterNumber::Second => 2,
            SemesterNumber::Third => 3,
        }
    }

    pub fn from_ordinal(n: u32) -> Option<Self> {
        match n {
            1 => Some(SemesterNumber::First),
            2 => Some(SemesterNumber::Second),
            3 => Some(SemesterNumber::Third),
            _ => None,
        }
    }
}

text_enum!(
    /// Lecturer allocation approval chain
    AllocationStatus, "allocation status" {
        Pending => "pending",
        ApprovedHod => "approved_hod",
        ApprovedHos => "approved_hos",
        ApprovedDean => "approved_dean",
        Rejected => "rejected",
    }
);

text_enum!(
    ReportStatus, "report status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Deferred => "deferred",
    }
);

text_enum!(
    EnrollmentType, "enrollment type" {
        Normal => "normal",
        Resit => "resit",
        Retake => "retake",
    }
);

impl EnrollmentType {
    pub fn is_retake(&self) -> bool {
        matches!(self, EnrollmentType::Resit | EnrollmentType::Retake)
    }
}

text_enum!(
    EnrollmentStatus, "enrollment status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Dropped => "dropped",
    }
);

text_enum!(
    RegistrationStatus, "registration status" {
        Registered => "registered",
        Dropped => "dropped",
    }
);

text_enum!(
    ResitStatus, "resit status" {
        Registered => "registered",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
        Missed => "missed",
    }
);

#[derive(Debug, Clone, Serialize)]
pub struct DbAcademicYear {
    pub academic_year_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSemester {
    pub semester_id: i64,
    pub academic_year_id: i64,
    pub name: String,
    pub semester_number: SemesterNumber,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_start_date: NaiveDate,
    pub registration_end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbEnrollmentPeriod {
    pub enrollment_period_id: i64,
    pub semester_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub resit_start_date: Option<DateTime<Utc>>,
    pub resit_end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbProgramme {
    pub programme_id: i64,
    pub code: String,
    pub name: String,
    pub duration_years: u32,
    pub total_semesters: u32,
    pub semesters_per_year: u32,
}

/// Programme unit joined with its unit's code and credit hours
#[derive(Debug, Clone, Serialize)]
pub struct DbProgrammeUnit {
    pub programme_unit_id: i64,
    pub programme_id: i64,
    pub unit_id: i64,
    pub unit_code: String,
    pub unit_name: String,
    pub credit_hours: u32,
    pub academic_year_id: i64,
    pub year_of_study: u32,
    pub semester_number: SemesterNumber,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbGradeBand {
    pub grading_id: i64,
    pub unit_id: i64,
    pub grade: String,
    pub min_marks: Decimal,
    pub max_marks: Decimal,
    pub grade_point: Decimal,
    pub is_pass: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStudent {
    pub student_id: i64,
    pub registration_number: String,
    pub programme_id: i64,
    pub current_year: u32,
    pub current_semester: SemesterNumber,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSemesterResult {
    pub result_id: i64,
    pub student_id: i64,
    pub programme_unit_id: i64,
    pub semester_id: i64,
    pub total_marks: Decimal,
    pub grade: String,
    pub grade_point: Decimal,
    pub credit_hours: u32,
    pub is_passed: bool,
    pub is_supplementary: bool,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbFeeBalance {
    pub student_id: i64,
    pub semester_id: i64,
    pub total_fees: Decimal,
    pub amount_paid: Decimal,
}

impl DbFeeBalance {
    pub fn balance(&self) -> Decimal {
        self.total_fees - self.amount_paid
    }

    pub fn is_cleared(&self) -> bool {
        self.balance() <= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSemesterReport {
    pub report_id: i64,
    pub student_id: i64,
    pub to_academic_year_id: i64,
    pub to_semester_id: i64,
    pub from_year_of_study: Option<u32>,
    pub to_year_of_study: u32,
    pub from_semester_number: Option<SemesterNumber>,
    pub to_semester_number: SemesterNumber,
    pub failed_units_count: u32,
    pub is_eligible: bool,
    pub eligibility_checked_at: DateTime<Utc>,
    pub eligibility_remarks: String,
    pub fee_balance: Decimal,
    pub is_financially_cleared: bool,
    pub previous_semester_gpa: Option<Decimal>,
    pub cumulative_gpa: Option<Decimal>,
    pub total_credits_earned: u32,
    pub status: ReportStatus,
    pub decided_by: Option<String>,
    pub decision_date: Option<DateTime<Utc>>,
    pub rejection_reason: String,
    pub report_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbUnitEnrollment {
    pub enrollment_id: i64,
    pub student_id: i64,
    pub report_id: i64,
    pub programme_unit_id: i64,
    pub semester_id: i64,
    pub enrollment_type: EnrollmentType,
    pub status: EnrollmentStatus,
    pub resit_exam_id: Option<i64>,
    pub decided_by: Option<String>,
    pub decision_date: Option<DateTime<Utc>>,
    pub rejection_reason: String,
    pub enrollment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbUnitRegistration {
    pub registration_id: i64,
    pub student_id: i64,
    pub programme_unit_id: i64,
    pub semester_id: i64,
    pub status: RegistrationStatus,
    pub is_retake: bool,
    pub approved_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbResitExam {
    pub resit_id: i64,
    pub student_id: i64,
    pub original_result_id: i64,
    pub resit_semester_id: i64,
    pub original_semester_id: i64,
    pub original_marks: Decimal,
    pub original_grade: String,
    pub original_grade_point: Decimal,
    pub resit_marks: Option<Decimal>,
    pub resit_grade: Option<String>,
    pub resit_grade_point: Option<Decimal>,
    pub resit_fee_amount: Decimal,
    pub fee_paid: bool,
    pub payment_reference: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: ResitStatus,
    pub decided_by: Option<String>,
    pub decision_date: Option<DateTime<Utc>>,
    pub marked_by: Option<String>,
    pub marking_date: Option<DateTime<Utc>>,
    pub registration_date: DateTime<Utc>,
}
