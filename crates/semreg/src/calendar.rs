//! Academic calendar: the "current" pointer and enrollment windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::records::{
    active_semesters, enrollment_period_for, load_academic_year, load_semester,
};
use crate::db::{DbAcademicYear, DbEnrollmentPeriod, DbSemester, EnrollmentType};
use crate::error::Result;

/// Normal enrollment opens this long before the semester starts.
const NORMAL_OPENS_BEFORE_START: i64 = 14;
/// Normal enrollment closes, and resit enrollment opens, this long after the start.
const NORMAL_CLOSES_AFTER_START: i64 = 7;
const RESIT_CLOSES_AFTER_START: i64 = 21;

impl DbEnrollmentPeriod {
    /// Checks if normal enrollment is open at `now`
    pub fn is_enrollment_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// Checks if resit enrollment is open at `now`. Closed when no resit window is set.
    pub fn is_resit_enrollment_open(&self, now: DateTime<Utc>) -> bool {
        match (self.resit_start_date, self.resit_end_date) {
            (Some(start), Some(end)) => self.is_active && start <= now && now <= end,
            _ => false,
        }
    }
}

impl DbSemester {
    /// Checks if `today` falls inside the semester's registration window
    pub fn is_registration_open(&self, today: NaiveDate) -> bool {
        self.is_active
            && self.registration_start_date <= today
            && today <= self.registration_end_date
    }
}

/// Current academic year and semester
#[derive(Debug, Clone, Serialize)]
pub struct CurrentTerm {
    pub academic_year: Option<DbAcademicYear>,
    pub semester: Option<DbSemester>,
}

/// Enrollment window state of a semester at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    pub semester_id: i64,
    pub normal_open: bool,
    pub resit_open: bool,
    pub period: Option<DbEnrollmentPeriod>,
}

impl WindowStatus {
    pub fn admits(&self, enrollment_type: EnrollmentType) -> bool {
        match enrollment_type {
            EnrollmentType::Resit => self.resit_open,
            EnrollmentType::Normal | EnrollmentType::Retake => self.normal_open,
        }
    }
}

/// Window dates for a new enrollment period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindows {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub resit_start_date: Option<DateTime<Utc>>,
    pub resit_end_date: Option<DateTime<Utc>>,
}

impl PeriodWindows {
    /// Default windows derived from the semester start date
    pub fn for_semester(semester: &DbSemester) -> Self {
        let start = semester.start_date.and_time(NaiveTime::MIN).and_utc();
        Self {
            start_date: start - Duration::days(NORMAL_OPENS_BEFORE_START),
            end_date: start + Duration::days(NORMAL_CLOSES_AFTER_START),
            resit_start_date: Some(start + Duration::days(NORMAL_CLOSES_AFTER_START)),
            resit_end_date: Some(start + Duration::days(RESIT_CLOSES_AFTER_START)),
        }
    }
}

/// Points the calendar at a semester and its academic year in one statement
pub fn set_current_semester(conn: &Connection, semester_id: i64) -> Result<DbSemester> {
    let semester = load_semester(conn, semester_id)?;
    conn.execute(
        "UPDATE calendar_pointer
         SET current_semester_id = ?1, current_academic_year_id = ?2
         WHERE pointer_id = 1",
        (semester.semester_id, semester.academic_year_id),
    )?;
    info!(
        "Current semester set to {} ({})",
        semester.semester_id, semester.name
    );
    Ok(semester)
}

/// Points the calendar at an academic year. The current semester is cleared
/// when it belongs to a different year.
pub fn set_current_academic_year(conn: &Connection, academic_year_id: i64) -> Result<DbAcademicYear> {
    let year = load_academic_year(conn, academic_year_id)?;
    conn.execute(
        "UPDATE calendar_pointer
         SET current_academic_year_id = ?1,
             current_semester_id = CASE
                 WHEN current_semester_id IN (SELECT semester_id FROM semesters WHERE academic_year_id = ?1)
                 THEN current_semester_id
                 ELSE NULL
             END
         WHERE pointer_id = 1",
        [year.academic_year_id],
    )?;
    info!("Current academic year set to {}", year.name);
    Ok(year)
}

pub fn current_term(conn: &Connection) -> Result<CurrentTerm> {
    let (year_id, semester_id): (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT current_academic_year_id, current_semester_id FROM calendar_pointer WHERE pointer_id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let academic_year = year_id.map(|id| load_academic_year(conn, id)).transpose()?;
    let semester = semester_id.map(|id| load_semester(conn, id)).transpose()?;
    Ok(CurrentTerm {
        academic_year,
        semester,
    })
}

/// Enrollment window state of a semester. A semester without a period has
/// both windows closed.
pub fn enrollment_window(conn: &Connection, semester_id: i64, now: DateTime<Utc>) -> Result<WindowStatus> {
    load_semester(conn, semester_id)?;
    let period = enrollment_period_for(conn, semester_id)?;
    let (normal_open, resit_open) = match &period {
        Some(p) => (p.is_enrollment_open(now), p.is_resit_enrollment_open(now)),
        None => (false, false),
    };
    debug!(
        "Enrollment window for semester {}: normal_open={}, resit_open={}",
        semester_id, normal_open, resit_open
    );
    Ok(WindowStatus {
        semester_id,
        normal_open,
        resit_open,
        period,
    })
}

pub fn insert_enrollment_period(
    conn: &Connection,
    semester_id: i64,
    windows: &PeriodWindows,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO enrollment_periods (
            semester_id, start_date, end_date, resit_start_date, resit_end_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            semester_id,
            windows.start_date,
            windows.end_date,
            windows.resit_start_date,
            windows.resit_end_date,
            Utc::now(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Creates default enrollment periods for every active semester that has none.
///
/// # Returns
/// * Ids of the periods created
pub fn auto_create_enrollment_periods(conn: &Connection) -> Result<Vec<i64>> {
    let mut created = Vec::new();

    for semester in active_semesters(conn)? {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT enrollment_period_id FROM enrollment_periods WHERE semester_id = ?",
                [semester.semester_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            debug!("Enrollment period already exists for {}", semester.name);
            continue;
        }

        let windows = PeriodWindows::for_semester(&semester);
        created.push(insert_enrollment_period(conn, semester.semester_id, &windows)?);
        info!("Created enrollment period for {}", semester.name);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::admin::{insert_academic_year, insert_semester, NewSemester};
    use crate::db::{SemesterNumber, WorkflowDb};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_year(conn: &Connection, name: &str, year: i32) -> (i64, i64, i64) {
        let year_id = insert_academic_year(conn, name, date(year, 9, 1), date(year + 1, 8, 31)).unwrap();
        let first = insert_semester(
            conn,
            &NewSemester {
                academic_year_id: year_id,
                name: format!("Semester 1 - {name}"),
                semester_number: SemesterNumber::First,
                start_date: date(year, 9, 2),
                end_date: date(year, 12, 20),
                registration_start_date: date(year, 8, 20),
                registration_end_date: date(year, 9, 15),
            },
        )
        .unwrap();
        let second = insert_semester(
            conn,
            &NewSemester {
                academic_year_id: year_id,
                name: format!("Semester 2 - {name}"),
                semester_number: SemesterNumber::Second,
                start_date: date(year + 1, 1, 6),
                end_date: date(year + 1, 4, 25),
                registration_start_date: date(year, 12, 28),
                registration_end_date: date(year + 1, 1, 20),
            },
        )
        .unwrap();
        (year_id, first, second)
    }

    #[test]
    fn test_pointer_swap_keeps_single_current() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let (year_id, first, second) = seed_year(tx, "2024/2025", 2024);

            set_current_semester(tx, first)?;
            set_current_semester(tx, second)?;

            let term = current_term(tx)?;
            assert_eq!(term.semester.unwrap().semester_id, second);
            assert_eq!(term.academic_year.unwrap().academic_year_id, year_id);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_switching_year_clears_foreign_semester() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let (_, first, _) = seed_year(tx, "2024/2025", 2024);
            let (next_year, _, _) = seed_year(tx, "2025/2026", 2025);

            set_current_semester(tx, first)?;
            set_current_academic_year(tx, next_year)?;

            let term = current_term(tx)?;
            assert_eq!(term.academic_year.unwrap().academic_year_id, next_year);
            assert!(term.semester.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_semester_is_not_found() {
        let db = WorkflowDb::open_in_memory().unwrap();
        let err = db.transaction(|tx| set_current_semester(tx, 42)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_default_windows_follow_semester_start() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let (_, first, _) = seed_year(tx, "2024/2025", 2024);
            let created = auto_create_enrollment_periods(tx)?;
            assert_eq!(created.len(), 2);
            // Second run finds both periods already present.
            assert!(auto_create_enrollment_periods(tx)?.is_empty());

            let period = enrollment_period_for(tx, first)?.unwrap();
            assert_eq!(period.start_date, Utc.with_ymd_and_hms(2024, 8, 19, 0, 0, 0).unwrap());
            assert_eq!(period.end_date, Utc.with_ymd_and_hms(2024, 9, 9, 0, 0, 0).unwrap());
            assert_eq!(
                period.resit_end_date,
                Some(Utc.with_ymd_and_hms(2024, 9, 23, 0, 0, 0).unwrap())
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_window_status_at_points_in_time() {
        let db = WorkflowDb::open_in_memory().unwrap();
        db.transaction(|tx| {
            let (_, first, second) = seed_year(tx, "2024/2025", 2024);
            let semester = load_semester(tx, first)?;
            insert_enrollment_period(tx, first, &PeriodWindows::for_semester(&semester))?;

            let before = enrollment_window(tx, first, Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap())?;
            assert!(!before.normal_open && !before.resit_open);

            let normal = enrollment_window(tx, first, Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap())?;
            assert!(normal.admits(EnrollmentType::Normal));
            assert!(!normal.admits(EnrollmentType::Resit));

            let resit = enrollment_window(tx, first, Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap())?;
            assert!(resit.admits(EnrollmentType::Resit));
            assert!(!resit.admits(EnrollmentType::Retake));

            let no_period = enrollment_window(tx, second, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap())?;
            assert!(no_period.period.is_none());
            assert!(!no_period.normal_open);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_period_without_resit_window() {
        let period = DbEnrollmentPeriod {
            enrollment_period_id: 1,
            semester_id: 1,
            start_date: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap(),
            resit_start_date: None,
            resit_end_date: None,
            is_active: true,
        };
        let now = Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap();
        assert!(period.is_enrollment_open(now));
        assert!(!period.is_resit_enrollment_open(now));

        let inactive = DbEnrollmentPeriod {
            is_active: false,
            ..period
        };
        assert!(!inactive.is_enrollment_open(now));
    }

    #[test]
    fn test_registration_window() {
        let semester = DbSemester {
            semester_id: 1,
            academic_year_id: 1,
            name: "Semester 1".to_string(),
            semester_number: SemesterNumber::First,
            start_date: date(2024, 9, 2),
            end_date: date(2024, 12, 20),
            registration_start_date: date(2024, 8, 20),
            registration_end_date: date(2024, 9, 15),
            is_active: true,
        };
        assert!(semester.is_registration_open(date(2024, 9, 15)));
        assert!(!semester.is_registration_open(date(2024, 9, 16)));
    }
}
