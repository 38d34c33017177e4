//! Seeded catalogue shared by the unit tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::Connection;

use crate::db::admin::{
    insert_academic_year, insert_allocation, insert_grade_bands, insert_programme,
    insert_programme_unit, insert_result, insert_semester, insert_student, insert_unit,
    NewGradeBand, NewProgramme, NewResult, NewSemester,
};
use crate::db::{AllocationStatus, SemesterNumber};

pub(crate) struct Campus {
    pub programme_id: i64,
    pub sem1_id: i64,
    pub sem2_id: i64,
    /// Year 1 semester 1 units, offered in both semesters
    pub y1s1: Vec<i64>,
    /// Year 1 semester 2 units, offered in semester 2
    pub y1s2: Vec<i64>,
    /// Year 1 semester 2 unit with no approved allocation
    pub unoffered: i64,
    pub student_id: i64,
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn standard_bands() -> Vec<NewGradeBand> {
    [
        ("A", 70, 100, 40, true),
        ("B", 60, 69, 30, true),
        ("C", 50, 59, 20, true),
        ("D", 40, 49, 10, false),
        ("E", 0, 39, 0, false),
    ]
    .into_iter()
    .map(|(grade, min, max, point, is_pass)| NewGradeBand {
        grade: grade.to_string(),
        min_marks: Decimal::from(min),
        max_marks: Decimal::from(max),
        grade_point: Decimal::new(point, 1),
        is_pass,
    })
    .collect()
}

pub(crate) fn campus(conn: &Connection) -> Campus {
    let year_id = insert_academic_year(conn, "2024/2025", date(2024, 9, 1), date(2025, 8, 31)).unwrap();
    let sem1_id = insert_semester(
        conn,
        &NewSemester {
            academic_year_id: year_id,
            name: "2024/2025 Semester 1".to_string(),
            semester_number: SemesterNumber::First,
            start_date: date(2024, 9, 2),
            end_date: date(2024, 12, 20),
            registration_start_date: date(2024, 8, 19),
            registration_end_date: date(2024, 9, 13),
        },
    )
    .unwrap();
    let sem2_id = insert_semester(
        conn,
        &NewSemester {
            academic_year_id: year_id,
            name: "2024/2025 Semester 2".to_string(),
            semester_number: SemesterNumber::Second,
            start_date: date(2025, 1, 6),
            end_date: date(2025, 4, 25),
            registration_start_date: date(2024, 12, 23),
            registration_end_date: date(2025, 1, 17),
        },
    )
    .unwrap();

    let programme_id = insert_programme(
        conn,
        &NewProgramme {
            code: "BSC-CS".to_string(),
            name: "Bachelor of Science in Computer Science".to_string(),
            duration_years: 4,
            total_semesters: 8,
            semesters_per_year: 2,
        },
    )
    .unwrap();

    let add_unit = |code: &str, semester_number: SemesterNumber, offered_in: &[i64]| {
        let unit_id = insert_unit(conn, code, code, 3).unwrap();
        insert_grade_bands(conn, unit_id, &standard_bands()).unwrap();
        let pu = insert_programme_unit(conn, programme_id, unit_id, year_id, 1, semester_number).unwrap();
        for semester_id in offered_in {
            insert_allocation(conn, pu, *semester_id, "Dr. Otieno", AllocationStatus::ApprovedDean).unwrap();
        }
        pu
    };

    let y1s1 = ["CS101", "CS102", "CS103"]
        .into_iter()
        .map(|code| add_unit(code, SemesterNumber::First, &[sem1_id, sem2_id][..]))
        .collect();
    let y1s2 = ["CS111", "CS112"]
        .into_iter()
        .map(|code| add_unit(code, SemesterNumber::Second, &[sem2_id][..]))
        .collect();
    let unoffered = add_unit("CS120", SemesterNumber::Second, &[][..]);
    insert_allocation(conn, unoffered, sem2_id, "Dr. Wanjiru", AllocationStatus::ApprovedHod).unwrap();

    let student_id = insert_student(conn, "CS/001/2024", programme_id, 1, SemesterNumber::First).unwrap();

    Campus {
        programme_id,
        sem1_id,
        sem2_id,
        y1s1,
        y1s2,
        unoffered,
        student_id,
    }
}

/// Records a result graded on the standard bands
pub(crate) fn record_result(
    conn: &Connection,
    student_id: i64,
    programme_unit_id: i64,
    semester_id: i64,
    marks: i64,
) -> i64 {
    let (grade, point, passed) = match marks {
        70.. => ("A", 40, true),
        60..=69 => ("B", 30, true),
        50..=59 => ("C", 20, true),
        40..=49 => ("D", 10, false),
        _ => ("E", 0, false),
    };
    insert_result(
        conn,
        &NewResult {
            student_id,
            programme_unit_id,
            semester_id,
            total_marks: Decimal::from(marks),
            grade: grade.to_string(),
            grade_point: Decimal::new(point, 1),
            credit_hours: 3,
            is_passed: passed,
        },
    )
    .unwrap()
}
