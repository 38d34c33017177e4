//! Grade band lookup and GPA arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::config::PassRule;
use crate::db::DbGradeBand;

/// Grade resolved from marks against a unit's bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    pub grade: String,
    pub grade_point: Decimal,
    pub is_passed: bool,
}

/// Returns the first band, in the order given, whose `[min, max]` range
/// contains `marks`.
pub fn find_band(bands: &[DbGradeBand], marks: Decimal) -> Option<&DbGradeBand> {
    bands
        .iter()
        .find(|band| band.min_marks <= marks && marks <= band.max_marks)
}

/// Resolves marks to a grade and applies the configured pass rule.
/// `None` means the bands do not cover the marks.
pub fn resolve_grade(bands: &[DbGradeBand], marks: Decimal, rule: PassRule) -> Option<GradeOutcome> {
    find_band(bands, marks).map(|band| GradeOutcome {
        grade: band.grade.clone(),
        grade_point: band.grade_point,
        is_passed: match rule {
            PassRule::BandFlag => band.is_pass,
            PassRule::MinGradePoint(threshold) => band.grade_point >= threshold,
        },
    })
}

/// Quality-point weighted average over `(grade_point, credit_hours)` pairs,
/// rounded half-up to two places. `None` when there are no credit hours.
pub fn gpa<I>(attempts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (Decimal, u32)>,
{
    let (quality_points, credit_hours) = attempts.into_iter().fold(
        (Decimal::ZERO, 0u32),
        |(points, hours), (grade_point, credits)| {
            (points + grade_point * Decimal::from(credits), hours + credits)
        },
    );

    if credit_hours == 0 {
        return None;
    }

    Some(
        (quality_points / Decimal::from(credit_hours))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}
