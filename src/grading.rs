/// Lowest grade point that counts as a pass.
pub const PASS_POINT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub total: f64,
    pub letter_grade: &'static str,
    pub grade_point: f64,
}

// Descending, first match wins.
const MARK_TIERS: [(f64, &str, f64); 9] = [
    (80.0, "A+", 4.0),
    (75.0, "A", 3.75),
    (70.0, "A-", 3.5),
    (65.0, "B+", 3.25),
    (60.0, "B", 3.0),
    (55.0, "B-", 2.75),
    (50.0, "C+", 2.5),
    (45.0, "C", 2.25),
    (40.0, "D", 2.0),
];

pub fn grade_subject(assignment: f64, classtest: f64, midterm: f64, final_exam: f64) -> Grade {
    let total = assignment + classtest + midterm + final_exam;
    let (letter_grade, grade_point) = letter_for_total(total);

    Grade {
        total,
        letter_grade,
        grade_point,
    }
}

pub fn letter_for_total(total: f64) -> (&'static str, f64) {
    MARK_TIERS
        .iter()
        .find(|(min, _, _)| total >= *min)
        .map(|(_, letter, point)| (*letter, *point))
        .unwrap_or(("F", 0.0))
}

/// Maps a semester GPA back onto the letter scale using the grade points as
/// cut-offs.
pub fn letter_for_gpa(gpa: f64) -> &'static str {
    MARK_TIERS
        .iter()
        .find(|(_, _, point)| gpa >= *point)
        .map(|(_, letter, _)| *letter)
        .unwrap_or("F")
}

pub fn is_passing(grade_point: f64) -> bool {
    grade_point >= PASS_POINT
}

/// Two decimal places, rounding half up on the exact binary value of the
/// input. 2.675 is stored as 2.67499.. and so becomes 2.67, while an exact
/// tie such as 2.625 becomes 2.63.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // Float formatting with a precision prints exact digits.
    let exact = format!("{:.60}", value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let whole: u64 = whole.parse().unwrap_or(0);
    let hundredths: u64 = fraction.get(..2).and_then(|d| d.parse().ok()).unwrap_or(0);

    let mut cents = whole * 100 + hundredths;
    if fraction.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        cents += 1;
    }

    (cents as f64 / 100.0).copysign(value)
}
