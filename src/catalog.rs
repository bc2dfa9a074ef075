use serde::Deserialize;

use crate::error::ValidationError;
use crate::models::{Course, Semester, Subject};

/// Largest zero-based position that still fits a two digit serial.
pub const MAX_SUBJECT_INDEX: usize = 98;

pub const DEFAULT_CREDIT: u8 = 3;

/// A subject as entered, before its code is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectDraft {
    pub title: String,
    #[serde(default = "default_credit")]
    pub credit: u8,
}

fn default_credit() -> u8 {
    DEFAULT_CREDIT
}

impl SubjectDraft {
    pub fn new(title: impl Into<String>, credit: u8) -> Self {
        Self {
            title: title.into(),
            credit,
        }
    }
}

/// `<dept><semester ordinal><two digit serial>`, e.g. `BBA301`.
///
/// The serial comes from the position in the list, so codes must be
/// regenerated whenever subjects are reordered, added or removed.
pub fn generate_code(
    dept: &str,
    semester: Semester,
    index: usize,
) -> Result<String, ValidationError> {
    if dept.trim().is_empty() {
        return Err(ValidationError::EmptyDepartment);
    }
    if index > MAX_SUBJECT_INDEX {
        return Err(ValidationError::SerialOverflow { index });
    }

    Ok(format!("{}{}{:02}", dept, semester.ordinal(), index + 1))
}

pub fn build_course(
    dept: &str,
    semester: Semester,
    drafts: &[SubjectDraft],
) -> Result<Course, ValidationError> {
    let mut subjects = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.iter().enumerate() {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle { position: index + 1 });
        }
        if !(1..=4).contains(&draft.credit) {
            return Err(ValidationError::CreditOutOfRange {
                title: title.to_string(),
                credit: draft.credit,
            });
        }

        subjects.push(Subject {
            code: generate_code(dept, semester, index)?,
            title: title.to_string(),
            credit: draft.credit,
        });
    }

    Ok(Course {
        dept: dept.to_string(),
        semester,
        subjects,
    })
}

/// Parses `"Title:credit"`; a missing credit means the default of 3.
pub fn parse_subject_arg(raw: &str) -> anyhow::Result<SubjectDraft> {
    match raw.rsplit_once(':') {
        Some((title, credit)) => {
            let credit: u8 = credit
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid credit in subject {raw:?}"))?;
            Ok(SubjectDraft::new(title, credit))
        }
        None => Ok(SubjectDraft::new(raw, DEFAULT_CREDIT)),
    }
}

/// Reads a `title,credit` CSV into drafts, in file order.
pub fn load_drafts_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<SubjectDraft>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut drafts = Vec::new();

    for result in reader.deserialize::<SubjectDraft>() {
        drafts.push(result?);
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_dept_semester_serial() {
        assert_eq!(generate_code("BBA", Semester::Third, 0).unwrap(), "BBA301");
        assert_eq!(generate_code("CSE", Semester::Fifth, 0).unwrap(), "CSE501");
        assert_eq!(generate_code("CSE", Semester::Fifth, 9).unwrap(), "CSE510");
        assert_eq!(generate_code("ECE", Semester::Eighth, 98).unwrap(), "ECE899");
    }

    #[test]
    fn serial_past_two_digits_is_rejected() {
        assert_eq!(
            generate_code("CSE", Semester::First, 99),
            Err(ValidationError::SerialOverflow { index: 99 })
        );
    }

    #[test]
    fn empty_department_is_rejected() {
        assert_eq!(
            generate_code("  ", Semester::First, 0),
            Err(ValidationError::EmptyDepartment)
        );
    }

    #[test]
    fn build_course_assigns_codes_by_position() {
        let drafts = vec![
            SubjectDraft::new(" Structured Programming ", 3),
            SubjectDraft::new("Discrete Mathematics", 4),
        ];
        let course = build_course("CSE", Semester::First, &drafts).unwrap();
        assert_eq!(course.subjects[0].code, "CSE101");
        assert_eq!(course.subjects[0].title, "Structured Programming");
        assert_eq!(course.subjects[1].code, "CSE102");

        let reordered = vec![drafts[1].clone(), drafts[0].clone()];
        let course = build_course("CSE", Semester::First, &reordered).unwrap();
        assert_eq!(course.subjects[0].title, "Discrete Mathematics");
        assert_eq!(course.subjects[0].code, "CSE101");
    }

    #[test]
    fn build_course_rejects_bad_drafts() {
        let blank = vec![SubjectDraft::new("   ", 3)];
        assert_eq!(
            build_course("CSE", Semester::First, &blank),
            Err(ValidationError::EmptyTitle { position: 1 })
        );

        let heavy = vec![SubjectDraft::new("Thesis", 6)];
        assert!(matches!(
            build_course("CSE", Semester::First, &heavy),
            Err(ValidationError::CreditOutOfRange { credit: 6, .. })
        ));
    }

    #[test]
    fn subject_args_parse_with_and_without_credit() {
        let draft = parse_subject_arg("Data Structures:4").unwrap();
        assert_eq!(draft.title, "Data Structures");
        assert_eq!(draft.credit, 4);

        let draft = parse_subject_arg("Physics").unwrap();
        assert_eq!(draft.credit, DEFAULT_CREDIT);

        assert!(parse_subject_arg("Physics:x").is_err());
    }

    #[test]
    fn drafts_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        std::fs::write(&path, "title,credit\nAccounting,3\nMarketing,2\n").unwrap();

        let drafts = load_drafts_csv(&path).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].title, "Marketing");
        assert_eq!(drafts[1].credit, 2);
    }
}
