use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SemesterPolicy;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
}

impl Semester {
    pub const ALL: [Semester; 8] = [
        Semester::First,
        Semester::Second,
        Semester::Third,
        Semester::Fourth,
        Semester::Fifth,
        Semester::Sixth,
        Semester::Seventh,
        Semester::Eighth,
    ];

    pub fn ordinal(self) -> u8 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
            Semester::Third => 3,
            Semester::Fourth => 4,
            Semester::Fifth => 5,
            Semester::Sixth => 6,
            Semester::Seventh => 7,
            Semester::Eighth => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Semester::First => "First",
            Semester::Second => "Second",
            Semester::Third => "Third",
            Semester::Fourth => "Fourth",
            Semester::Fifth => "Fifth",
            Semester::Sixth => "Sixth",
            Semester::Seventh => "Seventh",
            Semester::Eighth => "Eighth",
        }
    }

    /// Exact, case-sensitive lookup. Under the lenient policy an unknown name
    /// falls back to the first semester.
    pub fn resolve(name: &str, policy: SemesterPolicy) -> Result<Semester, ValidationError> {
        match name.parse::<Semester>() {
            Ok(semester) => Ok(semester),
            Err(err) => match policy {
                SemesterPolicy::Strict => Err(err),
                SemesterPolicy::Lenient => {
                    tracing::warn!(semester = name, "unknown semester, falling back to First");
                    Ok(Semester::First)
                }
            },
        }
    }
}

impl FromStr for Semester {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Semester::ALL
            .into_iter()
            .find(|semester| semester.name() == s)
            .ok_or_else(|| ValidationError::UnknownSemester(s.to_string()))
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    pub title: String,
    pub credit: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub dept: String,
    pub semester: Semester,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub reg_no: String,
    pub student_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub session: String,
    pub dept: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub dept: String,
    pub designation: String,
}

impl Teacher {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((user, domain)) if !user.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::InvalidEmail(email.to_string())),
        }
        if self.dept.trim().is_empty() {
            return Err(ValidationError::EmptyDepartment);
        }
        Ok(())
    }
}

/// A single raw mark as it arrives from a form or a CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkValue {
    Number(f64),
    Text(String),
}

impl MarkValue {
    /// A blank string counts as missing, but a literal zero does not.
    pub fn is_present(&self) -> bool {
        match self {
            MarkValue::Number(_) => true,
            MarkValue::Text(text) => !text.trim().is_empty(),
        }
    }

    /// The number as written, which may be infinite. `None` for text that is
    /// not a number at all.
    pub fn parsed(&self) -> Option<f64> {
        match self {
            MarkValue::Number(value) if value.is_nan() => None,
            MarkValue::Number(value) => Some(*value),
            MarkValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
        }
    }

    /// Numeric coercion: anything that does not parse as a finite number is 0.
    /// Range checks must run on `parsed` first so huge values are rejected.
    pub fn coerce(&self) -> f64 {
        self.parsed().filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

impl From<f64> for MarkValue {
    fn from(value: f64) -> Self {
        MarkValue::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkComponent {
    Assignment,
    ClassTest,
    Midterm,
    Final,
}

impl MarkComponent {
    pub const ALL: [MarkComponent; 4] = [
        MarkComponent::Assignment,
        MarkComponent::ClassTest,
        MarkComponent::Midterm,
        MarkComponent::Final,
    ];

    pub fn max(self) -> f64 {
        match self {
            MarkComponent::Assignment => 10.0,
            MarkComponent::ClassTest => 10.0,
            MarkComponent::Midterm => 20.0,
            MarkComponent::Final => 60.0,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            MarkComponent::Assignment => "assignment",
            MarkComponent::ClassTest => "classtest",
            MarkComponent::Midterm => "midterm",
            MarkComponent::Final => "final",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkEntry {
    pub assignment: Option<MarkValue>,
    pub classtest: Option<MarkValue>,
    pub midterm: Option<MarkValue>,
    #[serde(rename = "final")]
    pub final_exam: Option<MarkValue>,
}

impl MarkEntry {
    pub fn get(&self, component: MarkComponent) -> Option<&MarkValue> {
        match component {
            MarkComponent::Assignment => self.assignment.as_ref(),
            MarkComponent::ClassTest => self.classtest.as_ref(),
            MarkComponent::Midterm => self.midterm.as_ref(),
            MarkComponent::Final => self.final_exam.as_ref(),
        }
    }

    /// First component with no usable value, in form order.
    pub fn first_missing(&self) -> Option<MarkComponent> {
        MarkComponent::ALL
            .into_iter()
            .find(|component| !self.get(*component).is_some_and(MarkValue::is_present))
    }

    pub fn coerced(&self, component: MarkComponent) -> f64 {
        self.get(component).map(MarkValue::coerce).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub code: String,
    pub title: String,
    pub credit: u8,
    pub assignment: f64,
    pub classtest: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
    pub total: f64,
    pub letter_grade: String,
    pub grade_point: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub reg_no: String,
    pub student_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub session: String,
    pub dept: String,
    pub semester: Semester,
    pub result: Vec<SubjectResult>,
    pub total_number: f64,
    #[serde(rename = "GradePointAverage")]
    pub grade_point_average: f64,
    pub letter_grade_average: String,
}

#[derive(Debug, Clone)]
pub struct StoredResult {
    pub id: Uuid,
    pub record: ResultRecord,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_lookup_is_exact() {
        assert_eq!("Fifth".parse::<Semester>().unwrap(), Semester::Fifth);
        assert!("fifth".parse::<Semester>().is_err());
        assert_eq!(Semester::Eighth.ordinal(), 8);
    }

    #[test]
    fn lenient_policy_falls_back_to_first() {
        let semester = Semester::resolve("Ninth", SemesterPolicy::Lenient).unwrap();
        assert_eq!(semester, Semester::First);
        assert!(matches!(
            Semester::resolve("Ninth", SemesterPolicy::Strict),
            Err(ValidationError::UnknownSemester(_))
        ));
    }

    #[test]
    fn blank_text_is_missing_but_zero_is_not() {
        assert!(!MarkValue::Text("  ".into()).is_present());
        assert!(MarkValue::Text("0".into()).is_present());
        assert!(MarkValue::from(0.0).is_present());
    }

    #[test]
    fn coercion_treats_garbage_as_zero() {
        assert_eq!(MarkValue::Text(" 7.5 ".into()).coerce(), 7.5);
        assert_eq!(MarkValue::Text("abc".into()).coerce(), 0.0);
        assert_eq!(MarkValue::Number(f64::NAN).coerce(), 0.0);
    }

    #[test]
    fn parsed_keeps_infinite_values() {
        assert_eq!(MarkValue::Text("Infinity".into()).parsed(), Some(f64::INFINITY));
        assert_eq!(MarkValue::Text("1e400".into()).parsed(), Some(f64::INFINITY));
        assert_eq!(MarkValue::Text("n/a".into()).parsed(), None);
        assert_eq!(MarkValue::Text("Infinity".into()).coerce(), 0.0);
    }

    #[test]
    fn first_missing_reports_in_form_order() {
        let entry = MarkEntry {
            assignment: Some(5.0.into()),
            classtest: Some(MarkValue::Text("".into())),
            midterm: None,
            final_exam: Some(40.0.into()),
        };
        assert_eq!(entry.first_missing(), Some(MarkComponent::ClassTest));
    }

    fn teacher(name: &str, email: &str) -> Teacher {
        Teacher {
            name: name.to_string(),
            email: email.to_string(),
            phone: "01711000000".to_string(),
            dept: "CSE".to_string(),
            designation: "Lecturer".to_string(),
        }
    }

    #[test]
    fn teacher_needs_name_and_email() {
        assert!(teacher("Rashid Ahmed", "rashid@uni.edu").validate().is_ok());
        assert_eq!(
            teacher("  ", "rashid@uni.edu").validate(),
            Err(ValidationError::EmptyName)
        );
        assert!(matches!(
            teacher("Rashid Ahmed", "rashid.uni.edu").validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            teacher("Rashid Ahmed", "@uni.edu").validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn result_record_uses_wire_field_names() {
        let record = ResultRecord {
            reg_no: "2024001".to_string(),
            student_name: "Nadia Rahman".to_string(),
            father_name: "Karim Rahman".to_string(),
            mother_name: "Salma Rahman".to_string(),
            session: "2024".to_string(),
            dept: "CSE".to_string(),
            semester: Semester::First,
            result: Vec::new(),
            total_number: 0.0,
            grade_point_average: 0.0,
            letter_grade_average: "F".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("GradePointAverage").is_some());
        assert!(json.get("letterGradeAverage").is_some());
        assert_eq!(json["semester"], "First");
    }
}
