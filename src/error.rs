use crate::models::MarkComponent;

/// Input the engine refuses to compute a result for. The caller is expected to
/// correct the input and resubmit.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("please fill all marks for {title} ({code}): {field} is missing")]
    MissingMark {
        code: String,
        title: String,
        field: &'static str,
    },
    #[error("department mismatch: student belongs to {student_dept}, not {requested}")]
    DepartmentMismatch {
        student_dept: String,
        requested: String,
    },
    #[error("unknown semester: {0}")]
    UnknownSemester(String),
    #[error("name must not be empty")]
    EmptyName,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("department must be a non-empty token")]
    EmptyDepartment,
    #[error("subject #{position} has an empty title")]
    EmptyTitle { position: usize },
    #[error("subject {title} has credit {credit}, expected 1 to 4")]
    CreditOutOfRange { title: String, credit: u8 },
    #[error("subject position {index} does not fit a two digit serial")]
    SerialOverflow { index: usize },
}

/// A mark outside its component's bounds. Rejected at the input boundary,
/// never clamped.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MarkError {
    #[error("{} for {code} cannot be more than {}, got {value}", .component.field().to_uppercase(), .component.max())]
    AboveMaximum {
        code: String,
        component: MarkComponent,
        value: f64,
    },
    #[error("{} for {code} cannot be negative, got {value}", .component.field().to_uppercase())]
    Negative {
        code: String,
        component: MarkComponent,
        value: f64,
    },
    #[error("marks listed twice for {0}")]
    DuplicateCode(String),
    #[error("marks given for {0}, which is not in the course catalog")]
    UnknownCode(String),
}
