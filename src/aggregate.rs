use std::collections::HashMap;

use crate::config::FailGate;
use crate::error::ValidationError;
use crate::grading::{self, is_passing};
use crate::models::{
    MarkComponent, MarkEntry, ResultRecord, Semester, Student, Subject, SubjectResult,
};

/// Builds the semester result for one student.
///
/// Nothing is graded unless the department matches and every subject has all
/// four marks. Subject order is the catalog order.
pub fn build_result(
    student: &Student,
    dept: &str,
    semester: Semester,
    subjects: &[Subject],
    marks_by_code: &HashMap<String, MarkEntry>,
    fail_gate: FailGate,
) -> Result<ResultRecord, ValidationError> {
    check_department(student, dept)?;
    check_completeness(subjects, marks_by_code)?;

    let result: Vec<SubjectResult> = subjects
        .iter()
        .map(|subject| {
            // Presence was checked above.
            let entry = marks_by_code.get(&subject.code).cloned().unwrap_or_default();
            grade_entry(subject, &entry)
        })
        .collect();

    let total_number: f64 = result.iter().map(|r| r.total).sum();
    let (grade_point_average, letter_grade_average) = semester_gpa(&result, fail_gate);

    tracing::debug!(
        reg_no = %student.reg_no,
        %semester,
        gpa = grade_point_average,
        letter = letter_grade_average,
        "computed semester result"
    );

    Ok(ResultRecord {
        reg_no: student.reg_no.clone(),
        student_name: student.student_name.clone(),
        father_name: student.father_name.clone(),
        mother_name: student.mother_name.clone(),
        session: student.session.clone(),
        dept: dept.to_string(),
        semester,
        result,
        total_number,
        grade_point_average,
        letter_grade_average: letter_grade_average.to_string(),
    })
}

/// A student's result can only be entered under their own department.
pub fn check_department(student: &Student, dept: &str) -> Result<(), ValidationError> {
    if student.dept != dept {
        return Err(ValidationError::DepartmentMismatch {
            student_dept: student.dept.clone(),
            requested: dept.to_string(),
        });
    }

    Ok(())
}

pub fn check_completeness(
    subjects: &[Subject],
    marks_by_code: &HashMap<String, MarkEntry>,
) -> Result<(), ValidationError> {
    for subject in subjects {
        let missing = match marks_by_code.get(&subject.code) {
            Some(entry) => entry.first_missing(),
            None => Some(MarkComponent::Assignment),
        };

        if let Some(component) = missing {
            return Err(ValidationError::MissingMark {
                code: subject.code.clone(),
                title: subject.title.clone(),
                field: component.field(),
            });
        }
    }

    Ok(())
}

fn grade_entry(subject: &Subject, entry: &MarkEntry) -> SubjectResult {
    let assignment = entry.coerced(MarkComponent::Assignment);
    let classtest = entry.coerced(MarkComponent::ClassTest);
    let midterm = entry.coerced(MarkComponent::Midterm);
    let final_exam = entry.coerced(MarkComponent::Final);
    let grade = grading::grade_subject(assignment, classtest, midterm, final_exam);

    SubjectResult {
        code: subject.code.clone(),
        title: subject.title.clone(),
        credit: subject.credit,
        assignment,
        classtest,
        midterm,
        final_exam,
        total: grade.total,
        letter_grade: grade.letter_grade.to_string(),
        grade_point: grade.grade_point,
    }
}

/// Credit-weighted GPA rounded to two decimals, and its letter.
///
/// The letter is taken from the unrounded average, so 3.749 stays an A-.
pub fn semester_gpa(result: &[SubjectResult], fail_gate: FailGate) -> (f64, &'static str) {
    let all_passed = result.iter().all(|r| is_passing(r.grade_point));

    let counted: Vec<&SubjectResult> = match fail_gate {
        FailGate::VoidSemester if !all_passed => return (0.0, "F"),
        FailGate::VoidSemester => result.iter().collect(),
        FailGate::ExcludeFailed => result.iter().filter(|r| is_passing(r.grade_point)).collect(),
    };

    let total_credits: u32 = counted.iter().map(|r| u32::from(r.credit)).sum();
    if total_credits == 0 {
        return (0.0, "F");
    }

    let weighted: f64 = counted
        .iter()
        .map(|r| r.grade_point * f64::from(r.credit))
        .sum();
    let gpa = weighted / f64::from(total_credits);

    (grading::round2(gpa), grading::letter_for_gpa(gpa))
}
