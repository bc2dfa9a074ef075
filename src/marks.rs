use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::MarkError;
use crate::models::{MarkComponent, MarkEntry, MarkValue, Subject};

/// Rejects any present mark above its component maximum or below zero,
/// including values too large to represent. Missing and non-numeric values
/// are left for the completeness check.
pub fn check_ranges(code: &str, entry: &MarkEntry) -> Result<(), MarkError> {
    for component in MarkComponent::ALL {
        let Some(value) = entry
            .get(component)
            .filter(|v| v.is_present())
            .and_then(MarkValue::parsed)
        else {
            continue;
        };

        if value > component.max() {
            return Err(MarkError::AboveMaximum {
                code: code.to_string(),
                component,
                value,
            });
        }
        if value < 0.0 {
            return Err(MarkError::Negative {
                code: code.to_string(),
                component,
                value,
            });
        }
    }

    Ok(())
}

/// Range-checks entries in catalog order, then makes sure every code belongs
/// to the catalog. The first problem reported is always the same one.
pub fn check_sheet(
    subjects: &[Subject],
    marks_by_code: &HashMap<String, MarkEntry>,
) -> Result<(), MarkError> {
    for subject in subjects {
        if let Some(entry) = marks_by_code.get(&subject.code) {
            check_ranges(&subject.code, entry)?;
        }
    }

    let unknown = marks_by_code
        .keys()
        .filter(|code| !subjects.iter().any(|s| &s.code == *code))
        .min();
    if let Some(code) = unknown {
        return Err(MarkError::UnknownCode(code.clone()));
    }

    Ok(())
}

/// Reads a `code,assignment,classtest,midterm,final` CSV. Blank cells are
/// kept as missing so the aggregator can name them.
pub fn load_marks_csv(csv_path: &Path) -> anyhow::Result<HashMap<String, MarkEntry>> {
    #[derive(Deserialize)]
    struct CsvRow {
        code: String,
        assignment: Option<String>,
        classtest: Option<String>,
        midterm: Option<String>,
        #[serde(rename = "final")]
        final_exam: Option<String>,
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    let mut marks = HashMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let entry = MarkEntry {
            assignment: row.assignment.map(MarkValue::Text),
            classtest: row.classtest.map(MarkValue::Text),
            midterm: row.midterm.map(MarkValue::Text),
            final_exam: row.final_exam.map(MarkValue::Text),
        };

        if marks.insert(row.code.clone(), entry).is_some() {
            return Err(MarkError::DuplicateCode(row.code).into());
        }
    }

    Ok(marks)
}
