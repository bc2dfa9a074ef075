use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::catalog::{self, SubjectDraft};
use crate::models::{Course, ResultRecord, Semester, StoredResult, Student, Subject, Teacher};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        Student {
            reg_no: "2024010001".to_string(),
            student_name: "Nadia Rahman".to_string(),
            father_name: "Karim Rahman".to_string(),
            mother_name: "Salma Rahman".to_string(),
            session: "2024".to_string(),
            dept: "CSE".to_string(),
        },
        Student {
            reg_no: "2024020001".to_string(),
            student_name: "Tanvir Hasan".to_string(),
            father_name: "Mahmud Hasan".to_string(),
            mother_name: "Rokeya Begum".to_string(),
            session: "2024".to_string(),
            dept: "ECE".to_string(),
        },
        Student {
            reg_no: "2023030001".to_string(),
            student_name: "Farzana Akter".to_string(),
            father_name: "Abdul Kader".to_string(),
            mother_name: "Nasima Akter".to_string(),
            session: "2023".to_string(),
            dept: "BBA".to_string(),
        },
    ];

    for student in &students {
        sqlx::query(
            r#"
            INSERT INTO result_engine.students
            (reg_no, student_name, father_name, mother_name, session, dept)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reg_no) DO NOTHING
            "#,
        )
        .bind(&student.reg_no)
        .bind(&student.student_name)
        .bind(&student.father_name)
        .bind(&student.mother_name)
        .bind(&student.session)
        .bind(&student.dept)
        .execute(pool)
        .await?;
    }

    let teachers = vec![
        Teacher {
            name: "Rashid Ahmed".to_string(),
            email: "rashid.ahmed@university.edu".to_string(),
            phone: "01711000001".to_string(),
            dept: "CSE".to_string(),
            designation: "Associate Professor".to_string(),
        },
        Teacher {
            name: "Sharmin Sultana".to_string(),
            email: "sharmin.sultana@university.edu".to_string(),
            phone: "01711000002".to_string(),
            dept: "BBA".to_string(),
            designation: "Lecturer".to_string(),
        },
    ];

    for teacher in &teachers {
        sqlx::query(
            r#"
            INSERT INTO result_engine.teachers (id, name, email, phone, dept, designation)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&teacher.name)
        .bind(&teacher.email)
        .bind(&teacher.phone)
        .bind(&teacher.dept)
        .bind(&teacher.designation)
        .execute(pool)
        .await?;
    }

    let catalogs = vec![
        (
            "CSE",
            Semester::First,
            vec![
                SubjectDraft::new("Structured Programming", 3),
                SubjectDraft::new("Discrete Mathematics", 3),
                SubjectDraft::new("Physics", 4),
                SubjectDraft::new("English Language", 2),
            ],
        ),
        (
            "ECE",
            Semester::First,
            vec![
                SubjectDraft::new("Electrical Circuits", 4),
                SubjectDraft::new("Calculus", 3),
                SubjectDraft::new("Computer Fundamentals", 2),
            ],
        ),
        (
            "BBA",
            Semester::Third,
            vec![
                SubjectDraft::new("Financial Accounting", 3),
                SubjectDraft::new("Principles of Marketing", 3),
                SubjectDraft::new("Business Statistics", 3),
            ],
        ),
    ];

    // Existing catalogs may already carry results, so seeding never replaces them.
    for (dept, semester, drafts) in catalogs {
        let course = catalog::build_course(dept, semester, &drafts)?;
        sqlx::query(
            r#"
            INSERT INTO result_engine.courses (dept, semester, subjects)
            VALUES ($1, $2, $3)
            ON CONFLICT (dept, semester) DO NOTHING
            "#,
        )
        .bind(&course.dept)
        .bind(course.semester.name())
        .bind(Json(&course.subjects))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn insert_student(pool: &PgPool, student: &Student) -> anyhow::Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO result_engine.students
        (reg_no, student_name, father_name, mother_name, session, dept)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (reg_no) DO NOTHING
        "#,
    )
    .bind(&student.reg_no)
    .bind(&student.student_name)
    .bind(&student.father_name)
    .bind(&student.mother_name)
    .bind(&student.session)
    .bind(&student.dept)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Student {} already exists", student.reg_no);
    }

    tracing::info!(reg_no = %student.reg_no, dept = %student.dept, "student registered");
    Ok(())
}

pub async fn insert_teacher(pool: &PgPool, teacher: &Teacher) -> anyhow::Result<Uuid> {
    teacher.validate()?;

    let id = Uuid::new_v4();
    let result = sqlx::query(
        r#"
        INSERT INTO result_engine.teachers (id, name, email, phone, dept, designation)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(teacher.name.trim())
    .bind(teacher.email.trim())
    .bind(&teacher.phone)
    .bind(&teacher.dept)
    .bind(&teacher.designation)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Teacher with email {} already exists", teacher.email.trim());
    }

    tracing::info!(%id, email = %teacher.email, dept = %teacher.dept, "teacher added");
    Ok(id)
}

pub async fn fetch_student(pool: &PgPool, reg_no: &str) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT reg_no, student_name, father_name, mother_name, session, dept \
         FROM result_engine.students WHERE reg_no = $1",
    )
    .bind(reg_no)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Student {
        reg_no: row.get("reg_no"),
        student_name: row.get("student_name"),
        father_name: row.get("father_name"),
        mother_name: row.get("mother_name"),
        session: row.get("session"),
        dept: row.get("dept"),
    }))
}

/// Replaces the subject list for the course's department and semester.
/// Once a result has been stored against a catalog its subjects are frozen.
pub async fn upsert_course(pool: &PgPool, course: &Course) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    // Serialises concurrent catalog edits and result inserts for this course.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}/{}", course.dept, course.semester))
        .execute(&mut *tx)
        .await?;

    let results: i64 = sqlx::query(
        "SELECT COUNT(*) AS results FROM result_engine.results WHERE dept = $1 AND semester = $2",
    )
    .bind(&course.dept)
    .bind(course.semester.name())
    .fetch_one(&mut *tx)
    .await?
    .get("results");

    if results > 0 {
        anyhow::bail!(
            "Course {} {} semester already has {} stored result(s); its subjects cannot change",
            course.dept,
            course.semester,
            results
        );
    }

    sqlx::query(
        r#"
        INSERT INTO result_engine.courses (dept, semester, subjects)
        VALUES ($1, $2, $3)
        ON CONFLICT (dept, semester) DO UPDATE
        SET subjects = EXCLUDED.subjects, updated_at = now()
        "#,
    )
    .bind(&course.dept)
    .bind(course.semester.name())
    .bind(Json(&course.subjects))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        dept = %course.dept,
        semester = %course.semester,
        subjects = course.subjects.len(),
        "course saved"
    );
    Ok(())
}

pub async fn fetch_course(
    pool: &PgPool,
    dept: &str,
    semester: Semester,
) -> anyhow::Result<Option<Course>> {
    let row = sqlx::query(
        "SELECT subjects FROM result_engine.courses WHERE dept = $1 AND semester = $2",
    )
    .bind(dept)
    .bind(semester.name())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let subjects: Json<Vec<Subject>> = row
        .try_get("subjects")
        .context("stored subject list is not valid JSON")?;

    Ok(Some(Course {
        dept: dept.to_string(),
        semester,
        subjects: subjects.0,
    }))
}

/// Stores a computed result. Each student gets one result per semester.
pub async fn insert_result(pool: &PgPool, record: &ResultRecord) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}/{}", record.dept, record.semester))
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        r#"
        INSERT INTO result_engine.results
        (id, reg_no, semester, dept, record, grade_point_average, letter_grade_average)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (reg_no, semester) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(&record.reg_no)
    .bind(record.semester.name())
    .bind(&record.dept)
    .bind(Json(record))
    .bind(record.grade_point_average)
    .bind(&record.letter_grade_average)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!(
            "Result already exists for {} in the {} semester",
            record.reg_no,
            record.semester
        );
    }
    tx.commit().await?;

    tracing::info!(
        %id,
        reg_no = %record.reg_no,
        semester = %record.semester,
        gpa = record.grade_point_average,
        "result saved"
    );
    Ok(id)
}

pub async fn fetch_result(
    pool: &PgPool,
    reg_no: &str,
    semester: Semester,
) -> anyhow::Result<Option<StoredResult>> {
    let row = sqlx::query(
        "SELECT id, record, recorded_at FROM result_engine.results \
         WHERE reg_no = $1 AND semester = $2",
    )
    .bind(reg_no)
    .bind(semester.name())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let record: Json<ResultRecord> = row
        .try_get("record")
        .context("stored result is not valid JSON")?;
    let recorded_at: DateTime<Utc> = row.get("recorded_at");

    Ok(Some(StoredResult {
        id: row.get("id"),
        record: record.0,
        recorded_at,
    }))
}

// These run against a scratch database created by `sqlx::test`; set
// DATABASE_URL and pass `--ignored` to include them.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectResult;

    fn sample_record(course: &Course, reg_no: &str) -> ResultRecord {
        let subject = &course.subjects[0];
        ResultRecord {
            reg_no: reg_no.to_string(),
            student_name: "Nadia Rahman".to_string(),
            father_name: "Karim Rahman".to_string(),
            mother_name: "Salma Rahman".to_string(),
            session: "2024".to_string(),
            dept: course.dept.clone(),
            semester: course.semester,
            result: vec![SubjectResult {
                code: subject.code.clone(),
                title: subject.title.clone(),
                credit: subject.credit,
                assignment: 8.0,
                classtest: 8.0,
                midterm: 16.0,
                final_exam: 50.0,
                total: 82.0,
                letter_grade: "A+".to_string(),
                grade_point: 4.0,
            }],
            total_number: 82.0,
            grade_point_average: 4.0,
            letter_grade_average: "A+".to_string(),
        }
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn catalog_is_frozen_once_results_exist(pool: PgPool) {
        seed(&pool).await.unwrap();
        let course = fetch_course(&pool, "CSE", Semester::First)
            .await
            .unwrap()
            .unwrap();

        let drafts = [SubjectDraft::new("Algorithms", 3)];
        let edited = catalog::build_course("CSE", Semester::First, &drafts).unwrap();
        upsert_course(&pool, &edited).await.unwrap();
        upsert_course(&pool, &course).await.unwrap();

        insert_result(&pool, &sample_record(&course, "2024010001"))
            .await
            .unwrap();

        let err = upsert_course(&pool, &edited).await.unwrap_err();
        assert!(err.to_string().contains("cannot change"));

        let stored = fetch_course(&pool, "CSE", Semester::First)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.subjects, course.subjects);

        // Seeding again must not touch the frozen catalog either.
        seed(&pool).await.unwrap();
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn second_result_for_a_semester_is_rejected(pool: PgPool) {
        seed(&pool).await.unwrap();
        let course = fetch_course(&pool, "CSE", Semester::First)
            .await
            .unwrap()
            .unwrap();
        let record = sample_record(&course, "2024010001");

        insert_result(&pool, &record).await.unwrap();
        let err = insert_result(&pool, &record).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn teacher_email_is_unique(pool: PgPool) {
        init_db(&pool).await.unwrap();
        let teacher = Teacher {
            name: "Rashid Ahmed".to_string(),
            email: "rashid@university.edu".to_string(),
            phone: "01711000001".to_string(),
            dept: "CSE".to_string(),
            designation: "Lecturer".to_string(),
        };

        insert_teacher(&pool, &teacher).await.unwrap();
        let err = insert_teacher(&pool, &teacher).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
