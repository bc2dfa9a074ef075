use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod catalog;
mod config;
mod db;
mod error;
mod grading;
mod marks;
mod models;

use config::EngineConfig;
use models::{ResultRecord, Semester, Student, Teacher};

#[derive(Parser)]
#[command(name = "result-engine")]
#[command(about = "Semester result computation for departmental exam offices", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineConfig,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample students and course catalogs
    Seed,
    /// Register a student
    AddStudent {
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        father: String,
        #[arg(long)]
        mother: String,
        #[arg(long)]
        session: String,
        #[arg(long)]
        dept: String,
    },
    /// Add a teacher to a department
    AddTeacher {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        dept: String,
        #[arg(long, default_value = "Lecturer")]
        designation: String,
    },
    /// Define the subjects of a department's semester
    AddCourse {
        #[arg(long)]
        dept: String,
        #[arg(long)]
        semester: String,
        /// Subject as "Title:credit", repeated in catalog order
        #[arg(long = "subject", required = true)]
        subjects: Vec<String>,
    },
    /// Preview the codes a subject list would receive
    Codes {
        #[arg(long)]
        dept: String,
        #[arg(long)]
        semester: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Grade a single subject from its four component marks
    Grade {
        assignment: f64,
        classtest: f64,
        midterm: f64,
        #[arg(value_name = "FINAL")]
        final_exam: f64,
    },
    /// Compute and store a student's semester result from a marks CSV
    AddResult {
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        dept: String,
        #[arg(long)]
        semester: String,
        #[arg(long)]
        marks: PathBuf,
    },
    /// Compute a result without the database, printing it as JSON
    Compute {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        marks: PathBuf,
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        father: String,
        #[arg(long, default_value = "")]
        mother: String,
        #[arg(long, default_value = "")]
        session: String,
        #[arg(long)]
        dept: String,
        #[arg(long)]
        semester: String,
    },
    /// Show a stored result
    Show {
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        semester: String,
        #[arg(long)]
        json: bool,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = config::database_url()?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let engine = cli.engine;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::AddStudent {
            reg_no,
            name,
            father,
            mother,
            session,
            dept,
        } => {
            let pool = connect().await?;
            let student = Student {
                reg_no,
                student_name: name,
                father_name: father,
                mother_name: mother,
                session,
                dept,
            };
            db::insert_student(&pool, &student).await?;
            println!("Student {} registered.", student.reg_no);
        }
        Commands::AddTeacher {
            name,
            email,
            phone,
            dept,
            designation,
        } => {
            let teacher = Teacher {
                name,
                email,
                phone,
                dept,
                designation,
            };
            teacher.validate()?;

            let pool = connect().await?;
            let id = db::insert_teacher(&pool, &teacher).await?;
            println!("Teacher {} added to {} ({id}).", teacher.name, teacher.dept);
        }
        Commands::AddCourse {
            dept,
            semester,
            subjects,
        } => {
            let semester = Semester::resolve(&semester, engine.semester_policy)?;
            let drafts = subjects
                .iter()
                .map(|raw| catalog::parse_subject_arg(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let course = catalog::build_course(&dept, semester, &drafts)?;

            let pool = connect().await?;
            db::upsert_course(&pool, &course).await?;

            println!("Course saved for {} {} semester:", course.dept, course.semester);
            for subject in &course.subjects {
                println!("- {} {} ({} credit)", subject.code, subject.title, subject.credit);
            }
        }
        Commands::Codes {
            dept,
            semester,
            count,
        } => {
            let semester = Semester::resolve(&semester, engine.semester_policy)?;
            for index in 0..count {
                println!("{}", catalog::generate_code(&dept, semester, index)?);
            }
        }
        Commands::Grade {
            assignment,
            classtest,
            midterm,
            final_exam,
        } => {
            let entry = models::MarkEntry {
                assignment: Some(assignment.into()),
                classtest: Some(classtest.into()),
                midterm: Some(midterm.into()),
                final_exam: Some(final_exam.into()),
            };
            marks::check_ranges("subject", &entry)?;
            let grade = grading::grade_subject(assignment, classtest, midterm, final_exam);
            println!(
                "total {} grade {} ({:.2})",
                grade.total, grade.letter_grade, grade.grade_point
            );
        }
        Commands::AddResult {
            reg_no,
            dept,
            semester,
            marks: marks_path,
        } => {
            let semester = Semester::resolve(&semester, engine.semester_policy)?;
            let pool = connect().await?;

            let student = db::fetch_student(&pool, &reg_no)
                .await?
                .with_context(|| format!("student {reg_no} not found"))?;
            aggregate::check_department(&student, &dept)?;
            let course = db::fetch_course(&pool, &dept, semester)
                .await?
                .with_context(|| format!("no course defined for {dept} {semester} semester"))?;

            let marks_by_code = marks::load_marks_csv(&marks_path)
                .with_context(|| format!("failed to read marks from {}", marks_path.display()))?;
            let record = compute(&student, &course, &marks_by_code, engine)?;

            let id = db::insert_result(&pool, &record).await?;
            print_result(&record);
            println!("Result saved ({id}).");
        }
        Commands::Compute {
            catalog: catalog_path,
            marks: marks_path,
            reg_no,
            name,
            father,
            mother,
            session,
            dept,
            semester,
        } => {
            let semester = Semester::resolve(&semester, engine.semester_policy)?;
            let drafts = catalog::load_drafts_csv(&catalog_path)
                .with_context(|| format!("failed to read catalog {}", catalog_path.display()))?;
            let course = catalog::build_course(&dept, semester, &drafts)?;
            let marks_by_code = marks::load_marks_csv(&marks_path)
                .with_context(|| format!("failed to read marks from {}", marks_path.display()))?;
            let student = Student {
                reg_no,
                student_name: name,
                father_name: father,
                mother_name: mother,
                session,
                dept,
            };

            let record = compute(&student, &course, &marks_by_code, engine)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Show {
            reg_no,
            semester,
            json,
        } => {
            let semester = Semester::resolve(&semester, engine.semester_policy)?;
            let pool = connect().await?;

            let Some(stored) = db::fetch_result(&pool, &reg_no, semester).await? else {
                println!("No result found for {reg_no} in the {semester} semester.");
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stored.record)?);
            } else {
                print_result(&stored.record);
                println!(
                    "Recorded {} ({}).",
                    stored.recorded_at.format("%Y-%m-%d %H:%M UTC"),
                    stored.id
                );
            }
        }
    }

    Ok(())
}

/// Department check, range check, then aggregate. Rejected input never
/// reaches the store.
fn compute(
    student: &Student,
    course: &models::Course,
    marks_by_code: &std::collections::HashMap<String, models::MarkEntry>,
    engine: EngineConfig,
) -> anyhow::Result<ResultRecord> {
    if let Err(err) = aggregate::check_department(student, &course.dept) {
        tracing::warn!(reg_no = %student.reg_no, %err, "result rejected");
        return Err(err.into());
    }

    if let Err(err) = marks::check_sheet(&course.subjects, marks_by_code) {
        tracing::warn!(reg_no = %student.reg_no, %err, "marks rejected");
        return Err(err.into());
    }

    let record = aggregate::build_result(
        student,
        &course.dept,
        course.semester,
        &course.subjects,
        marks_by_code,
        engine.fail_gate,
    )
    .inspect_err(|err| tracing::warn!(reg_no = %student.reg_no, %err, "result rejected"))?;

    Ok(record)
}

fn print_result(record: &ResultRecord) {
    println!(
        "{} ({}) {} {} semester, session {}",
        record.student_name, record.reg_no, record.dept, record.semester, record.session
    );
    for subject in &record.result {
        println!(
            "- {} {} [{} cr] {} + {} + {} + {} = {} {} ({:.2})",
            subject.code,
            subject.title,
            subject.credit,
            subject.assignment,
            subject.classtest,
            subject.midterm,
            subject.final_exam,
            subject.total,
            subject.letter_grade,
            subject.grade_point
        );
    }
    println!(
        "Total {} GPA {:.2} ({})",
        record.total_number, record.grade_point_average, record.letter_grade_average
    );
}
