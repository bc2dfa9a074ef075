use clap::{Args, ValueEnum};

/// How a semester name outside First..Eighth is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SemesterPolicy {
    /// Reject unknown names.
    #[default]
    Strict,
    /// Treat unknown names as the first semester.
    Lenient,
}

/// What a failing subject does to the semester GPA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailGate {
    /// Any F voids the semester: GPA 0.00, letter F.
    #[default]
    VoidSemester,
    /// Failed subjects are left out of the weighted average.
    ExcludeFailed,
}

#[derive(Debug, Clone, Copy, Default, Args)]
pub struct EngineConfig {
    #[arg(long, global = true, env = "RESULT_SEMESTER_POLICY", value_enum, default_value_t)]
    pub semester_policy: SemesterPolicy,
    #[arg(long, global = true, env = "RESULT_FAIL_GATE", value_enum, default_value_t)]
    pub fail_gate: FailGate,
}

pub fn database_url() -> anyhow::Result<String> {
    use anyhow::Context;

    std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")
}
