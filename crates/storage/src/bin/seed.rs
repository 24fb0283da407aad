use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use storage::quiz_file::{ImportedQuiz, QuizFile, load_quiz_file};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

const SAMPLE_QUIZ: &str = r#"
[quiz]
code = "DEMO"
title = "Demo Quiz"
instructions = "Answer every question. Leaving fullscreen twice ends the quiz."
duration_minutes = 10
starts_at = "2000-01-01T00:00:00Z"
ends_at = "2000-01-01T00:00:01Z"

[[sections]]
title = "General"

[[sections.questions]]
text = "What is 2 + 2?"

[[sections.questions.options]]
text = "3"

[[sections.questions.options]]
text = "4"
correct = true

[[sections.questions]]
text = "Which planet is closest to the sun?"

[[sections.questions.options]]
text = "Mercury"
correct = true

[[sections.questions.options]]
text = "Venus"
"#;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    quiz_file: Option<PathBuf>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_now(raw: String) -> Result<DateTime<Utc>, ArgsError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ArgsError::InvalidNow { raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut quiz_file = std::env::var("QUIZ_FILE").ok().map(PathBuf::from);
        let mut now = std::env::var("QUIZ_NOW").ok().map(parse_now).transpose()?;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--file" => {
                    quiz_file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--now" => {
                    now = Some(parse_now(require_value(&mut args, "--now")?)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            quiz_file,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --file <path>             Quiz definition (TOML); a demo quiz is used if omitted");
    eprintln!("  --now <rfc3339>           Fixed current time; the demo quiz opens at this time");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_FILE, QUIZ_NOW");
}

/// The demo quiz is open for a day starting at `now`.
fn demo_quiz(now: DateTime<Utc>) -> Result<ImportedQuiz, Box<dyn std::error::Error>> {
    let mut quiz = QuizFile::parse(SAMPLE_QUIZ)?;
    quiz.quiz.starts_at = now;
    quiz.quiz.ends_at = now + Duration::days(1);
    Ok(quiz.into_quiz()?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let quiz = match &args.quiz_file {
        Some(path) => load_quiz_file(path).await?,
        None => demo_quiz(now)?,
    };
    storage.quizzes.upsert_quiz(&quiz.record, &quiz.sections).await?;

    println!(
        "Seeded quiz {} ({}) with {} sections and {} questions into {}",
        quiz.record.code,
        quiz.record.id,
        quiz.sections.len(),
        quiz.question_count(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "seed failed");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
