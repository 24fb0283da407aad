use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates quizzes with their sections, questions and options, the attempt
/// ledger, and stored results with per-question answers.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id INTEGER PRIMARY KEY,
                    code TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    instructions TEXT,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                    starts_at TEXT NOT NULL,
                    ends_at TEXT NOT NULL,
                    passing_score INTEGER CHECK (passing_score IS NULL OR passing_score >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sections (
                    quiz_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    instructions TEXT,
                    display_order INTEGER NOT NULL,
                    PRIMARY KEY (quiz_id, id),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Question and option ids are scoped to their quiz.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    quiz_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    section_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    image_url TEXT,
                    display_order INTEGER NOT NULL,
                    PRIMARY KEY (quiz_id, id),
                    FOREIGN KEY (quiz_id, section_id) REFERENCES sections(quiz_id, id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS options (
                    quiz_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    display_order INTEGER NOT NULL,
                    PRIMARY KEY (quiz_id, question_id, id),
                    FOREIGN KEY (quiz_id, question_id) REFERENCES questions(quiz_id, id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_attempts (
                    quiz_id INTEGER NOT NULL,
                    prn TEXT NOT NULL,
                    attempted_at TEXT NOT NULL,
                    PRIMARY KEY (quiz_id, prn),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_results (
                    id INTEGER PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    prn TEXT NOT NULL,
                    year TEXT,
                    division TEXT,
                    batch TEXT,
                    quiz_code TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    cheating INTEGER NOT NULL CHECK (cheating IN (0, 1)),
                    completion TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS result_answers (
                    result_id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    selected_option_id INTEGER,
                    PRIMARY KEY (result_id, position),
                    FOREIGN KEY (result_id) REFERENCES quiz_results(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sections_quiz_order
                    ON sections(quiz_id, display_order);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_section_order
                    ON questions(quiz_id, section_id, display_order);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_options_question_order
                    ON options(quiz_id, question_id, display_order);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_results_quiz_completed
                    ON quiz_results(quiz_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
