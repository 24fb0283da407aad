use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerOption, Question, QuizId, Section};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use url::Url;

use super::SqliteRepository;
use super::mapping::{
    conn, display_order, id_i64, option_id_from_i64, question_id_from_i64, quiz_id_from_i64,
    section_id_from_i64, ser, u32_from_i64,
};
use crate::repository::{QuizRecord, QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(
        &self,
        quiz: &QuizRecord,
        sections: &[Section],
    ) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", quiz.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let taken = sqlx::query("SELECT 1 FROM quizzes WHERE code = ?1 AND id <> ?2")
            .bind(&quiz.code)
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if taken.is_some() {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
            INSERT INTO quizzes (id, code, title, instructions, duration_minutes, starts_at, ends_at, passing_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                code = excluded.code,
                title = excluded.title,
                instructions = excluded.instructions,
                duration_minutes = excluded.duration_minutes,
                starts_at = excluded.starts_at,
                ends_at = excluded.ends_at,
                passing_score = excluded.passing_score
            ",
        )
        .bind(quiz_id)
        .bind(&quiz.code)
        .bind(&quiz.title)
        .bind(quiz.instructions.as_deref())
        .bind(i64::from(quiz.duration_minutes))
        .bind(quiz.starts_at)
        .bind(quiz.ends_at)
        .bind(quiz.passing_score.map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Questions and options go with their sections.
        sqlx::query("DELETE FROM sections WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (s_idx, section) in sections.iter().enumerate() {
            let section_id = id_i64("section_id", section.id().value())?;
            sqlx::query(
                r"
                INSERT INTO sections (quiz_id, id, title, instructions, display_order)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(quiz_id)
            .bind(section_id)
            .bind(section.title())
            .bind(section.instructions())
            .bind(display_order(s_idx)?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (q_idx, question) in section.questions().iter().enumerate() {
                let question_id = id_i64("question_id", question.id().value())?;
                sqlx::query(
                    r"
                    INSERT INTO questions (quiz_id, id, section_id, text, image_url, display_order)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(quiz_id)
                .bind(question_id)
                .bind(section_id)
                .bind(question.text())
                .bind(question.image_url().map(Url::as_str))
                .bind(display_order(q_idx)?)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

                for (o_idx, option) in question.options().iter().enumerate() {
                    sqlx::query(
                        r"
                        INSERT INTO options (quiz_id, question_id, id, text, is_correct, display_order)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        ",
                    )
                    .bind(quiz_id)
                    .bind(question_id)
                    .bind(id_i64("option_id", option.id().value())?)
                    .bind(option.text())
                    .bind(i64::from(option.is_correct()))
                    .bind(display_order(o_idx)?)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
            }
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(quiz_id, code = %quiz.code, sections = sections.len(), "quiz stored");
        Ok(())
    }

    async fn find_quiz_by_code(&self, code: &str) -> Result<Option<QuizRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, code, title, instructions, duration_minutes, starts_at, ends_at, passing_score
            FROM quizzes WHERE code = ?1
            ",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(quiz_from_row).transpose()
    }

    async fn list_sections(&self, quiz_id: QuizId) -> Result<Vec<Section>, StorageError> {
        let id = id_i64("quiz_id", quiz_id.value())?;

        let exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let option_rows = sqlx::query(
            r"
            SELECT question_id, id, text, is_correct
            FROM options WHERE quiz_id = ?1
            ORDER BY question_id ASC, display_order ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut options: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for row in &option_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            let option = AnswerOption::new(
                option_id_from_i64(row.try_get("id").map_err(ser)?)?,
                row.try_get::<String, _>("text").map_err(ser)?,
                row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
            )
            .map_err(ser)?;
            options.entry(question_id).or_default().push(option);
        }

        let question_rows = sqlx::query(
            r"
            SELECT id, section_id, text, image_url
            FROM questions WHERE quiz_id = ?1
            ORDER BY section_id ASC, display_order ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions: HashMap<i64, Vec<Question>> = HashMap::new();
        for row in &question_rows {
            let raw_id: i64 = row.try_get("id").map_err(ser)?;
            let section_id: i64 = row.try_get("section_id").map_err(ser)?;
            let image_url = row
                .try_get::<Option<String>, _>("image_url")
                .map_err(ser)?
                .map(|raw| Url::parse(&raw))
                .transpose()
                .map_err(ser)?;
            let question = Question::new(
                question_id_from_i64(raw_id)?,
                section_id_from_i64(section_id)?,
                row.try_get::<String, _>("text").map_err(ser)?,
                options.remove(&raw_id).unwrap_or_default(),
                image_url,
            )
            .map_err(ser)?;
            questions.entry(section_id).or_default().push(question);
        }

        let section_rows = sqlx::query(
            r"
            SELECT id, title, instructions
            FROM sections WHERE quiz_id = ?1
            ORDER BY display_order ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sections = Vec::with_capacity(section_rows.len());
        for row in &section_rows {
            let raw_id: i64 = row.try_get("id").map_err(ser)?;
            sections.push(
                Section::new(
                    section_id_from_i64(raw_id)?,
                    row.try_get::<String, _>("title").map_err(ser)?,
                    row.try_get::<Option<String>, _>("instructions")
                        .map_err(ser)?,
                    questions.remove(&raw_id).unwrap_or_default(),
                )
                .map_err(ser)?,
            );
        }
        Ok(sections)
    }

    async fn has_attempt(&self, quiz_id: QuizId, prn: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM quiz_attempts WHERE quiz_id = ?1 AND prn = ?2")
            .bind(id_i64("quiz_id", quiz_id.value())?)
            .bind(prn)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn record_attempt(
        &self,
        quiz_id: QuizId,
        prn: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quiz_attempts (quiz_id, prn, attempted_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(quiz_id, prn) DO NOTHING
            ",
        )
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .bind(prn)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }
}

fn quiz_from_row(row: &SqliteRow) -> Result<QuizRecord, StorageError> {
    Ok(QuizRecord {
        id: quiz_id_from_i64(row.try_get("id").map_err(ser)?)?,
        code: row.try_get("code").map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        instructions: row.try_get("instructions").map_err(ser)?,
        duration_minutes: u32_from_i64(
            "duration_minutes",
            row.try_get("duration_minutes").map_err(ser)?,
        )?,
        starts_at: row.try_get("starts_at").map_err(ser)?,
        ends_at: row.try_get("ends_at").map_err(ser)?,
        passing_score: row
            .try_get::<Option<i64>, _>("passing_score")
            .map_err(ser)?
            .map(|v| u32_from_i64("passing_score", v))
            .transpose()?,
    })
}
