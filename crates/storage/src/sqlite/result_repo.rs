use quiz_core::model::{AnswerRecord, CompletionReason, Participant, QuizId, QuizResult};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, display_order, id_i64, option_id_from_i64, question_id_from_i64, quiz_id_from_i64, ser,
    u32_from_i64,
};
use crate::repository::{ResultId, ResultRow, ResultsSink, StorageError};

const RESULT_COLUMNS: &str = r"
    id, quiz_id, name, email, prn, year, division, batch, quiz_code,
    score, total_questions, cheating, completion, started_at, completed_at
";

#[async_trait::async_trait]
impl ResultsSink for SqliteRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let participant = result.participant();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO quiz_results (
                quiz_id, name, email, prn, year, division, batch, quiz_code,
                score, total_questions, cheating, completion, started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(id_i64("quiz_id", result.quiz_id().value())?)
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(&participant.prn)
        .bind(participant.year.as_deref())
        .bind(participant.division.as_deref())
        .bind(participant.batch.as_deref())
        .bind(&participant.quiz_code)
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total_questions()))
        .bind(i64::from(result.is_cheating()))
        .bind(result.completion().as_str())
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let result_id = res.last_insert_rowid();

        for (position, answer) in result.answers().iter().enumerate() {
            let selected = answer
                .selected
                .map(|id| id_i64("option_id", id.value()))
                .transpose()?;
            sqlx::query(
                r"
                INSERT INTO result_answers (result_id, position, question_id, selected_option_id)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(result_id)
            .bind(display_order(position)?)
            .bind(id_i64("question_id", answer.question_id.value())?)
            .bind(selected)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::info!(
            result_id,
            prn = %participant.prn,
            score = result.score(),
            cheating = result.is_cheating(),
            "quiz result stored"
        );
        Ok(result_id)
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM quiz_results WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let answers = self.load_answers(id).await?;
        result_from_row(&row, answers)
    }

    async fn list_results(&self, quiz_id: QuizId) -> Result<Vec<ResultRow>, StorageError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM quiz_results WHERE quiz_id = ?1 ORDER BY completed_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("quiz_id", quiz_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: ResultId = row.try_get("id").map_err(ser)?;
            let answers = self.load_answers(id).await?;
            out.push(ResultRow::new(id, result_from_row(&row, answers)?));
        }
        Ok(out)
    }
}

impl SqliteRepository {
    async fn load_answers(&self, result_id: ResultId) -> Result<Vec<AnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, selected_option_id
            FROM result_answers WHERE result_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(AnswerRecord {
                    question_id: question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
                    selected: row
                        .try_get::<Option<i64>, _>("selected_option_id")
                        .map_err(ser)?
                        .map(option_id_from_i64)
                        .transpose()?,
                })
            })
            .collect()
    }
}

fn result_from_row(row: &SqliteRow, answers: Vec<AnswerRecord>) -> Result<QuizResult, StorageError> {
    let participant = Participant {
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        prn: row.try_get("prn").map_err(ser)?,
        year: row.try_get("year").map_err(ser)?,
        division: row.try_get("division").map_err(ser)?,
        batch: row.try_get("batch").map_err(ser)?,
        quiz_code: row.try_get("quiz_code").map_err(ser)?,
    };
    let completion_raw: String = row.try_get("completion").map_err(ser)?;
    let completion = CompletionReason::parse(&completion_raw).ok_or_else(|| {
        StorageError::Serialization(format!("invalid completion: {completion_raw}"))
    })?;

    QuizResult::from_persisted(
        participant,
        quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?,
        u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
        row.try_get::<i64, _>("cheating").map_err(ser)? != 0,
        completion,
        answers,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
