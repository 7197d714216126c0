// src/store/postgres.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        assignment::{Assignment, AssignmentCreated, AssignmentFilter, AssignmentView},
        attempt::{Attempt, AttemptStatus, AttemptUpdate},
        exam::{AnswerOption, CreateExamRequest, Exam, ExamRow, ExamSummary, Question},
        user::{Role, User},
    },
    store::ExamStore,
};

const CONNECT_RETRIES: u32 = 5;

/// Columns of an attempt joined with its assignment (`t` = attempts, `a` = assignments).
const ATTEMPT_COLUMNS: &str = "t.id, t.assignment_id, a.user_id, a.exam_id, t.status, t.score, \
     t.termination_reason, t.started_at, t.completed_at, t.created_at";

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    position: i32,
    text: String,
    mark: i32,
}

#[derive(FromRow)]
struct OptionRow {
    id: i64,
    question_id: i64,
    position: i32,
    text: String,
    is_correct: bool,
}

/// Helper struct for locking an assignment together with its attempt.
#[derive(FromRow)]
struct AssignmentLock {
    assignment_id: i64,
    attempt_id: i64,
    status: AttemptStatus,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to Postgres, retrying while the database is still starting up.
    pub async fn connect(database_url: &str, config: &Config) -> AppResult<Self> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after {} retries: {}",
                            CONNECT_RETRIES, e
                        )));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };

        tracing::info!("Database connected...");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations applied successfully.");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl ExamStore for PgStore {
    async fn create_user(&self, username: &str, role: Role) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, role) VALUES ($1, $2) \
             RETURNING id, username, role, created_at",
        )
        .bind(username)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user_role(&self, id: i64, role: Role) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1 WHERE id = $2 RETURNING id, username, role, created_at",
        )
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_exam(&self, req: &CreateExamRequest) -> AppResult<Exam> {
        let total_mark: i32 = req.questions.iter().map(|q| q.mark).sum();
        let mut tx = self.pool.begin().await?;

        let exam_row = sqlx::query_as::<_, ExamRow>(
            "INSERT INTO exams (certification_name, total_mark, pass_mark) VALUES ($1, $2, $3) \
             RETURNING id, certification_name, total_mark, pass_mark, created_at",
        )
        .bind(&req.certification_name)
        .bind(total_mark)
        .bind(req.pass_mark)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(req.questions.len());
        for (q_pos, q) in req.questions.iter().enumerate() {
            let question_id: i64 = sqlx::query_scalar(
                "INSERT INTO questions (exam_id, position, text, mark) VALUES ($1, $2, $3, $4) \
                 RETURNING id",
            )
            .bind(exam_row.id)
            .bind(q_pos as i32)
            .bind(&q.text)
            .bind(q.mark)
            .fetch_one(&mut *tx)
            .await?;

            let mut options = Vec::with_capacity(q.options.len());
            for (o_pos, o) in q.options.iter().enumerate() {
                let option = sqlx::query_as::<_, AnswerOption>(
                    "INSERT INTO options (question_id, position, text, is_correct) \
                     VALUES ($1, $2, $3, $4) RETURNING id, position, text, is_correct",
                )
                .bind(question_id)
                .bind(o_pos as i32)
                .bind(&o.text)
                .bind(o.is_correct)
                .fetch_one(&mut *tx)
                .await?;
                options.push(option);
            }

            questions.push(Question {
                id: question_id,
                position: q_pos as i32,
                text: q.text.clone(),
                mark: q.mark,
                options,
            });
        }

        tx.commit().await?;
        Ok(exam_row.with_questions(questions))
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        let Some(exam_row) = sqlx::query_as::<_, ExamRow>(
            "SELECT id, certification_name, total_mark, pass_mark, created_at \
             FROM exams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let question_rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, position, text, mark FROM questions WHERE exam_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let option_rows = sqlx::query_as::<_, OptionRow>(
            "SELECT o.id, o.question_id, o.position, o.text, o.is_correct \
             FROM options o JOIN questions q ON q.id = o.question_id \
             WHERE q.exam_id = $1 ORDER BY o.question_id, o.position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for row in option_rows {
            options_by_question
                .entry(row.question_id)
                .or_default()
                .push(AnswerOption {
                    id: row.id,
                    position: row.position,
                    text: row.text,
                    is_correct: row.is_correct,
                });
        }

        let questions = question_rows
            .into_iter()
            .map(|q| Question {
                options: options_by_question.remove(&q.id).unwrap_or_default(),
                id: q.id,
                position: q.position,
                text: q.text,
                mark: q.mark,
            })
            .collect();

        Ok(Some(exam_row.with_questions(questions)))
    }

    async fn list_exams(&self) -> AppResult<Vec<ExamSummary>> {
        let exams = sqlx::query_as::<_, ExamSummary>(
            r#"
            SELECT
                e.id, e.certification_name, e.total_mark, e.pass_mark,
                COUNT(q.id) AS question_count,
                e.created_at
            FROM exams e
            LEFT JOIN questions q ON q.exam_id = e.id
            GROUP BY e.id
            ORDER BY e.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn delete_exam(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock blocks concurrent assignment inserts that reference the exam.
        sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;

        let assigned: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM assignments WHERE exam_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if assigned {
            return Err(AppError::Conflict(format!(
                "Exam {} still has assignments",
                id
            )));
        }

        sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("Exam {} still has assignments", id))
                } else {
                    AppError::from(e)
                }
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<AssignmentCreated> {
        let mut tx = self.pool.begin().await?;

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let exam_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM exams WHERE id = $1)")
                .bind(exam_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exam_exists {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        let assignment = sqlx::query_as::<_, Assignment>(
            "INSERT INTO assignments (user_id, exam_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, exam_id) DO NOTHING \
             RETURNING id, user_id, exam_id, created_at",
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("User or exam not found".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or(AppError::DuplicateAssignment { user_id, exam_id })?;

        let attempt_id: i64 =
            sqlx::query_scalar("INSERT INTO attempts (assignment_id) VALUES ($1) RETURNING id")
                .bind(assignment.id)
                .fetch_one(&mut *tx)
                .await?;

        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts t JOIN assignments a ON a.id = t.assignment_id \
             WHERE t.id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AssignmentCreated {
            assignment,
            attempt,
        })
    }

    async fn delete_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let lock = sqlx::query_as::<_, AssignmentLock>(
            "SELECT a.id AS assignment_id, t.id AS attempt_id, t.status \
             FROM assignments a JOIN attempts t ON t.assignment_id = a.id \
             WHERE a.user_id = $1 AND a.exam_id = $2 \
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

        if lock.status != AttemptStatus::Assigned {
            return Err(AppError::AttemptInProgress {
                attempt_id: lock.attempt_id,
            });
        }

        let assignment = sqlx::query_as::<_, Assignment>(
            "DELETE FROM assignments WHERE id = $1 RETURNING id, user_id, exam_id, created_at",
        )
        .bind(lock.assignment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(assignment)
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> AppResult<Vec<AssignmentView>> {
        let views = sqlx::query_as::<_, AssignmentView>(
            r#"
            SELECT
                a.id AS assignment_id, a.user_id, a.exam_id,
                e.certification_name, e.total_mark, e.pass_mark,
                a.created_at AS assigned_at,
                t.id AS attempt_id, t.status, t.score, t.started_at, t.completed_at
            FROM assignments a
            JOIN exams e ON e.id = a.exam_id
            JOIN attempts t ON t.assignment_id = a.id
            WHERE ($1::BIGINT IS NULL OR a.user_id = $1)
              AND ($2::BIGINT IS NULL OR a.exam_id = $2)
              AND ($3::attempt_status IS NULL OR t.status = $3)
            ORDER BY a.id DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.exam_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(views)
    }

    async fn find_attempt(&self, id: i64) -> AppResult<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts t JOIN assignments a ON a.id = t.assignment_id \
             WHERE t.id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn list_user_attempts(&self, user_id: i64) -> AppResult<Vec<Attempt>> {
        let attempts = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts t JOIN assignments a ON a.id = t.assignment_id \
             WHERE a.user_id = $1 ORDER BY t.id",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn apply_attempt_update(
        &self,
        id: i64,
        update: &AttemptUpdate,
    ) -> AppResult<Option<Attempt>> {
        let (started_at, completed_at, score, reason) = match update {
            AttemptUpdate::Start { at } => (Some(*at), None, None, None),
            AttemptUpdate::Complete { at, score } => (None, Some(*at), Some(*score), None),
            AttemptUpdate::Terminate { at, reason } => (None, Some(*at), None, reason.clone()),
        };

        // The status guard in WHERE is what serialises transitions on one attempt.
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "UPDATE attempts t SET \
                 status = $2, \
                 started_at = COALESCE($3, t.started_at), \
                 completed_at = COALESCE($4, t.completed_at), \
                 score = COALESCE($5, t.score), \
                 termination_reason = COALESCE($6, t.termination_reason) \
             FROM assignments a \
             WHERE t.id = $1 AND t.status = $7 AND a.id = t.assignment_id \
             RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .bind(update.target_status())
        .bind(started_at)
        .bind(completed_at)
        .bind(score)
        .bind(reason)
        .bind(update.expected_status())
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }
}
