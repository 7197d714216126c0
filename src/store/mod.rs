// src/store/mod.rs

//! Persistence seam for users, exams, assignments and attempts.
//!
//! Handlers and services only talk to [`ExamStore`]; `PgStore` backs it with
//! Postgres and `MemoryStore` keeps everything in process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        assignment::{Assignment, AssignmentCreated, AssignmentFilter, AssignmentView},
        attempt::{Attempt, AttemptUpdate},
        exam::{CreateExamRequest, Exam, ExamSummary},
        user::{Role, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn create_user(&self, username: &str, role: Role) -> AppResult<User>;
    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn update_user_role(&self, id: i64, role: Role) -> AppResult<Option<User>>;

    /// Persists an already validated exam with its questions and options.
    async fn create_exam(&self, exam: &CreateExamRequest) -> AppResult<Exam>;
    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>>;
    async fn list_exams(&self) -> AppResult<Vec<ExamSummary>>;

    /// Deletes an exam. Fails with `Conflict` while any assignment references it.
    async fn delete_exam(&self, id: i64) -> AppResult<()>;

    /// Creates the assignment and its `assigned` attempt atomically.
    /// Fails with `DuplicateAssignment` when the pair exists.
    async fn create_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<AssignmentCreated>;

    /// Removes the assignment and its attempt while the attempt is still `assigned`.
    /// Fails with `NotFound` or `AttemptInProgress`.
    async fn delete_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<Assignment>;

    async fn list_assignments(&self, filter: &AssignmentFilter) -> AppResult<Vec<AssignmentView>>;

    async fn find_attempt(&self, id: i64) -> AppResult<Option<Attempt>>;
    async fn list_user_attempts(&self, user_id: i64) -> AppResult<Vec<Attempt>>;

    /// Applies `update` only if the attempt is still in `update.expected_status()`.
    ///
    /// Returns `None` when no attempt in that status exists, so concurrent
    /// transitions on one attempt cannot both succeed.
    async fn apply_attempt_update(
        &self,
        id: i64,
        update: &AttemptUpdate,
    ) -> AppResult<Option<Attempt>>;
}
