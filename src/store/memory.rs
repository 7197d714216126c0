// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        assignment::{Assignment, AssignmentCreated, AssignmentFilter, AssignmentView},
        attempt::{Attempt, AttemptStatus, AttemptUpdate},
        exam::{AnswerOption, CreateExamRequest, Exam, ExamSummary, Question},
        user::{Role, User},
    },
    store::ExamStore,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    exams: BTreeMap<i64, Exam>,
    assignments: BTreeMap<i64, Assignment>,
    /// Keyed by attempt id.
    attempts: BTreeMap<i64, Attempt>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn attempt_for(&self, assignment_id: i64) -> Option<&Attempt> {
        self.attempts
            .values()
            .find(|a| a.assignment_id == assignment_id)
    }

    fn view(&self, assignment: &Assignment) -> Option<AssignmentView> {
        let exam = self.exams.get(&assignment.exam_id)?;
        let attempt = self.attempt_for(assignment.id)?;
        Some(AssignmentView {
            assignment_id: assignment.id,
            user_id: assignment.user_id,
            exam_id: assignment.exam_id,
            certification_name: exam.certification_name.clone(),
            total_mark: exam.total_mark,
            pass_mark: exam.pass_mark,
            assigned_at: assignment.created_at,
            attempt_id: attempt.id,
            status: attempt.status,
            score: attempt.score,
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
        })
    }
}

/// Process-local store. Every write holds the lock for its whole critical
/// section, which gives the same per-attempt serialisation as the
/// conditional updates in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn create_user(&self, username: &str, role: Role) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            role,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().rev().cloned().collect())
    }

    async fn update_user_role(&self, id: i64, role: Role) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn create_exam(&self, req: &CreateExamRequest) -> AppResult<Exam> {
        let mut tables = self.tables.write().await;
        let exam_id = tables.next_id();

        let mut questions = Vec::with_capacity(req.questions.len());
        for (q_pos, q) in req.questions.iter().enumerate() {
            let question_id = tables.next_id();
            let mut options = Vec::with_capacity(q.options.len());
            for (o_pos, o) in q.options.iter().enumerate() {
                options.push(AnswerOption {
                    id: tables.next_id(),
                    position: o_pos as i32,
                    text: o.text.clone(),
                    is_correct: o.is_correct,
                });
            }
            questions.push(Question {
                id: question_id,
                position: q_pos as i32,
                text: q.text.clone(),
                mark: q.mark,
                options,
            });
        }

        let exam = Exam {
            id: exam_id,
            certification_name: req.certification_name.clone(),
            total_mark: questions.iter().map(|q| q.mark).sum(),
            pass_mark: req.pass_mark,
            created_at: Utc::now(),
            questions,
        };
        tables.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }

    async fn list_exams(&self) -> AppResult<Vec<ExamSummary>> {
        let tables = self.tables.read().await;
        Ok(tables.exams.values().rev().map(ExamSummary::from).collect())
    }

    async fn delete_exam(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.exams.contains_key(&id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        if tables.assignments.values().any(|a| a.exam_id == id) {
            return Err(AppError::Conflict(format!(
                "Exam {} still has assignments",
                id
            )));
        }
        tables.exams.remove(&id);
        Ok(())
    }

    async fn create_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<AssignmentCreated> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if !tables.exams.contains_key(&exam_id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        if tables
            .assignments
            .values()
            .any(|a| a.user_id == user_id && a.exam_id == exam_id)
        {
            return Err(AppError::DuplicateAssignment { user_id, exam_id });
        }

        let now = Utc::now();
        let assignment = Assignment {
            id: tables.next_id(),
            user_id,
            exam_id,
            created_at: now,
        };
        let attempt = Attempt {
            id: tables.next_id(),
            assignment_id: assignment.id,
            user_id,
            exam_id,
            status: AttemptStatus::Assigned,
            score: None,
            termination_reason: None,
            started_at: None,
            completed_at: None,
            created_at: now,
        };
        tables.assignments.insert(assignment.id, assignment.clone());
        tables.attempts.insert(attempt.id, attempt.clone());

        Ok(AssignmentCreated {
            assignment,
            attempt,
        })
    }

    async fn delete_assignment(&self, user_id: i64, exam_id: i64) -> AppResult<Assignment> {
        let mut tables = self.tables.write().await;
        let assignment = tables
            .assignments
            .values()
            .find(|a| a.user_id == user_id && a.exam_id == exam_id)
            .cloned()
            .ok_or(AppError::NotFound("Assignment not found".to_string()))?;

        if let Some(attempt) = tables.attempt_for(assignment.id) {
            if attempt.status != AttemptStatus::Assigned {
                return Err(AppError::AttemptInProgress {
                    attempt_id: attempt.id,
                });
            }
        }

        tables.attempts.retain(|_, a| a.assignment_id != assignment.id);
        tables.assignments.remove(&assignment.id);
        Ok(assignment)
    }

    async fn list_assignments(&self, filter: &AssignmentFilter) -> AppResult<Vec<AssignmentView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .rev()
            .filter_map(|a| tables.view(a))
            .filter(|v| filter.matches(v))
            .collect())
    }

    async fn find_attempt(&self, id: i64) -> AppResult<Option<Attempt>> {
        Ok(self.tables.read().await.attempts.get(&id).cloned())
    }

    async fn list_user_attempts(&self, user_id: i64) -> AppResult<Vec<Attempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn apply_attempt_update(
        &self,
        id: i64,
        update: &AttemptUpdate,
    ) -> AppResult<Option<Attempt>> {
        let mut tables = self.tables.write().await;
        match tables.attempts.get_mut(&id) {
            Some(attempt) if attempt.status == update.expected_status() => {
                update.apply_to(attempt);
                Ok(Some(attempt.clone()))
            }
            _ => Ok(None),
        }
    }
}
