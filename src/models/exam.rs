// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// A certification exam with its ordered questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exam {
    pub id: i64,
    pub certification_name: String,

    /// Always equal to the sum of the question marks.
    pub total_mark: i32,

    /// Minimum score (in marks) needed to pass.
    pub pass_mark: i32,

    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn marks_sum(&self) -> i32 {
        self.questions.iter().map(|q| q.mark).sum()
    }

    pub fn question(&self, id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,
    /// Zero-based order within the exam.
    pub position: i32,
    pub text: String,
    pub mark: i32,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, id: i64) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// A selectable answer. Named to stay clear of `std::option::Option`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct AnswerOption {
    pub id: i64,
    pub position: i32,
    pub text: String,
    pub is_correct: bool,
}

/// Row of the `exams` table, without its questions.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub certification_name: String,
    pub total_mark: i32,
    pub pass_mark: i32,
    pub created_at: DateTime<Utc>,
}

impl ExamRow {
    pub fn with_questions(self, questions: Vec<Question>) -> Exam {
        Exam {
            id: self.id,
            certification_name: self.certification_name,
            total_mark: self.total_mark,
            pass_mark: self.pass_mark,
            created_at: self.created_at,
            questions,
        }
    }
}

/// List item for the admin exam overview.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamSummary {
    pub id: i64,
    pub certification_name: String,
    pub total_mark: i32,
    pub pass_mark: i32,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        ExamSummary {
            id: exam.id,
            certification_name: exam.certification_name.clone(),
            total_mark: exam.total_mark,
            pass_mark: exam.pass_mark,
            question_count: exam.questions.len() as i64,
            created_at: exam.created_at,
        }
    }
}

/// DTO for sending an exam paper to the candidate (excludes correctness flags).
#[derive(Debug, Serialize)]
pub struct PublicExam {
    pub id: i64,
    pub certification_name: String,
    pub total_mark: i32,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub mark: i32,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl From<Exam> for PublicExam {
    fn from(exam: Exam) -> Self {
        PublicExam {
            id: exam.id,
            certification_name: exam.certification_name,
            total_mark: exam.total_mark,
            questions: exam
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    text: q.text,
                    mark: q.mark,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| PublicOption {
                            id: o.id,
                            text: o.text,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// DTO for creating a new exam.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_marks))]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub certification_name: String,

    #[validate(range(min = 0))]
    pub pass_mark: i32,

    /// Optional client-computed total; must match the sum of question marks.
    pub total_mark: Option<i32>,

    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

impl CreateExamRequest {
    pub fn marks_sum(&self) -> i64 {
        self.questions.iter().map(|q| q.mark as i64).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_has_correct_option))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    #[validate(range(min = 1, max = 1000))]
    pub mark: i32,

    #[validate(length(min = 1, max = 10), nested)]
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

fn validate_has_correct_option(question: &CreateQuestionRequest) -> Result<(), ValidationError> {
    if !question.options.iter().any(|o| o.is_correct) {
        return Err(ValidationError::new("question_needs_correct_option"));
    }
    Ok(())
}

fn validate_marks(exam: &CreateExamRequest) -> Result<(), ValidationError> {
    let sum = exam.marks_sum();

    if let Some(total) = exam.total_mark {
        if total as i64 != sum {
            return Err(ValidationError::new("total_mark_must_equal_question_marks"));
        }
    }

    if exam.pass_mark as i64 > sum {
        return Err(ValidationError::new("pass_mark_exceeds_total_mark"));
    }
    Ok(())
}
