// src/services/test_support.rs

use crate::models::exam::{CreateExamRequest, CreateOptionRequest, CreateQuestionRequest};

/// Builds an exam request with one question per mark; option 0 is correct.
pub(crate) fn exam_request(name: &str, marks: &[i32]) -> CreateExamRequest {
    CreateExamRequest {
        certification_name: name.to_string(),
        pass_mark: marks.iter().sum::<i32>() / 2,
        total_mark: None,
        questions: marks
            .iter()
            .enumerate()
            .map(|(i, mark)| CreateQuestionRequest {
                text: format!("Question {}", i + 1),
                mark: *mark,
                options: vec![
                    CreateOptionRequest {
                        text: "right".to_string(),
                        is_correct: true,
                    },
                    CreateOptionRequest {
                        text: "wrong".to_string(),
                        is_correct: false,
                    },
                ],
            })
            .collect(),
    }
}
