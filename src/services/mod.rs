// src/services/mod.rs

//! Business rules on top of `ExamStore`. Handlers stay thin and call into here.

pub mod assignment;
pub mod attempt;
pub mod exam;
pub mod scoring;
pub mod stats;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;
