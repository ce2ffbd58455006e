// src/services/mod.rs

pub mod correction;
pub mod grading;
pub mod performance;
pub mod submission;
