// src/models/mod.rs

pub mod answer;
pub mod assessment;
pub mod correction;
pub mod performance;
pub mod question;
