// src/handlers/mod.rs

pub mod answers;
pub mod correction;
pub mod health;
pub mod performance;
