// src/models/mod.rs

pub mod config_result;
pub mod quiz;
pub mod submission;
pub mod user;
