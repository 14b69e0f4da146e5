// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod functions;
pub mod maintenance;
pub mod profile;
pub mod quiz;
