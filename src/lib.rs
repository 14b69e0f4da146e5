// src/lib.rs

pub mod config;
pub mod credentials;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod privileged;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

pub use routes::create_router;
