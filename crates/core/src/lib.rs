//! Domain core for the questionnaire platform.
//!
//! This crate has no database or HTTP dependencies so it can be used by the
//! API server, the repository layer, and the client-side sync engine alike.

pub mod error;
pub mod identifier;
pub mod questionnaire;
pub mod rate_limit;
pub mod token;
pub mod types;
