//! Core data models for the Jernih pollution-reporting service.
//!
//! These entities map onto SQLite tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`. Enumerated columns decode permissively: anything
//! unrecognised becomes an `Unknown` variant instead of a decode error.

pub mod article;
pub mod asset;
pub mod conservation;
pub mod profile;
pub mod report;
