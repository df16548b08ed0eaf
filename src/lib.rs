//! WEBTRACK — Versioned periodic web value tracker
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod parse;
pub mod query;
pub mod fetch;
pub mod storage;
pub mod engine;
