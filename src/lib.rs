// Library root — exposes internals for integration tests and future crate consumers.
// The binary entry point is src/main.rs.

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod logger;
pub mod prompt;
pub mod search;
pub mod server;
pub mod study;
