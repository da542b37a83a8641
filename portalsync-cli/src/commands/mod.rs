//! CLI command implementations.

pub mod config;
pub mod once;
pub mod run;
pub mod status;
pub mod vendors;
