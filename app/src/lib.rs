//! Command-line shell around the preview and redaction pipelines.

pub mod commands;
pub mod config;
