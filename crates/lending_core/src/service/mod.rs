//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate catalog mutations with their audit-log appends.
//! - Own the lending status policy.
//! - Keep callers decoupled from storage details.

pub mod lending_service;
pub mod status;
