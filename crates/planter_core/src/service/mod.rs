//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls around the pure tree algorithms.
//! - Keep callers decoupled from storage details.

pub mod task_service;
