//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and transport calls into use-case level APIs.
//! - Keep CLI layers decoupled from storage details.

pub mod daily_reset;
pub mod engine;
pub mod greeting;
pub mod matcher;
pub mod roster_service;
