//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into transactional use-case APIs.
//! - Map repository failures onto the service error taxonomy.

pub mod allocation;
pub mod cooling_service;
pub mod error;
