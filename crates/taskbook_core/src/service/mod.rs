//! Core use-case services.
//!
//! # Responsibility
//! - Combine the in-memory store with write-through persistence.
//! - Keep front ends decoupled from locking and storage details.

pub mod task_service;
