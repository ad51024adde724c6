//! Durable storage of the store collections.
//!
//! # Responsibility
//! - Isolate the key/value medium from store and service logic.
//! - Keep encoding and key naming in one place.
//!
//! # Invariants
//! - One key per collection, namespaced under a shared prefix.

pub mod kv_repo;
pub mod persistence;
