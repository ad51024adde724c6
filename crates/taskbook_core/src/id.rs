//! Identifier generation for tasks and subtasks.
//!
//! # Responsibility
//! - Provide one `IdGenerator` capability chosen at startup.
//! - Offer a non-cryptographic fallback for hosts without a strong RNG.
//!
//! # Invariants
//! - Ids returned by one generator instance are unique for the process
//!   lifetime.
//! - Call sites never branch on which generator is active.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Source of opaque, unique identifiers.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Strategy selector read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random v4 UUIDs from the OS entropy source.
    #[default]
    Uuid,
    /// Seeded pseudo-random stream plus a process-local counter.
    PseudoRandom,
}

/// Builds the generator for `strategy`.
pub fn id_generator(strategy: IdStrategy) -> Box<dyn IdGenerator> {
    match strategy {
        IdStrategy::Uuid => Box::new(UuidIdGenerator),
        IdStrategy::PseudoRandom => Box::new(PseudoRandomIdGenerator::new()),
    }
}

/// UUID v4 generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Fallback generator that never asks the OS for entropy.
///
/// Seeded from the clock and process id. The counter suffix keeps ids
/// unique within the instance even if the random stream repeats.
#[derive(Debug)]
pub struct PseudoRandomIdGenerator {
    rng: Mutex<StdRng>,
    counter: AtomicU64,
}

impl PseudoRandomIdGenerator {
    pub fn new() -> Self {
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| (elapsed.as_secs() << 30) ^ u64::from(elapsed.subsec_nanos()))
            .unwrap_or(0);
        Self::with_seed(clock ^ (u64::from(std::process::id()) << 32))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for PseudoRandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for PseudoRandomIdGenerator {
    fn new_id(&self) -> String {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let random: u64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen();
        format!("{random:016x}-{sequence:x}")
    }
}
