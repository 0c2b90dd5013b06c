//! Shared helpers: timestamps and student id generation.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const STUDENT_ID_LEN: usize = 12;

/// Current time as milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a random student identity token.
pub fn new_student_id() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STUDENT_ID_LEN)
        .map(char::from)
        .collect();
    format!("student-{}", token.to_lowercase())
}

/// Source of "now" for components that make time-based decisions.
///
/// The aggregator and agent take a clock so staleness and heartbeats can be
/// tested without sleeping.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        now_millis()
    }
}
