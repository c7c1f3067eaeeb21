//! Sliding-window throttle gate keyed by `category:dedup-key`.
//!
//! The gate knows nothing about severity. Critical alerts that must bypass
//! it are handled by the dispatcher, which simply never asks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;

use crate::config::ThrottlingPolicy;
use crate::types::Category;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Millisecond time source, injectable so window arithmetic can be tested
/// without sleeping.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since construction, read from a monotonic clock so
/// wall-clock adjustments never stretch or shrink a window.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ThrottleEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThrottleEntry {
    pub count: u32,
    pub window_start_ms: u64,
}

// ---------------------------------------------------------------------------
// ThrottleGate
// ---------------------------------------------------------------------------

struct GateState {
    policy: ThrottlingPolicy,
    entries: HashMap<String, ThrottleEntry>,
}

pub struct ThrottleGate {
    state: Mutex<GateState>,
    clock: Arc<dyn Clock>,
}

impl ThrottleGate {
    pub fn new(policy: ThrottlingPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(policy: ThrottlingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GateState {
                policy,
                entries: HashMap::new(),
            }),
            clock,
        }
    }

    pub fn throttle_key(category: Category, key: &str) -> String {
        format!("{category}:{key}")
    }

    /// Record one attempt for `(category, key)` and report whether it must
    /// be suppressed. Throttled attempts do not increment the counter.
    pub fn should_throttle(&self, category: Category, key: &str) -> bool {
        let throttle_key = Self::throttle_key(category, key);
        let now = self.clock.now_ms();
        let mut state = self.lock();
        let window_ms = state.policy.window_ms;
        let max_per_window = state.policy.max_per_window;

        if let Some(entry) = state.entries.get_mut(&throttle_key) {
            if now.saturating_sub(entry.window_start_ms) >= window_ms {
                *entry = ThrottleEntry {
                    count: 1,
                    window_start_ms: now,
                };
                return false;
            }
            if entry.count >= max_per_window {
                return true;
            }
            entry.count += 1;
            return false;
        }

        if state.entries.len() >= state.policy.max_entries.max(1) {
            Self::make_room(&mut state, now);
        }
        state.entries.insert(
            throttle_key,
            ThrottleEntry {
                count: 1,
                window_start_ms: now,
            },
        );
        false
    }

    /// Drop entries whose window has already elapsed. Returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        Self::remove_stale(&mut state, now)
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, category: Category, key: &str) -> Option<ThrottleEntry> {
        self.lock()
            .entries
            .get(&Self::throttle_key(category, key))
            .copied()
    }

    pub fn policy(&self) -> ThrottlingPolicy {
        self.lock().policy.clone()
    }

    /// Swap the policy in place. Existing windows are kept and judged against
    /// the new limits from the next attempt on.
    pub fn set_policy(&self, policy: ThrottlingPolicy) {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        state.policy = policy;
        while state.entries.len() > state.policy.max_entries.max(1) {
            Self::make_room(&mut state, now);
        }
    }

    fn remove_stale(state: &mut GateState, now: u64) -> usize {
        let window_ms = state.policy.window_ms;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, e| now.saturating_sub(e.window_start_ms) < window_ms);
        before - state.entries.len()
    }

    fn make_room(state: &mut GateState, now: u64) {
        if Self::remove_stale(state, now) > 0 {
            return;
        }
        let oldest = state
            .entries
            .iter()
            .min_by_key(|(_, e)| e.window_start_ms)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            state.entries.remove(&key);
        }
    }

    // Window arithmetic cannot leave the map half-updated, so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ThrottleGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ThrottleGate")
            .field("policy", &state.policy)
            .field("entries", &state.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
