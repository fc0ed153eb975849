//! Admission control: dual fixed-window budgets per scope.
//!
//! This component knows nothing about doctypes or policy; it is a pure
//! rate primitive reusable by any call path. `try_acquire` never
//! blocks -- the caller surfaces a denial instead of retrying.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Sweep idle scopes once per this many acquisitions.
const GC_EVERY: u64 = 256;

#[derive(Debug)]
struct FixedWindow {
    len: Duration,
    start: Instant,
    count: u32,
}

impl FixedWindow {
    fn new(len: Duration, now: Instant) -> Self {
        Self {
            len,
            start: now,
            count: 0,
        }
    }

    /// Reset the counter at window boundaries.
    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.start) >= self.len {
            self.start = now;
            self.count = 0;
        }
    }
}

#[derive(Debug)]
struct ScopeState {
    minute: FixedWindow,
    hour: FixedWindow,
    last_seen: Instant,
}

impl ScopeState {
    fn new(now: Instant) -> Self {
        Self {
            minute: FixedWindow::new(MINUTE, now),
            hour: FixedWindow::new(HOUR, now),
            last_seen: now,
        }
    }

    /// Both budgets are checked before either is consumed, so a denial
    /// never burns quota.
    fn acquire(&mut self, per_minute: u32, per_hour: u32, now: Instant) -> bool {
        self.last_seen = now;
        self.minute.roll(now);
        self.hour.roll(now);

        if self.minute.count >= per_minute || self.hour.count >= per_hour {
            return false;
        }
        self.minute.count += 1;
        self.hour.count += 1;
        true
    }
}

/// Process-wide rate limiter. Scope counters are created lazily on
/// first use and garbage-collected after a period of inactivity so
/// per-identity limiting stays bounded.
pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    gc_idle: Duration,
    scopes: DashMap<String, Mutex<ScopeState>>,
    calls: AtomicU64,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32, gc_idle: Duration) -> Self {
        Self {
            per_minute,
            per_hour,
            gc_idle,
            scopes: DashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Non-blocking admission check for one request in `scope`.
    pub fn try_acquire(&self, scope: &str) -> bool {
        self.try_acquire_at(scope, Instant::now())
    }

    fn try_acquire_at(&self, scope: &str, now: Instant) -> bool {
        if self.calls.fetch_add(1, Ordering::Relaxed) % GC_EVERY == GC_EVERY - 1 {
            self.sweep(now);
        }

        let entry = self
            .scopes
            .entry(scope.to_string())
            .or_insert_with(|| Mutex::new(ScopeState::new(now)));

        let mut state = match entry.lock() {
            Ok(g) => g,
            // Poisoned state is only counters; keep serving.
            Err(poisoned) => poisoned.into_inner(),
        };
        state.acquire(self.per_minute, self.per_hour, now)
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn sweep(&self, now: Instant) {
        let idle = self.gc_idle;
        self.scopes.retain(|_, state| match state.lock() {
            Ok(s) => now.duration_since(s.last_seen) < idle,
            Err(_) => false,
        });
    }
}
