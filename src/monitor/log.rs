//! Bounded error log.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::errors::{ErrorCategory, ErrorRecord, ErrorSeverity};
use crate::monitor::summary::MonitorSummary;
use crate::observability::metrics;

/// Window used by [`MonitorSummary::recent_errors_24h`].
pub const RECENT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_CRITICAL_LIMIT: usize = 10;

#[derive(Debug, Default)]
struct MonitorState {
    log: VecDeque<Arc<ErrorRecord>>,
    /// Lifetime counters; log eviction does not decrement them. At most
    /// `capacity` keys are tracked, the least recently bumped one is dropped first.
    counts_by_key: HashMap<String, KeyCount>,
    /// Monotonic bump sequence used to order keys by recency.
    bumps: u64,
}

#[derive(Debug, Clone, Copy)]
struct KeyCount {
    count: u64,
    last_bump: u64,
}

impl MonitorState {
    fn bump_key(&mut self, key: String, max_keys: usize) {
        self.bumps += 1;
        let seq = self.bumps;
        if let Some(entry) = self.counts_by_key.get_mut(&key) {
            entry.count += 1;
            entry.last_bump = seq;
            return;
        }

        if self.counts_by_key.len() >= max_keys {
            let stalest = self
                .counts_by_key
                .iter()
                .min_by_key(|(_, c)| c.last_bump)
                .map(|(k, _)| k.clone());
            if let Some(stalest) = stalest {
                self.counts_by_key.remove(&stalest);
            }
        }
        self.counts_by_key.insert(key, KeyCount { count: 1, last_bump: seq });
    }
}

/// In-memory ring buffer of error records with aggregate counters.
///
/// Appends are FIFO; once `capacity` is reached the oldest record is evicted.
#[derive(Debug)]
pub struct ErrorMonitor {
    state: Mutex<MonitorState>,
    capacity: usize,
    critical_limit: usize,
}

impl ErrorMonitor {
    /// Create a monitor holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self::with_limits(capacity, DEFAULT_CRITICAL_LIMIT)
    }

    pub fn with_limits(capacity: usize, critical_limit: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(MonitorState {
                log: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                counts_by_key: HashMap::new(),
                bumps: 0,
            }),
            capacity,
            critical_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&self, record: Arc<ErrorRecord>) {
        let size = {
            let mut state = self.lock();
            state.bump_key(record.key(), self.capacity);
            if state.log.len() == self.capacity {
                state.log.pop_front();
            }
            state.log.push_back(record);
            state.log.len()
        };
        metrics::record_monitor_size(size);
    }

    /// Aggregate view of the log as of now.
    pub fn summary(&self) -> MonitorSummary {
        self.summary_at(SystemTime::now())
    }

    /// Aggregate view of the log as of `now`.
    pub fn summary_at(&self, now: SystemTime) -> MonitorSummary {
        let state = self.lock();
        let cutoff = now.checked_sub(RECENT_WINDOW).unwrap_or(SystemTime::UNIX_EPOCH);

        let mut counts_by_category: HashMap<ErrorCategory, u64> = HashMap::new();
        let mut counts_by_severity: HashMap<ErrorSeverity, u64> = HashMap::new();
        let mut recent_errors_24h = 0;
        for record in &state.log {
            *counts_by_category.entry(record.category).or_insert(0) += 1;
            *counts_by_severity.entry(record.severity).or_insert(0) += 1;
            if record.timestamp > cutoff {
                recent_errors_24h += 1;
            }
        }

        let mut recent_critical_errors: Vec<Arc<ErrorRecord>> = state
            .log
            .iter()
            .rev()
            .filter(|r| r.severity == ErrorSeverity::Critical)
            .take(self.critical_limit)
            .cloned()
            .collect();
        recent_critical_errors.reverse();

        MonitorSummary {
            total_errors: state.log.len(),
            recent_errors_24h,
            counts_by_key: state
                .counts_by_key
                .iter()
                .map(|(key, c)| (key.clone(), c.count))
                .collect(),
            counts_by_category,
            counts_by_severity,
            recent_critical_errors,
        }
    }

    /// The newest `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<ErrorRecord>> {
        let state = self.lock();
        let skip = state.log.len().saturating_sub(limit);
        state.log.iter().skip(skip).cloned().collect()
    }

    /// Drop every record and counter.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.log.clear();
        state.counts_by_key.clear();
        drop(state);
        metrics::record_monitor_size(0);
        tracing::info!("Error monitor cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ErrorMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ApiError, ErrorContext};

    fn record_at(message: &str, severity: ErrorSeverity, timestamp: SystemTime) -> Arc<ErrorRecord> {
        Arc::new(ErrorRecord::at(
            ApiError::new(message),
            ErrorCategory::Internal,
            severity,
            ErrorContext::new(),
            None,
            timestamp,
        ))
    }

    fn record(message: &str) -> Arc<ErrorRecord> {
        record_at(message, ErrorSeverity::Medium, SystemTime::now())
    }

    #[test]
    fn test_bounded_log_evicts_oldest() {
        let monitor = ErrorMonitor::new(3);
        for i in 0..4 {
            monitor.record(record(&format!("e{}", i)));
        }

        assert_eq!(monitor.len(), 3);
        assert_eq!(monitor.summary().total_errors, 3);

        let messages: Vec<_> = monitor.recent(10).iter().map(|r| r.error.message.clone()).collect();
        assert_eq!(messages, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn test_counts() {
        let monitor = ErrorMonitor::new(2);
        monitor.record(record("same"));
        monitor.record(record("same"));
        monitor.record(record("same"));

        let summary = monitor.summary();
        assert_eq!(summary.total_errors, 2);
        assert_eq!(summary.counts_by_category[&ErrorCategory::Internal], 2);
        assert_eq!(summary.counts_by_severity[&ErrorSeverity::Medium], 2);
        // Lifetime counter keeps counting past eviction.
        assert_eq!(summary.counts_by_key["internal:same"], 3);
    }

    #[test]
    fn test_key_counters_stay_bounded() {
        let monitor = ErrorMonitor::new(10);
        for i in 0..5_000 {
            monitor.record(record(&format!("error sending request for url (http://api/items/{})", i)));
        }

        let summary = monitor.summary();
        assert_eq!(monitor.len(), 10);
        assert_eq!(summary.counts_by_key.len(), 10);
        assert!(summary
            .counts_by_key
            .contains_key("internal:error sending request for url (http://api/items/4999)"));
    }

    #[test]
    fn test_stalest_key_is_dropped_first() {
        let monitor = ErrorMonitor::new(2);
        monitor.record(record("a"));
        monitor.record(record("b"));
        monitor.record(record("a"));
        monitor.record(record("c"));

        let counts = monitor.summary().counts_by_key;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["internal:a"], 2);
        assert_eq!(counts["internal:c"], 1);
        assert!(!counts.contains_key("internal:b"));
    }

    #[test]
    fn test_recent_window_is_computed_at_query_time() {
        let now = SystemTime::now();
        let monitor = ErrorMonitor::new(10);
        monitor.record(record_at("old", ErrorSeverity::Low, now - Duration::from_secs(25 * 3600)));
        monitor.record(record_at("new", ErrorSeverity::Low, now - Duration::from_secs(3600)));

        assert_eq!(monitor.summary_at(now).recent_errors_24h, 1);
        assert_eq!(monitor.summary_at(now + RECENT_WINDOW).recent_errors_24h, 0);
    }

    #[test]
    fn test_recent_critical_errors_are_capped() {
        let monitor = ErrorMonitor::with_limits(100, 2);
        for i in 0..5 {
            monitor.record(record_at(&format!("c{}", i), ErrorSeverity::Critical, SystemTime::now()));
            monitor.record(record("noise"));
        }

        let critical = monitor.summary().recent_critical_errors;
        let messages: Vec<_> = critical.iter().map(|r| r.error.message.as_str()).collect();
        assert_eq!(messages, vec!["c3", "c4"]);
    }

    #[test]
    fn test_clear() {
        let monitor = ErrorMonitor::new(5);
        monitor.record(record("x"));
        monitor.clear();

        assert!(monitor.is_empty());
        assert!(monitor.summary().counts_by_key.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let monitor = ErrorMonitor::new(0);
        monitor.record(record("a"));
        monitor.record(record("b"));
        assert_eq!(monitor.capacity(), 1);
        assert_eq!(monitor.recent(5)[0].error.message, "b");
    }
}
