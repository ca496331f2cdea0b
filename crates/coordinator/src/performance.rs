//! Bounded in-memory record of recent orchestrations.

use conclave_common::{CollaborationType, IntentSummary, Timings};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// One completed orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Unix epoch milliseconds.
    pub timestamp: u64,
    pub request_id: String,
    pub query: String,
    pub intent: IntentSummary,
    pub collaboration_type: CollaborationType,
    pub timings: Timings,
    pub agents_used: Vec<String>,
    pub confidence: f32,
    pub fallback: bool,
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ring buffer of [`PerformanceRecord`]s, oldest evicted first.
pub struct PerformanceTracker {
    records: Mutex<VecDeque<PerformanceRecord>>,
    capacity: usize,
    classification_target_ms: f64,
}

impl PerformanceTracker {
    pub fn new(capacity: usize, classification_target_ms: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            classification_target_ms,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, then evict from the front until within capacity.
    pub fn record(&self, record: PerformanceRecord) {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Mean total processing time, or 0.0 with no records.
    pub fn average_processing_ms(&self) -> f64 {
        let records = self.records.lock();
        if records.is_empty() {
            return 0.0;
        }
        records.iter().map(|r| r.timings.total_ms).sum::<f64>() / records.len() as f64
    }

    /// `(under_target, total)` counts of classification latency.
    pub fn classification_within_target(&self) -> (usize, usize) {
        let records = self.records.lock();
        let under = records
            .iter()
            .filter(|r| r.timings.classification_ms < self.classification_target_ms)
            .count();
        (under, records.len())
    }

    /// Up to `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> Vec<PerformanceRecord> {
        self.records.lock().iter().rev().take(n).cloned().collect()
    }

    /// All records, oldest first.
    pub fn snapshot(&self) -> Vec<PerformanceRecord> {
        self.records.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_common::{IntentCategory, Urgency};

    fn record(id: usize, total_ms: f64, classification_ms: f64) -> PerformanceRecord {
        PerformanceRecord {
            timestamp: unix_millis(),
            request_id: format!("req-{id}"),
            query: "q".into(),
            intent: IntentSummary {
                category: IntentCategory::General,
                confidence: 0.3,
                complexity: 0.3,
                urgency: Urgency::Medium,
            },
            collaboration_type: CollaborationType::Single,
            timings: Timings {
                classification_ms,
                total_ms,
                ..Default::default()
            },
            agents_used: vec!["general-advisor".into()],
            confidence: 0.5,
            fallback: false,
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let tracker = PerformanceTracker::new(1000, 50.0);
        for i in 0..1005 {
            tracker.record(record(i, 10.0, 1.0));
        }

        assert_eq!(tracker.len(), 1000);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot[0].request_id, "req-5");
        assert_eq!(snapshot[999].request_id, "req-1004");
    }

    #[test]
    fn aggregates() {
        let tracker = PerformanceTracker::new(10, 50.0);
        assert!(tracker.is_empty());
        assert_eq!(tracker.average_processing_ms(), 0.0);
        assert_eq!(tracker.classification_within_target(), (0, 0));

        tracker.record(record(1, 100.0, 10.0));
        tracker.record(record(2, 300.0, 80.0));

        assert_eq!(tracker.average_processing_ms(), 200.0);
        assert_eq!(tracker.classification_within_target(), (1, 2));
    }

    #[test]
    fn recent_is_newest_first() {
        let tracker = PerformanceTracker::new(10, 50.0);
        for i in 0..5 {
            tracker.record(record(i, 1.0, 1.0));
        }

        let ids: Vec<_> = tracker.recent(2).into_iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec!["req-4", "req-3"]);
        assert_eq!(tracker.recent(50).len(), 5);
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let tracker = PerformanceTracker::new(0, 50.0);
        tracker.record(record(1, 1.0, 1.0));
        tracker.record(record(2, 1.0, 1.0));
        assert_eq!(tracker.capacity(), 1);
        assert_eq!(tracker.snapshot()[0].request_id, "req-2");
    }
}
