//! In-memory report cache.
//!
//! Reports are memoized per student and expire after a fixed TTL. Expiry is
//! checked on read; there is no other eviction.

use crate::clock::Clock;
use crate::models::StudentReport;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Storage for generated student reports.
pub trait ReportCache: Send + Sync {
    /// Returns a live entry for the student, if any.
    fn get(&self, student_id: &str) -> Option<StudentReport>;

    fn set(&self, student_id: &str, report: StudentReport);

    /// Drops every entry.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry {
    report: StudentReport,
    inserted_at: DateTime<Utc>,
}

/// Report cache whose entries live for a fixed duration.
pub struct TtlReportCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlReportCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        debug!("Report cache initialized with TTL of {}s", ttl.num_seconds());
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    fn is_live(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.inserted_at < self.ttl
    }
}

impl ReportCache for TtlReportCache {
    fn get(&self, student_id: &str) -> Option<StudentReport> {
        if let Some(entry) = self.entries.get(student_id) {
            if self.is_live(&entry) {
                debug!("Cache hit for student {}", student_id);
                return Some(entry.report.clone());
            }
        }

        if self
            .entries
            .remove_if(student_id, |_, entry| !self.is_live(entry))
            .is_some()
        {
            debug!("Cache entry for student {} expired", student_id);
        }
        None
    }

    fn set(&self, student_id: &str, report: StudentReport) {
        self.entries.insert(
            student_id.to_string(),
            CacheEntry {
                report,
                inserted_at: self.clock.now(),
            },
        );
    }

    fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        debug!("Cleared {} cached reports", dropped);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn setup() -> (Arc<ManualClock>, TtlReportCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap(),
        ));
        let cache = TtlReportCache::new(Duration::minutes(5), clock.clone());
        (clock, cache)
    }

    fn report(student_id: &str, clock: &ManualClock) -> StudentReport {
        StudentReport::fallback(student_id, clock.now())
    }

    #[test]
    fn test_get_returns_live_entry() {
        let (clock, cache) = setup();
        cache.set("s1", report("s1", &clock));

        clock.advance(Duration::minutes(4));
        let cached = cache.get("s1").unwrap();
        assert_eq!(cached.student_id, "s1");
        assert!(cache.get("s2").is_none());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = setup();
        cache.set("s1", report("s1", &clock));

        clock.advance(Duration::minutes(5));
        assert!(cache.get("s1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_replaces_entry_and_resets_age() {
        let (clock, cache) = setup();
        cache.set("s1", report("s1", &clock));
        clock.advance(Duration::minutes(3));
        cache.set("s1", report("s1", &clock));
        clock.advance(Duration::minutes(3));

        assert!(cache.get("s1").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let (clock, cache) = setup();
        cache.set("s1", report("s1", &clock));
        cache.set("s2", report("s2", &clock));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("s1").is_none());
    }
}
