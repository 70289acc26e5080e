//! Chronological event history of one stack.

use super::types::StackEvent;

/// Events of a stack, oldest first.
///
/// Merging only ever appends events strictly newer than the last known one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<StackEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// All events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[StackEvent] {
        &self.events
    }

    /// Most recent event.
    #[must_use]
    pub fn last(&self) -> Option<&StackEvent> {
        self.events.last()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merges a fetched history, given newest first as the service returns it.
    ///
    /// Events at or before the log's last timestamp are dropped. Events
    /// sharing a timestamp within one batch are all kept. Returns the
    /// appended events, oldest first.
    pub fn merge(&mut self, fetched: Vec<StackEvent>) -> Vec<StackEvent> {
        let mut batch = fetched;
        batch.reverse();
        batch.sort_by_key(|event| event.timestamp);

        let cutoff = self.last().map(|event| event.timestamp);
        let fresh: Vec<StackEvent> = batch
            .into_iter()
            .filter(|event| cutoff.is_none_or(|last| event.timestamp > last))
            .collect();

        self.events.extend(fresh.iter().cloned());
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn event(secs: i64, logical_id: &str) -> StackEvent {
        StackEvent {
            timestamp: DateTime::<Utc>::from_timestamp(secs, 0).expect("time"),
            logical_id: logical_id.to_string(),
            resource_type: String::from("AWS::S3::Bucket"),
            status: String::from("CREATE_IN_PROGRESS"),
            reason: None,
        }
    }

    #[test]
    fn test_merge_into_empty_log_orders_oldest_first() {
        let mut log = EventLog::new();
        let fresh = log.merge(vec![event(3, "c"), event(2, "b"), event(1, "a")]);

        let ids: Vec<_> = log.events().iter().map(|e| e.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(fresh.len(), 3);
    }

    #[test]
    fn test_merge_appends_only_newer_events() {
        let mut log = EventLog::new();
        log.merge(vec![event(1, "a")]);

        let fresh = log.merge(vec![event(2, "b"), event(1, "a")]);

        assert_eq!(fresh, vec![event(2, "b")]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.last(), Some(&event(2, "b")));
    }

    #[test]
    fn test_merge_same_history_is_noop() {
        let mut log = EventLog::new();
        log.merge(vec![event(2, "b"), event(1, "a")]);
        let before = log.clone();

        assert!(log.merge(vec![event(2, "b"), event(1, "a")]).is_empty());
        assert_eq!(log, before);
    }

    #[test]
    fn test_merge_keeps_same_timestamp_batch() {
        let mut log = EventLog::new();
        log.merge(vec![event(1, "a")]);

        let fresh = log.merge(vec![event(5, "y"), event(5, "x"), event(1, "a")]);

        let ids: Vec<_> = fresh.iter().map(|e| e.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_merge_never_reorders_history() {
        let mut log = EventLog::new();
        log.merge(vec![event(10, "late")]);
        assert!(log.merge(vec![event(10, "late"), event(4, "stale")]).is_empty());
        assert_eq!(log.events(), &[event(10, "late")]);
    }
}
