// In-memory event status repository

use crate::models::EventStatus;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe mapping from event identifier to its latest status.
///
/// Backed by a sharded map: writes to unrelated identifiers do not contend,
/// writes to the same identifier are serialized and the last one to complete wins.
/// Records are never removed; an identifier that was never saved is reported as
/// absent, which is distinct from [`EventStatus::NotLive`].
#[derive(Debug, Clone, Default)]
pub struct EventStatusRepository {
    statuses: Arc<DashMap<String, EventStatus>>,
}

impl EventStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status for `event_id`
    pub fn save(&self, event_id: &str, status: EventStatus) {
        let previous = self.statuses.insert(event_id.to_string(), status);
        debug!(event_id, %status, previous = ?previous, "Event status saved");
    }

    /// Current status for `event_id`, or `None` if it was never recorded
    pub fn find_status(&self, event_id: &str) -> Option<EventStatus> {
        self.statuses.get(event_id).map(|entry| *entry.value())
    }

    /// Point-in-time copy of every record, in no particular order
    pub fn find_all(&self) -> HashMap<String, EventStatus> {
        self.statuses
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_event_is_absent() {
        let repo = EventStatusRepository::new();
        assert_eq!(repo.find_status("never-seen"), None);
    }

    #[test]
    fn test_latest_write_wins() {
        let repo = EventStatusRepository::new();
        repo.save("E1", EventStatus::Live);
        repo.save("E1", EventStatus::NotLive);
        assert_eq!(repo.find_status("E1"), Some(EventStatus::NotLive));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_find_all_is_a_snapshot() {
        let repo = EventStatusRepository::new();
        repo.save("E1", EventStatus::Live);
        let snapshot = repo.find_all();
        repo.save("E2", EventStatus::Live);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(repo.find_all().len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let repo = EventStatusRepository::new();
        let other = repo.clone();
        other.save("E1", EventStatus::Live);
        assert_eq!(repo.find_status("E1"), Some(EventStatus::Live));
    }
}
