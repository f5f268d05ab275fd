// Event status service: records status changes and drives the job scheduler

use crate::models::{EventStatus, StatusChange, StatusRecord};
use crate::repository::EventStatusRepository;
use crate::scheduler::JobScheduler;
use crate::telemetry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Applies validated status changes: store write first, then the scheduler
/// transition. Changes for the same event are applied one at a time so that
/// the stored status and the job table agree once each call returns.
/// A per-event lock lives only while a change for that event is in flight.
pub struct EventStatusService {
    repository: EventStatusRepository,
    scheduler: Arc<JobScheduler>,
    transition_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EventStatusService {
    pub fn new(repository: EventStatusRepository, scheduler: Arc<JobScheduler>) -> Self {
        Self {
            repository,
            scheduler,
            transition_locks: DashMap::new(),
        }
    }

    #[instrument(skip(self, change), fields(event_id = %change.event_id, status = %change.status))]
    pub fn update_event_status(&self, change: StatusChange) -> StatusRecord {
        info!("Received status update");

        let lock = self
            .transition_locks
            .entry(change.event_id.clone())
            .or_default()
            .clone();
        {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            self.repository.save(&change.event_id, change.status);
            match change.status {
                EventStatus::Live => self.scheduler.on_live(&change.event_id),
                EventStatus::NotLive => self.scheduler.on_not_live(&change.event_id),
            }
        }
        // Held only by the map and this call: nobody else is waiting on it
        self.transition_locks.remove_if(&change.event_id, |_, held| {
            Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
        });
        telemetry::record_status_update(change.status.as_str());

        info!("Event status updated");
        StatusRecord {
            event_id: change.event_id,
            status: change.status,
        }
    }

    pub fn find_status(&self, event_id: &str) -> Option<EventStatus> {
        self.repository.find_status(event_id)
    }

    pub fn event_status_map(&self) -> HashMap<String, EventStatus> {
        let map = self.repository.find_all();
        debug!(events = map.len(), "Fetched event status map");
        map
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }
}
