use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Datelike, Duration, NaiveDate};
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

// ── Timeslot catalog ─────────────────────────────────────────

/// Read-mostly set of timeslots, replaced wholesale by the loader.
pub trait TimeslotCatalog: Send + Sync {
    fn find_by_id(&self, id: &str) -> Option<Arc<Timeslot>>;

    /// Snapshot of the full catalog as of one instant.
    fn all(&self) -> Vec<Arc<Timeslot>>;

    /// Swap in a new catalog. Readers see either the old or the new set.
    fn replace(&self, timeslots: Vec<Timeslot>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type CatalogSnapshot = Arc<HashMap<String, Arc<Timeslot>>>;

pub struct InMemoryCatalog {
    current: RwLock<CatalogSnapshot>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    pub fn with_timeslots(timeslots: Vec<Timeslot>) -> Self {
        let catalog = Self::new();
        catalog.replace(timeslots);
        catalog
    }

    fn snapshot(&self) -> CatalogSnapshot {
        // The lock only guards the pointer swap; a poisoned lock still holds
        // a complete snapshot.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TimeslotCatalog for InMemoryCatalog {
    fn find_by_id(&self, id: &str) -> Option<Arc<Timeslot>> {
        if id.trim().is_empty() {
            return None;
        }
        self.snapshot().get(id).cloned()
    }

    fn all(&self) -> Vec<Arc<Timeslot>> {
        self.snapshot().values().cloned().collect()
    }

    fn replace(&self, timeslots: Vec<Timeslot>) {
        let next: HashMap<String, Arc<Timeslot>> = timeslots
            .into_iter()
            .map(|ts| (ts.id.clone(), Arc::new(ts)))
            .collect();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }
}

// ── Delivery store ───────────────────────────────────────────

/// Outcome of [`DeliveryStore::transition`]: the delivery as stored after
/// the call, and what happened to its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub delivery: Delivery,
    pub transition: Transition,
}

pub trait DeliveryStore: Send + Sync {
    fn save(&self, delivery: Delivery) -> Delivery;

    fn find_by_id(&self, id: &Ulid) -> Option<Delivery>;

    /// Move a delivery to `to` as one atomic step per delivery. Two callers
    /// racing to the same status see exactly one `Transition::Applied`.
    /// Returns `None` for an unknown id.
    fn transition(&self, id: &Ulid, to: DeliveryStatus) -> Option<StatusUpdate>;

    /// Deliveries created on `date`.
    fn find_by_date(&self, date: NaiveDate) -> Vec<Delivery>;

    /// Deliveries created Monday..=Sunday of the week holding `any_day`.
    fn find_by_week(&self, any_day: NaiveDate) -> Vec<Delivery>;

    /// Non-cancelled deliveries created on `date`.
    fn count_active_on(&self, date: NaiveDate) -> usize;
}

pub struct InMemoryDeliveryStore {
    deliveries: DashMap<Ulid, Delivery>,
}

impl Default for InMemoryDeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self {
            deliveries: DashMap::new(),
        }
    }

    fn collect_where(&self, pred: impl Fn(&Delivery) -> bool) -> Vec<Delivery> {
        let mut out: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|e| pred(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|d| (d.created_at, d.id));
        out
    }
}

pub(crate) fn week_bounds(any_day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = any_day - Duration::days(i64::from(any_day.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

impl DeliveryStore for InMemoryDeliveryStore {
    fn save(&self, delivery: Delivery) -> Delivery {
        self.deliveries.insert(delivery.id, delivery.clone());
        delivery
    }

    fn find_by_id(&self, id: &Ulid) -> Option<Delivery> {
        self.deliveries.get(id).map(|e| e.value().clone())
    }

    fn transition(&self, id: &Ulid, to: DeliveryStatus) -> Option<StatusUpdate> {
        // get_mut holds the shard write lock for the check-and-set.
        let mut entry = self.deliveries.get_mut(id)?;
        let transition = entry.status.transition_to(to);
        if transition == Transition::Applied {
            entry.status = to;
        }
        Some(StatusUpdate {
            delivery: entry.value().clone(),
            transition,
        })
    }

    fn find_by_date(&self, date: NaiveDate) -> Vec<Delivery> {
        self.collect_where(|d| d.created_on() == date)
    }

    fn find_by_week(&self, any_day: NaiveDate) -> Vec<Delivery> {
        let (start, end) = week_bounds(any_day);
        self.collect_where(|d| {
            let day = d.created_on();
            start <= day && day <= end
        })
    }

    fn count_active_on(&self, date: NaiveDate) -> usize {
        self.deliveries
            .iter()
            .filter(|e| e.created_on() == date && e.status != DeliveryStatus::Cancelled)
            .count()
    }
}
