mod admission;
mod availability;
mod error;
mod ledger;
mod mutations;
mod queries;
mod store;

pub use admission::{AdmissionController, CapacityConfig, Rejection, Reservation};
pub use availability::{filter_available, is_holiday};
pub use error::{EngineError, ErrorKind};
pub use ledger::{BucketUsage, CapacityLedger};
pub use store::{
    DeliveryStore, InMemoryCatalog, InMemoryDeliveryStore, StatusUpdate, TimeslotCatalog,
};

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use crate::holiday::HolidayCache;

/// The booking core: admission control, the delivery lifecycle, and the
/// availability resolver over a shared catalog and holiday cache.
///
/// Built once at start-up and shared behind an `Arc`; every method takes
/// `&self` and is safe to call from any number of tasks.
pub struct Engine {
    catalog: Arc<dyn TimeslotCatalog>,
    deliveries: Arc<dyn DeliveryStore>,
    admission: AdmissionController,
    holidays: Arc<HolidayCache>,
}

impl Engine {
    pub fn new(
        catalog: Arc<dyn TimeslotCatalog>,
        deliveries: Arc<dyn DeliveryStore>,
        capacity: CapacityConfig,
        holidays: Arc<HolidayCache>,
    ) -> Self {
        Self {
            catalog,
            deliveries,
            admission: AdmissionController::new(capacity),
            holidays,
        }
    }

    /// In-memory catalog and delivery store.
    pub fn in_memory(
        catalog: Arc<InMemoryCatalog>,
        capacity: CapacityConfig,
        holidays: Arc<HolidayCache>,
    ) -> Self {
        Self::new(catalog, Arc::new(InMemoryDeliveryStore::new()), capacity, holidays)
    }

    pub fn catalog(&self) -> &Arc<dyn TimeslotCatalog> {
        &self.catalog
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }
}

pub(crate) fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}
