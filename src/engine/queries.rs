use std::sync::Arc;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::{now_local, Engine, EngineError};

impl Engine {
    pub fn delivery(&self, id: Ulid) -> Result<Delivery, EngineError> {
        self.deliveries
            .find_by_id(&id)
            .ok_or(EngineError::DeliveryNotFound(id))
    }

    pub fn timeslot(&self, id: &str) -> Result<Arc<Timeslot>, EngineError> {
        self.catalog
            .find_by_id(id)
            .ok_or_else(|| EngineError::UnknownTimeslot(id.to_string()))
    }

    /// Deliveries created on `date`, oldest first.
    pub fn deliveries_on(&self, date: NaiveDate) -> Vec<Delivery> {
        self.deliveries.find_by_date(date)
    }

    /// Deliveries created in the Monday-to-Sunday week holding `date`.
    pub fn deliveries_in_week(&self, date: NaiveDate) -> Vec<Delivery> {
        self.deliveries.find_by_week(date)
    }

    pub fn deliveries_today(&self) -> Vec<Delivery> {
        self.deliveries_on(now_local().date())
    }

    pub fn deliveries_this_week(&self) -> Vec<Delivery> {
        self.deliveries_in_week(now_local().date())
    }

    /// Non-cancelled deliveries created on `date`.
    pub fn active_deliveries_on(&self, date: NaiveDate) -> usize {
        self.deliveries.count_active_on(date)
    }
}
