use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, error};

use crate::model::*;
use crate::observability;

use super::Engine;

/// A timeslot is blocked when its start date is a holiday.
pub fn is_holiday(timeslot: &Timeslot, holidays: &HashSet<NaiveDate>) -> bool {
    holidays.contains(&timeslot.day())
}

/// Keep timeslots that structurally support `address` and do not fall on a
/// holiday, ordered by start time. Past timeslots are not filtered out.
pub fn filter_available(
    timeslots: Vec<Arc<Timeslot>>,
    address: &Address,
    holidays: &HashSet<NaiveDate>,
) -> Vec<Arc<Timeslot>> {
    let mut available: Vec<Arc<Timeslot>> = timeslots
        .into_iter()
        .filter(|ts| ts.supports(address) && !is_holiday(ts, holidays))
        .collect();
    available.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    available
}

impl Engine {
    /// Timeslots that can serve `address`, excluding holidays in the
    /// address's country for the current year.
    pub async fn available_timeslots(&self, address: &Address) -> Vec<Arc<Timeslot>> {
        self.available_timeslots_in(address, Local::now().year()).await
    }

    /// Catalog snapshot and holiday lookup run as two concurrent tasks and
    /// are both joined. If either task fails the whole answer is empty
    /// rather than partially filtered.
    pub async fn available_timeslots_in(&self, address: &Address, year: i32) -> Vec<Arc<Timeslot>> {
        let started = Instant::now();

        let catalog = self.catalog.clone();
        let catalog_task = tokio::spawn(async move { catalog.all() });

        let holidays = self.holidays.clone();
        let country = address.country.clone();
        let holiday_task = tokio::spawn(async move { holidays.get(&country, year).await });

        let (timeslots, holidays) = tokio::join!(catalog_task, holiday_task);
        let available = match (timeslots, holidays) {
            (Ok(timeslots), Ok(holidays)) => {
                debug!(
                    "availability for {}: {} timeslots, {} holidays",
                    address.country,
                    timeslots.len(),
                    holidays.len()
                );
                filter_available(timeslots, address, &holidays)
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("availability lookup failed, returning no timeslots: {e}");
                metrics::counter!(observability::AVAILABILITY_FAILED_OPEN_TOTAL).increment(1);
                Vec::new()
            }
        };

        metrics::histogram!(observability::AVAILABILITY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        available
    }
}
