use chrono::NaiveDate;

use crate::model::Timeslot;

use super::ledger::{BucketUsage, CapacityLedger};
use super::EngineError;

/// Bucket sizes, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityConfig {
    pub daily: u32,
    pub timeslot: u32,
}

impl CapacityConfig {
    pub fn new(daily: u32, timeslot: u32) -> Self {
        Self { daily, timeslot }
    }
}

/// Why an admission attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    DailyCapacity,
    TimeslotCapacity,
}

impl Rejection {
    pub fn label(self) -> &'static str {
        match self {
            Rejection::DailyCapacity => "daily_capacity",
            Rejection::TimeslotCapacity => "timeslot_capacity",
        }
    }

    pub fn into_error(self, timeslot: &Timeslot) -> EngineError {
        match self {
            Rejection::DailyCapacity => EngineError::DailyCapacityReached(timeslot.day()),
            Rejection::TimeslotCapacity => EngineError::TimeslotCapacityReached(timeslot.id.clone()),
        }
    }
}

/// One unit held in both the day and the slot bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Reservation {
    pub day: NaiveDate,
    pub timeslot_id: String,
}

/// Day unit taken, slot unit not yet. Must end in `complete` or `rollback`.
#[must_use]
struct PartialReservation {
    day: NaiveDate,
}

impl PartialReservation {
    fn complete(self, admission: &AdmissionController, timeslot: &Timeslot) -> Result<Reservation, Self> {
        if admission
            .slots
            .try_reserve(timeslot.id.clone(), admission.capacity.timeslot)
        {
            Ok(Reservation {
                day: self.day,
                timeslot_id: timeslot.id.clone(),
            })
        } else {
            Err(self)
        }
    }

    fn rollback(self, admission: &AdmissionController) {
        admission.days.release(&self.day);
    }
}

/// Two-level admission: one unit from the day bucket, then one from the
/// slot bucket, with the day unit returned if the slot is full.
pub struct AdmissionController {
    days: CapacityLedger<NaiveDate>,
    slots: CapacityLedger<String>,
    capacity: CapacityConfig,
}

impl AdmissionController {
    pub fn new(capacity: CapacityConfig) -> Self {
        Self {
            days: CapacityLedger::new(),
            slots: CapacityLedger::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> CapacityConfig {
        self.capacity
    }

    /// Day first, then slot. The order is fixed: the only compensation path
    /// is returning the day unit when the slot bucket refuses.
    pub fn reserve(&self, timeslot: &Timeslot) -> Result<Reservation, Rejection> {
        let day = timeslot.day();
        if !self.days.try_reserve(day, self.capacity.daily) {
            return Err(Rejection::DailyCapacity);
        }
        let partial = PartialReservation { day };
        partial.complete(self, timeslot).map_err(|partial| {
            partial.rollback(self);
            Rejection::TimeslotCapacity
        })
    }

    /// Return the slot unit, then the day unit, to the buckets the
    /// reservation was taken from. Callers must invoke this at most once per
    /// admitted delivery.
    pub fn release(&self, reservation: &Reservation) {
        self.slots.release(&reservation.timeslot_id);
        self.days.release(&reservation.day);
    }

    pub fn day_usage(&self, day: NaiveDate) -> Option<BucketUsage> {
        self.days.usage(&day)
    }

    pub fn slot_usage(&self, timeslot_id: &str) -> Option<BucketUsage> {
        self.slots.usage(&timeslot_id.to_string())
    }
}
