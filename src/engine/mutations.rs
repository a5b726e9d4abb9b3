use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::{now_local, Engine, EngineError, Reservation};

fn validate_booking_input(user: &str, timeslot_id: &str) -> Result<(), EngineError> {
    if user.trim().is_empty() {
        return Err(EngineError::LimitExceeded("user must not be empty"));
    }
    if user.len() > MAX_USER_LEN {
        return Err(EngineError::LimitExceeded("user too long"));
    }
    if timeslot_id.len() > MAX_TIMESLOT_ID_LEN {
        return Err(EngineError::LimitExceeded("timeslot id too long"));
    }
    Ok(())
}

impl Engine {
    /// Book a delivery into a timeslot. Takes one day unit and one slot unit;
    /// on success the delivery is stored as PENDING.
    pub fn book(&self, user: &str, timeslot_id: &str) -> Result<Delivery, EngineError> {
        if let Err(e) = validate_booking_input(user, timeslot_id) {
            metrics::counter!(observability::BOOKINGS_TOTAL, "outcome" => "rejected").increment(1);
            return Err(e);
        }

        let Some(timeslot) = self.catalog.find_by_id(timeslot_id) else {
            metrics::counter!(observability::BOOKINGS_TOTAL, "outcome" => "unknown_timeslot")
                .increment(1);
            return Err(EngineError::UnknownTimeslot(timeslot_id.to_string()));
        };

        let reservation = self.admission.reserve(&timeslot).map_err(|rejection| {
            metrics::counter!(observability::BOOKINGS_TOTAL, "outcome" => rejection.label())
                .increment(1);
            debug!("booking rejected for {timeslot_id}: {}", rejection.label());
            rejection.into_error(&timeslot)
        })?;

        let delivery = self.deliveries.save(Delivery::pending(
            user.to_string(),
            reservation.timeslot_id,
            reservation.day,
            now_local(),
        ));
        metrics::counter!(observability::BOOKINGS_TOTAL, "outcome" => "admitted").increment(1);
        info!("booked delivery {} into {} ({})", delivery.id, timeslot.id, reservation.day);
        Ok(delivery)
    }

    /// Mark a delivery COMPLETED. Completing twice is a no-op. The delivery
    /// keeps its capacity units.
    pub fn complete(&self, id: Ulid) -> Result<Delivery, EngineError> {
        let (delivery, applied) = self.move_to(id, DeliveryStatus::Completed)?;
        if applied {
            metrics::counter!(observability::COMPLETIONS_TOTAL).increment(1);
            info!("completed delivery {id}");
        }
        Ok(delivery)
    }

    /// Mark a delivery CANCELLED and hand its capacity units back. Cancelling
    /// twice is a no-op and releases nothing the second time.
    pub fn cancel(&self, id: Ulid) -> Result<Delivery, EngineError> {
        let (delivery, applied) = self.move_to(id, DeliveryStatus::Cancelled)?;
        if !applied {
            return Ok(delivery);
        }
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);

        match self.catalog.find_by_id(&delivery.timeslot_id) {
            Some(_) => {
                // Units go back to the day taken at booking, which a reload
                // may have moved the timeslot away from.
                self.admission.release(&Reservation {
                    day: delivery.reserved_day,
                    timeslot_id: delivery.timeslot_id.clone(),
                });
                info!(
                    "cancelled delivery {id}, released capacity on {} ({})",
                    delivery.timeslot_id, delivery.reserved_day
                );
            }
            None => {
                // The catalog no longer knows the slot; its units stay taken.
                metrics::counter!(observability::CAPACITY_RELEASE_SKIPPED_TOTAL).increment(1);
                warn!(
                    "cancelled delivery {id}, timeslot {} no longer in catalog; capacity not released",
                    delivery.timeslot_id
                );
            }
        }
        Ok(delivery)
    }

    /// Apply a status change through the store. Returns the stored delivery
    /// and whether this call was the one that changed it.
    fn move_to(&self, id: Ulid, to: DeliveryStatus) -> Result<(Delivery, bool), EngineError> {
        let update = self
            .deliveries
            .transition(&id, to)
            .ok_or(EngineError::DeliveryNotFound(id))?;
        match update.transition {
            Transition::Applied => Ok((update.delivery, true)),
            Transition::Unchanged => Ok((update.delivery, false)),
            Transition::Refused { from } => Err(EngineError::InvalidTransition { id, from, to }),
        }
    }
}
