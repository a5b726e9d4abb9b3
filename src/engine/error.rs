use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::DeliveryStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UnknownTimeslot(String),
    DailyCapacityReached(NaiveDate),
    TimeslotCapacityReached(String),
    DeliveryNotFound(Ulid),
    InvalidTransition {
        id: Ulid,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
    LimitExceeded(&'static str),
}

/// Payload-free classification of an [`EngineError`], stable for callers
/// that map outcomes onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownTimeslot,
    DailyCapacityReached,
    TimeslotCapacityReached,
    DeliveryNotFound,
    InvalidTransition,
    LimitExceeded,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnknownTimeslot(_) => ErrorKind::UnknownTimeslot,
            EngineError::DailyCapacityReached(_) => ErrorKind::DailyCapacityReached,
            EngineError::TimeslotCapacityReached(_) => ErrorKind::TimeslotCapacityReached,
            EngineError::DeliveryNotFound(_) => ErrorKind::DeliveryNotFound,
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::LimitExceeded(_) => ErrorKind::LimitExceeded,
        }
    }

    /// Capacity rejections may succeed later (after a cancellation); the
    /// rest will not change on retry.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            EngineError::DailyCapacityReached(_) | EngineError::TimeslotCapacityReached(_)
        )
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownTimeslot(id) => write!(f, "unknown timeslot: {id}"),
            EngineError::DailyCapacityReached(day) => {
                write!(f, "daily capacity reached for {day}")
            }
            EngineError::TimeslotCapacityReached(id) => {
                write!(f, "timeslot capacity reached for {id}")
            }
            EngineError::DeliveryNotFound(id) => write!(f, "delivery not found: {id}"),
            EngineError::InvalidTransition { id, from, to } => {
                write!(f, "delivery {id} is {from}, cannot move to {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
