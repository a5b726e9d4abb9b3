use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// A courier delivery window and the address attributes it serves.
///
/// Each support set is a wildcard when empty: an empty `supported_countries`
/// serves every country. Timeslots are immutable; a catalog reload replaces
/// them wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeslot {
    pub id: String,
    #[serde(deserialize_with = "local_datetime")]
    pub start_time: NaiveDateTime,
    #[serde(deserialize_with = "local_datetime")]
    pub end_time: NaiveDateTime,
    #[serde(default, deserialize_with = "support_set")]
    pub supported_countries: HashSet<String>,
    #[serde(default, deserialize_with = "support_set")]
    pub supported_postcodes: HashSet<String>,
    #[serde(default, deserialize_with = "support_set")]
    pub supported_cities: HashSet<String>,
}

impl Timeslot {
    pub fn new(id: impl Into<String>, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            supported_countries: HashSet::new(),
            supported_postcodes: HashSet::new(),
            supported_cities: HashSet::new(),
        }
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_postcodes<I, S>(mut self, postcodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_postcodes = postcodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_cities = cities.into_iter().map(Into::into).collect();
        self
    }

    /// Calendar date of the window start. This is the day-bucket key.
    pub fn day(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Structural match against an address: every support set must either be
    /// empty or contain the address's value for that attribute.
    pub fn supports(&self, address: &Address) -> bool {
        matches_support(&self.supported_countries, &address.country)
            && matches_support(&self.supported_postcodes, &address.postcode)
            && matches_support(&self.supported_cities, &address.city)
    }
}

fn matches_support(set: &HashSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

/// ISO local date-time; seconds and fractions are optional.
fn local_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M"))
        .map_err(|e| serde::de::Error::custom(format!("bad local date-time {raw:?}: {e}")))
}

/// Anything other than an array is the empty (wildcard) set. Numbers are
/// kept as their decimal text, so postcodes may be written unquoted.
fn support_set<'de, D>(deserializer: D) -> Result<HashSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(HashSet::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

/// Structured postal address, already resolved by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub country: String,
    pub postcode: String,
    pub city: String,
}

impl Address {
    pub fn new(country: impl Into<String>, postcode: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            postcode: postcode.into(),
            city: city.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Result of asking a delivery to move to a target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status changed; the caller owns the side effects.
    Applied,
    /// Already in the target status. Nothing changed.
    Unchanged,
    /// The delivery sits in a different terminal status.
    Refused { from: DeliveryStatus },
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }

    /// PENDING → COMPLETED | CANCELLED. Terminal states never move.
    pub fn transition_to(self, to: DeliveryStatus) -> Transition {
        if self == to {
            Transition::Unchanged
        } else if self.is_terminal() || to == DeliveryStatus::Pending {
            Transition::Refused { from: self }
        } else {
            Transition::Applied
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Completed => "COMPLETED",
            DeliveryStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked delivery. Never deleted; only its status moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Ulid,
    pub user: String,
    pub timeslot_id: String,
    /// Day bucket the booking took its unit from. Fixed at booking time even
    /// if a later catalog reload moves the timeslot.
    pub reserved_day: NaiveDate,
    pub created_at: NaiveDateTime,
    pub status: DeliveryStatus,
}

impl Delivery {
    pub fn pending(
        user: String,
        timeslot_id: String,
        reserved_day: NaiveDate,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Ulid::new(),
            user,
            timeslot_id,
            reserved_day,
            created_at,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }
}
