/// Longest accepted user identifier on a booking.
pub const MAX_USER_LEN: usize = 256;

/// Longest accepted timeslot id on a booking request.
pub const MAX_TIMESLOT_ID_LEN: usize = 128;

/// Upper bound on timeslots accepted from a single catalog file.
pub const MAX_CATALOG_TIMESLOTS: usize = 100_000;
