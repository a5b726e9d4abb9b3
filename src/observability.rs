use std::net::SocketAddr;

// ── Booking lifecycle ───────────────────────────────────────────

/// Counter: booking attempts. Labels: outcome
/// (`admitted`, `daily_capacity`, `timeslot_capacity`, `unknown_timeslot`, `rejected`).
pub const BOOKINGS_TOTAL: &str = "slotd_bookings_total";

/// Counter: deliveries moved to COMPLETED.
pub const COMPLETIONS_TOTAL: &str = "slotd_completions_total";

/// Counter: deliveries moved to CANCELLED.
pub const CANCELLATIONS_TOTAL: &str = "slotd_cancellations_total";

/// Counter: cancellations whose timeslot had left the catalog, so no
/// capacity was returned.
pub const CAPACITY_RELEASE_SKIPPED_TOTAL: &str = "slotd_capacity_release_skipped_total";

// ── Availability ────────────────────────────────────────────────

/// Histogram: availability resolution latency in seconds.
pub const AVAILABILITY_DURATION_SECONDS: &str = "slotd_availability_duration_seconds";

/// Counter: availability queries that failed open to an empty result.
pub const AVAILABILITY_FAILED_OPEN_TOTAL: &str = "slotd_availability_failed_open_total";

/// Counter: holiday cache lookups. Labels: result (`hit`, `miss`, `failure`, `skipped`).
pub const HOLIDAY_LOOKUPS_TOTAL: &str = "slotd_holiday_lookups_total";

// ── Catalog ─────────────────────────────────────────────────────

/// Gauge: timeslots in the active catalog.
pub const CATALOG_TIMESLOTS: &str = "slotd_catalog_timeslots";

/// Counter: catalog loads. Labels: result (`ok`, `error`).
pub const CATALOG_LOADS_TOTAL: &str = "slotd_catalog_loads_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
