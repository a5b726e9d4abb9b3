use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};

use slotd::engine::{CapacityConfig, Engine, InMemoryCatalog};
use slotd::holiday::HolidayCache;
use slotd::model::{Address, Timeslot};

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

/// `days` days of `per_day` two-hour windows starting 2025-11-03 08:00.
fn catalog(days: u32, per_day: u32) -> Vec<Timeslot> {
    let first = NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date");
    let mut timeslots = Vec::new();
    for day in 0..days {
        let date = first + chrono::Duration::days(i64::from(day));
        for slot in 0..per_day {
            let start: NaiveDateTime = date.and_hms_opt(8 + slot, 0, 0).expect("valid time");
            let mut ts = Timeslot::new(format!("D{day}S{slot}"), start, start + chrono::Duration::hours(2));
            if slot % 2 == 1 {
                ts = ts.with_countries(["IL"]);
            }
            timeslots.push(ts);
        }
    }
    timeslots
}

fn engine(days: u32, per_day: u32, capacity: CapacityConfig) -> Arc<Engine> {
    Arc::new(Engine::in_memory(
        Arc::new(InMemoryCatalog::with_timeslots(catalog(days, per_day))),
        capacity,
        Arc::new(HolidayCache::disabled()),
    ))
}

fn phase1_sequential() {
    let days = 500;
    let eng = engine(days, 4, CapacityConfig::new(u32::MAX, u32::MAX));
    let n = 20_000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let id = format!("D{}S{}", i % days as usize, i % 4);
        let t = Instant::now();
        eng.book(&format!("user{i}"), &id).expect("unbounded capacity");
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("book", &mut latencies);
}

async fn phase2_contention() {
    let eng = engine(1, 4, CapacityConfig::new(6, 2));
    let n_tasks = 64;
    let per_task = 50;
    let admitted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for task in 0..n_tasks {
        let eng = eng.clone();
        let admitted = admitted.clone();
        let rejected = rejected.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..per_task {
                match eng.book(&format!("user{task}-{i}"), &format!("D0S{}", i % 4)) {
                    Ok(_) => admitted.fetch_add(1, Ordering::Relaxed),
                    Err(_) => rejected.fetch_add(1, Ordering::Relaxed),
                };
                tokio::task::yield_now().await;
            }
        }));
    }
    for h in handles {
        h.await.expect("task panicked");
    }

    let elapsed = start.elapsed();
    let admitted = admitted.load(Ordering::Relaxed);
    let rejected = rejected.load(Ordering::Relaxed);
    println!(
        "  {} attempts in {:.2}s: {admitted} admitted, {rejected} rejected",
        n_tasks * per_task,
        elapsed.as_secs_f64()
    );
    assert!(admitted <= 6, "daily capacity over-admitted");
}

async fn phase3_availability_under_load() {
    let eng = engine(30, 6, CapacityConfig::new(50, 10));
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let mut writers = Vec::new();
    for w in 0..8 {
        let eng = eng.clone();
        let stop = stop.clone();
        writers.push(tokio::spawn(async move {
            let mut i = 0usize;
            while !stop.load(Ordering::Relaxed) {
                let id = format!("D{}S{}", (w + i) % 30, i % 6);
                if let Ok(d) = eng.book("writer", &id)
                    && i % 3 == 0
                {
                    let _ = eng.cancel(d.id);
                }
                i += 1;
                tokio::task::yield_now().await;
            }
        }));
    }

    let address = Address::new("IL", "6100000", "Tel Aviv");
    let mut latencies = Vec::with_capacity(2000);
    for _ in 0..2000 {
        let t = Instant::now();
        let available = eng.available_timeslots_in(&address, 2025).await;
        latencies.push(t.elapsed());
        assert_eq!(available.len(), 180);
    }

    stop.store(true, Ordering::Relaxed);
    for w in writers {
        w.await.expect("writer panicked");
    }
    print_latency("available_timeslots", &mut latencies);
}

async fn phase4_cancel_churn() {
    let eng = engine(1, 1, CapacityConfig::new(4, 4));
    let n_tasks = 16;
    let rounds = 500;
    let start = Instant::now();

    let mut handles = Vec::new();
    for task in 0..n_tasks {
        let eng = eng.clone();
        handles.push(tokio::spawn(async move {
            let mut done = 0;
            for _ in 0..rounds {
                if let Ok(d) = eng.book(&format!("churn{task}"), "D0S0") {
                    eng.cancel(d.id).expect("cancel of own booking");
                    done += 1;
                }
                tokio::task::yield_now().await;
            }
            done
        }));
    }
    let mut cycles = 0;
    for h in handles {
        cycles += h.await.expect("task panicked");
    }

    let usage = eng.admission().slot_usage("D0S0").map_or(0, |u| u.reserved);
    println!(
        "  {cycles} book/cancel cycles in {:.2}s, {usage} units left reserved",
        start.elapsed().as_secs_f64()
    );
    assert_eq!(usage, 0, "capacity leaked");
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    println!("=== slotd stress benchmark ===\n");

    println!("[phase 1] sequential booking throughput");
    phase1_sequential();

    println!("\n[phase 2] booking contention on one day");
    phase2_contention().await;

    println!("\n[phase 3] availability latency under booking load");
    phase3_availability_under_load().await;

    println!("\n[phase 4] book/cancel churn");
    phase4_cancel_churn().await;

    println!("\n=== benchmark complete ===");
}
