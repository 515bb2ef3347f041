//! airport — a taxi rank at a terminal exit, driven by concurrent kiosks.
//!
//! Registers a small mixed fleet, queues every vehicle, then lets several
//! booking kiosks assign parties of random size at once.  Each assigned
//! vehicle drives the trip to completion and rejoins the back of its queue.
//!
//! ```text
//! cargo run -p airport -- [config.json]
//! RUST_LOG=rank_dispatch=debug cargo run -p airport
//! ```

mod fleet;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rank_core::{DispatchConfig, QueueEntry, TripId, TripStatus, VehicleId};
use rank_dispatch::{
    Assignment, DispatchEngine, DispatchEngineBuilder, DispatchError, DispatchObserver, RepairReport,
    TripFilter,
};
use rank_store::{SqliteStorage, Storage};

use fleet::build_fleet;

// ── Constants ─────────────────────────────────────────────────────────────────

const VEHICLES_PER_CLASS: usize = 2;
const KIOSKS:             u64   = 4;
const BOOKINGS_PER_KIOSK: usize = 12;
const OUTPUT_DIR:         &str  = "output/airport";

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    assigned:    AtomicUsize,
    upgraded:    AtomicUsize,
    unavailable: AtomicUsize,
    released:    AtomicUsize,
    rolled_back: AtomicUsize,
    repaired:    AtomicUsize,
}

impl DispatchObserver for Tally {
    fn on_assigned(&self, assignment: &Assignment) {
        self.assigned.fetch_add(1, Ordering::Relaxed);
        if assignment.upgraded {
            self.upgraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_unavailable(&self, _passengers: u8) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    fn on_vehicle_released(&self, _vehicle: VehicleId, _trip: TripId) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    fn on_compensated(&self, _restored: &QueueEntry) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    fn on_repaired(&self, report: &RepairReport) {
        self.repaired.fetch_add(report.updated, Ordering::Relaxed);
    }
}

// ── Kiosk ─────────────────────────────────────────────────────────────────────

type Engine = DispatchEngine<SqliteStorage, Arc<Tally>>;

/// Drive one assigned trip to completion and put the vehicle back in line.
fn ride(engine: &Engine, assignment: &Assignment) -> Result<(), DispatchError> {
    engine.advance_trip(assignment.trip, TripStatus::DriverEnRoute)?;
    engine.advance_trip(assignment.trip, TripStatus::InProgress)?;
    engine.complete_trip(assignment.trip)?;
    engine.enqueue_vehicle(assignment.vehicle)?;
    Ok(())
}

fn kiosk(engine: &Engine, id: u64, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed ^ id);
    let max = i32::from(engine.policy().max_capacity());
    for _ in 0..BOOKINGS_PER_KIOSK {
        let party = rng.gen_range(1..=max);
        match engine.assign(party, "City Centre") {
            Ok(assignment) => {
                if let Err(e) = ride(engine, &assignment) {
                    tracing::warn!(kiosk = id, trip = %assignment.trip, error = %e, "trip did not finish");
                }
            }
            Err(DispatchError::NoAvailableVehicle { message }) => {
                tracing::info!(kiosk = id, party, "{message}");
                std::thread::sleep(Duration::from_millis(rng.gen_range(5..20)));
            }
            Err(e) => tracing::error!(kiosk = id, party, error = %e, "booking failed"),
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn load_config() -> Result<DispatchConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))
        }
        None => Ok(DispatchConfig::default()),
    }
}

fn fresh_store(dir: &Path) -> Result<SqliteStorage> {
    std::fs::create_dir_all(dir)?;
    let db = dir.join("rank.db");
    for suffix in ["", "-wal", "-shm"] {
        let file = dir.join(format!("rank.db{suffix}"));
        if file.exists() {
            std::fs::remove_file(&file)?;
        }
    }
    Ok(SqliteStorage::open(&db)?)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rank_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    let seed = config.seed;
    let storage = Arc::new(fresh_store(Path::new(OUTPUT_DIR))?);
    let tally = Arc::new(Tally::default());
    let engine = DispatchEngineBuilder::new(config, storage.clone())
        .observer(tally.clone())
        .build()?;

    // 1. Register the fleet and queue it.
    let fleet = build_fleet(engine.policy().classes().iter(), VEHICLES_PER_CLASS);
    for vehicle in &fleet {
        storage.put_vehicle(vehicle)?;
        engine.enqueue_vehicle(vehicle.id)?;
    }
    tracing::info!(vehicles = fleet.len(), "fleet queued");

    // 2. Run the kiosks.
    let t0 = Instant::now();
    std::thread::scope(|s| {
        for id in 0..KIOSKS {
            let engine = &engine;
            s.spawn(move || kiosk(engine, id, seed));
        }
    });
    let elapsed = t0.elapsed();

    // 3. Summary.
    let history = engine.trip_history(&TripFilter::default().page(1, 1))?;
    let completed = engine.trip_history(&TripFilter::default().with_status(TripStatus::Completed).page(1, 1))?;
    let queues: serde_json::Map<String, serde_json::Value> = engine
        .policy()
        .classes()
        .iter()
        .map(|class| -> Result<(String, serde_json::Value)> {
            Ok((class.to_string(), serde_json::to_value(engine.queue(class)?)?))
        })
        .collect::<Result<_>>()?;

    let summary = serde_json::json!({
        "elapsed_ms":  elapsed.as_millis() as u64,
        "bookings":    KIOSKS as usize * BOOKINGS_PER_KIOSK,
        "assigned":    tally.assigned.load(Ordering::Relaxed),
        "upgraded":    tally.upgraded.load(Ordering::Relaxed),
        "unavailable": tally.unavailable.load(Ordering::Relaxed),
        "released":    tally.released.load(Ordering::Relaxed),
        "rolled_back": tally.rolled_back.load(Ordering::Relaxed),
        "renumbered":  tally.repaired.load(Ordering::Relaxed),
        "trips":       history.total,
        "completed":   completed.total,
        "breaker":     format!("{:?}", engine.breaker_state()),
        "queues":      queues,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
