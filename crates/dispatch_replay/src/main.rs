//! Offline harness for the dispatch pipeline: replay a captured feed from a
//! JSONL file, or synthesize a deterministic feed for smoke runs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use h3o::LatLng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dispatch_core::config::DispatchConfig;
use dispatch_core::ecs::{Equipment, TripPreference};
use dispatch_core::feed::{parse_event, FeedEvent, FeedEventKind, LoadPosted, TruckPing};
use dispatch_core::geo::haversine_miles;
use dispatch_core::refine::GreatCircleResolver;
use dispatch_core::runner::{build_dispatch_world, dispatch_schedule, ingest_event};
use dispatch_core::store::{InMemoryStore, NotificationStore};
use dispatch_core::telemetry::DispatchTelemetry;

#[derive(Parser)]
#[command(
    name = "dispatch_replay",
    about = "Replay or synthesize a load feed against the dispatch pipeline"
)]
struct Cli {
    /// Seconds a truck stays throttled after a notification
    #[arg(long, default_value_t = 1800)]
    throttle_secs: i64,
    /// Update a known truck's position on repeat sightings
    #[arg(long)]
    allow_truck_refresh: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured feed (one JSON event per line)
    Replay {
        /// Path to the JSONL capture
        file: PathBuf,
    },
    /// Run a synthetic feed of random trucks and loads
    Synth {
        /// Number of trucks to spawn
        #[arg(long, default_value_t = 50)]
        trucks: u32,
        /// Number of loads to post
        #[arg(long, default_value_t = 20)]
        loads: u64,
        /// RNG seed for reproducible runs
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = DispatchConfig::default()
        .with_throttle_secs(cli.throttle_secs)
        .with_truck_refresh(cli.allow_truck_refresh);

    let store = Arc::new(InMemoryStore::new());
    let mut world = build_dispatch_world(config, store.clone(), Arc::new(GreatCircleResolver));
    let mut schedule = dispatch_schedule();

    match cli.command {
        Commands::Replay { file } => {
            let reader = BufReader::new(File::open(&file)?);
            let mut dropped = 0u64;
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match parse_event(&line) {
                    Ok(event) => ingest_event(&mut world, &mut schedule, event),
                    Err(err) => {
                        dropped += 1;
                        warn!(error = %err, "unparseable feed line dropped");
                    }
                }
            }
            if dropped > 0 {
                warn!(dropped, "feed lines could not be parsed");
            }
        }
        Commands::Synth {
            trucks,
            loads,
            seed,
        } => {
            for event in synthesize_feed(trucks, loads, seed) {
                ingest_event(&mut world, &mut schedule, event);
            }
        }
    }

    let telemetry = world.resource::<DispatchTelemetry>();
    info!(summary = %telemetry.summary(), "run complete");
    drain_pending(&store)?;
    Ok(())
}

/// Pop every pending notification slot the way the downstream event API
/// would, reporting how many trucks had a notification waiting.
fn drain_pending(store: &InMemoryStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut pending = 0u64;
    for key in store.keys()? {
        // Notification slots are bare truck ids; metrics keys are prefixed.
        if key.parse::<u32>().is_ok() && store.take(&key)?.is_some() {
            pending += 1;
        }
    }
    info!(pending, "pending notifications drained");
    Ok(())
}

/// Deterministic feed over the continental US: all trucks ping first, then
/// loads arrive a minute apart, then the period ends.
fn synthesize_feed(trucks: u32, loads: u64, seed: u64) -> Vec<FeedEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut events = Vec::with_capacity(trucks as usize + loads as usize + 1);
    let start = NaiveDateTime::parse_from_str("2023-11-17T08:00:00", "%Y-%m-%dT%H:%M:%S")
        .expect("literal timestamp");
    let mut seq = 0u64;
    let mut clock = start;

    for i in 0..trucks {
        seq += 1;
        clock += Duration::seconds(5);
        events.push(FeedEvent {
            seq,
            timestamp: clock,
            kind: FeedEventKind::TruckPing(TruckPing {
                truck_id: 100 + i,
                position: random_point(&mut rng),
                equipment: random_equipment(&mut rng),
                preference: if rng.gen_bool(0.5) {
                    TripPreference::Long
                } else {
                    TripPreference::Short
                },
            }),
        });
    }

    for j in 0..loads {
        seq += 1;
        clock += Duration::seconds(60);
        let origin = random_point(&mut rng);
        let destination = random_point(&mut rng);
        let mileage = haversine_miles(origin, destination);
        events.push(FeedEvent {
            seq,
            timestamp: clock,
            kind: FeedEventKind::LoadPosted(LoadPosted {
                load_id: 40_000 + j,
                origin,
                destination,
                equipment: random_equipment(&mut rng),
                price: mileage * rng.gen_range(1.5..3.5),
                mileage,
            }),
        });
    }

    seq += 1;
    clock += Duration::seconds(60);
    events.push(FeedEvent {
        seq,
        timestamp: clock,
        kind: FeedEventKind::PeriodEnd,
    });
    events
}

fn random_point(rng: &mut StdRng) -> LatLng {
    let lat = rng.gen_range(30.0..47.0);
    let lng = rng.gen_range(-120.0..-78.0);
    LatLng::new(lat, lng).expect("in-range coordinate")
}

fn random_equipment(rng: &mut StdRng) -> Equipment {
    match rng.gen_range(0..3) {
        0 => Equipment::Van,
        1 => Equipment::Flatbed,
        _ => Equipment::Reefer,
    }
}
