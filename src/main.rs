use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use statstrace::field::{TracedEntity, TracedField};
use statstrace::lifecycle::{handle_host_event, HostEvent};
use statstrace::recorder::{DataSource, SessionManager};
use statstrace::settings::TracerSettings;
use statstrace::value::{Rotator, Transform, Vec3};
use tracing_subscriber::EnvFilter;

/// Drives the tracer against a simulated host and prints what was recorded.
#[derive(Debug, Parser)]
#[command(name = "statstrace", version, about)]
struct Args {
    /// TOML settings file.
    #[arg(long, env = "STATSTRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Host frames to simulate.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Wall-clock milliseconds per frame.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Stream samples to CSV under the configured output directory.
    #[arg(long)]
    csv: bool,
}

/// Stand-in for a game object whose fields the tracer observes.
struct Pawn {
    entity: std::sync::Arc<TracedEntity>,
    alive: TracedField<bool>,
    health: TracedField<i32>,
    speed: TracedField<f32>,
    location: TracedField<Vec3>,
    transform: TracedField<Transform>,
}

impl Pawn {
    fn spawn(name: &str) -> Self {
        Self {
            entity: TracedEntity::new(name),
            alive: TracedField::new(true),
            health: TracedField::new(100),
            speed: TracedField::new(0.0),
            location: TracedField::new(Vec3::ZERO),
            transform: TracedField::new(Transform::IDENTITY),
        }
    }

    fn simulate(&self, t: f32) {
        let speed = 300.0 * (t * 0.5).sin().abs();
        let location = Vec3::new(t.cos() * 100.0, t.sin() * 100.0, 0.0);
        self.speed.set(speed);
        self.location.set(location);
        self.health.set((100.0 - t * 2.0).max(0.0) as i32);
        self.alive.set(self.health.get() > 0);
        self.transform.set(Transform {
            location,
            rotation: Rotator { pitch: 0.0, yaw: (t * 45.0) % 360.0, roll: 0.0 },
            scale: Vec3::ONE,
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = TracerSettings::load_from(args.config.as_deref())?;
    tracing::info!(?settings, "StatsTrace booting");

    let mut manager = SessionManager::new(settings);
    let window = manager.sample_window_size();

    handle_host_event(&mut manager, HostEvent::PreBeginPlay);

    let pawn = Pawn::spawn("BP_Pawn_C_0");
    let handle = manager.create_repository("Pawn", "Simulated player pawn", &pawn.entity, args.csv, true)?;
    manager.add_data_source(handle, DataSource::new(&pawn.alive, "Alive", window).with_group("State"))?;
    manager.add_data_source(handle, DataSource::new(&pawn.health, "Health", window).with_group("State"))?;
    manager.add_data_source(handle, DataSource::new(&pawn.speed, "Speed", window).with_group("Movement"))?;
    manager.add_data_source(handle, DataSource::new(&pawn.location, "Location", window))?;
    manager.add_data_source(
        handle,
        DataSource::new(&pawn.transform, "Actor Transform", window).with_description("World transform"),
    )?;

    handle_host_event(&mut manager, HostEvent::PostBeginPlay);

    let delta = args.tick_ms as f32 / 1000.0;
    let pause_at = args.frames / 2;
    let mut cadence = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut elapsed = 0.0f32;
    for frame in 0..args.frames {
        cadence.tick().await;
        elapsed += delta;
        pawn.simulate(elapsed);

        if frame == pause_at {
            // A paused host still single-steps once, which must be recorded.
            handle_host_event(&mut manager, HostEvent::Pause);
            handle_host_event(&mut manager, HostEvent::SingleStep { delta_seconds: delta });
            handle_host_event(&mut manager, HostEvent::Resume);
            continue;
        }
        handle_host_event(&mut manager, HostEvent::Tick { delta_seconds: delta });
    }

    handle_host_event(&mut manager, HostEvent::EndPlay);

    let summary = manager.summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    tracing::info!(
        used_ratio = manager.used_ratio(),
        sessions = manager.session_count(),
        "StatsTrace finished"
    );
    Ok(())
}
