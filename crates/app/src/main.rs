use std::{
    path::{Path, PathBuf},
    thread,
    time::Instant,
};

use clap::{Parser, Subcommand};
use flythrough_core::{AppConfig, PlaybackClock, RenderGraph, Session};
use tracing_subscriber::EnvFilter;

mod script;

fn main() -> flythrough_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            duration,
            unknown_duration,
            seed,
            realtime,
        } => run_play(config.as_deref(), duration, unknown_duration, seed, realtime),
        Commands::Path { config, samples } => run_path(config.as_deref(), samples),
    }
}

fn run_play(
    config_path: Option<&Path>,
    duration: f64,
    unknown_duration: bool,
    seed: Option<u64>,
    realtime: bool,
) -> flythrough_core::Result<()> {
    let mut config = load_config(config_path)?;
    if seed.is_some() {
        config.motion.seed = seed;
    }
    tracing::info!(duration, unknown_duration, realtime, "starting playback");

    let curve = config.build_curve()?;
    let scheduler = script::demo_schedule(&curve, config.timeline.firing_policy)?;
    let clock = if unknown_duration {
        PlaybackClock::undecoded(duration)
    } else {
        PlaybackClock::new(duration)
    };

    let mut session = Session::new(&config, clock, RenderGraph::new(), scheduler)?;
    let report = if realtime {
        let started = Instant::now();
        session.run_paced(|deadline| {
            if let Some(wait) = deadline.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        })?
    } else {
        session.run()?
    };

    let scene = session.scene().scene();
    tracing::info!(
        ticks = report.poll_ticks,
        frames = report.frames,
        fired = report.fired.len(),
        pending = report.pending.len(),
        panels = scene.panels.len(),
        sprite = scene.sprite.is_some(),
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_path(config_path: Option<&Path>, samples: usize) -> flythrough_core::Result<()> {
    let config = load_config(config_path)?;
    let curve = config.build_curve()?;
    tracing::info!(samples, length = curve.length(), "sampling path");

    let points: Vec<serde_json::Value> = (0..samples)
        .map(|i| {
            let t = i as f64 / samples as f64;
            let point = curve.point_at(t);
            serde_json::json!({ "t": t, "point": [point.x, point.y, point.z] })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> flythrough_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-synchronised fly-through", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one session against a simulated audio clock.
    Play {
        /// JSON configuration file; defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Length of the simulated track in seconds.
        #[arg(short, long, default_value_t = 60.0)]
        duration: f64,
        /// Hide the track length from the timeline, as if still decoding.
        #[arg(long)]
        unknown_duration: bool,
        /// Seed for the light flicker.
        #[arg(long)]
        seed: Option<u64>,
        /// Pace the session against the wall clock instead of running flat out.
        #[arg(long)]
        realtime: bool,
    },
    /// Print evenly spaced points along the configured path as JSON.
    Path {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value_t = 100)]
        samples: usize,
    },
}
