use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use heliodon::control::{AppControlHandler, SharedClock};
use heliodon::core::logging;
use heliodon::core::time::FrameTimer;
use heliodon::ephemeris::UsnoProvider;
use heliodon::scene::{DirectionalLight, LightSource, LogDisplay, SharedLight};
use heliodon::solar::{LookupDispatcher, SimulationClock, SimulationConfig};

/// Host loop cadence, roughly display refresh.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() {
    logging::init();
    log::info!("Heliodon starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(config)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: SimulationConfig) -> heliodon::core::Result<()> {
    let rig = config.light_rig();
    let initial = config.initial_angles();
    let light = SharedLight::new(DirectionalLight {
        position: rig.position(initial),
        target: rig.target_point(),
        angles: initial,
        source: LightSource::Initial,
        revision: 0,
    });

    let provider = UsnoProvider::new(config.ephemeris_url.clone(), config.lookup_timeout());
    let (queue, worker) =
        LookupDispatcher::new(provider, light.clone(), rig, config.lookup_timeout()).spawn();

    let clock = SimulationClock::from_config(&config, queue.clone(), Box::new(LogDisplay))?;
    log::info!(
        "Simulating {} at {:.4},{:.4}, {} min every {} ms",
        clock.stamp(),
        config.latitude,
        config.longitude,
        config.step_minutes,
        config.step_threshold_ms
    );
    let clock: SharedClock = Arc::new(Mutex::new(clock));

    let handler = Arc::new(tokio::sync::Mutex::new(AppControlHandler::new(
        clock.clone(),
        light.clone(),
    )));
    let _server = heliodon_control::ControlServer::bind(handler, ("127.0.0.1", config.control_port)).await?;

    let mut frames = FrameTimer::new();
    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let dt = frames.tick();
                let mut clock = clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                clock.tick(dt);
            }
            _ = &mut shutdown => {
                log::info!("Shutting down after {} frames", frames.frame_count());
                break;
            }
        }
    }

    // Let queued lookups settle before exit so the final placement is logged.
    if queue.flush().await.is_ok() {
        let final_light = light.snapshot();
        log::info!(
            "Final light at {:?} (elevation {:.2}, azimuth {:.2})",
            final_light.position,
            final_light.angles.elevation_deg,
            final_light.angles.azimuth_deg
        );
    }
    worker.abort();
    Ok(())
}

/// Build configuration from `--config <path>` plus command line overrides.
fn load_config(args: &[String]) -> heliodon::core::Result<SimulationConfig> {
    let mut config = match parse_str_arg(args, "--config") {
        Some(path) => {
            let path = PathBuf::from(path);
            log::info!("Loading config from: {}", path.display());
            SimulationConfig::load_sync(&path)?
        }
        None => SimulationConfig::default(),
    };

    if let Some(lat) = parse_f64_arg(args, "--lat") {
        config.latitude = lat;
    }
    if let Some(lon) = parse_f64_arg(args, "--lon") {
        config.longitude = lon;
    }
    if let Some(date) = parse_str_arg(args, "--date") {
        config.start_date = date;
    }
    if let Some(time) = parse_str_arg(args, "--time") {
        config.start_time = time;
    }
    if let Some(step) = parse_str_arg(args, "--step").and_then(|s| s.parse().ok()) {
        config.step_minutes = step;
    }
    if let Some(port) = parse_str_arg(args, "--port").and_then(|s| s.parse().ok()) {
        config.control_port = port;
    }
    if args.iter().any(|a| a == "--play") {
        config.start_running = true;
    }

    config.validate()?;
    Ok(config)
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_f64_arg(args: &[String], flag: &str) -> Option<f64> {
    parse_str_arg(args, flag).and_then(|s| s.parse().ok())
}
