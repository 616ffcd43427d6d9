//! Breakout Link entry point
//!
//! Runs the headless arena at a fixed timestep and serves telemetry to one
//! controller until the time limit runs out.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use breakout_link::consts::{MAX_SUBSTEPS, SIM_DT};
use breakout_link::sim::Arena;
use breakout_link::{ControlLoop, Settings, TelemetryFrame};

#[derive(Debug, Parser)]
#[command(version, about = "Headless breakout arena with a TCP paddle controller link")]
struct Args {
    /// Settings file (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds; runs until killed when omitted
    #[arg(long)]
    seconds: Option<f64>,

    /// Seed for ball launch angles
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Track the predicted intercept while no controller is connected
    #[arg(long)]
    autopilot: bool,
}

/// Run length from `--seconds`; `None` runs until killed
fn run_limit(seconds: Option<f64>) -> anyhow::Result<Option<Duration>> {
    let Some(seconds) = seconds else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(seconds) {
        Ok(limit) => Ok(Some(limit)),
        Err(err) => anyhow::bail!("invalid --seconds {seconds}: {err}"),
    }
}

/// Local paddle axis steering toward the predicted intercept
fn autopilot_axis(frame: &TelemetryFrame) -> f32 {
    // normalized position grows to the left
    ((frame.paddle_actual_pos - frame.paddle_desired_pos) * 8.0).clamp(-1.0, 1.0)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let limit = run_limit(args.seconds)?;

    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let mut arena = Arena::new(&settings, args.seed).context("building arena")?;
    let mut control = ControlLoop::new(&settings, arena.field()).context("invalid settings")?;
    let addr = control.start().context("starting telemetry server")?;
    log::info!("Breakout Link running; controller port {addr}");

    let started = Instant::now();
    let mut last_time = started;
    let mut last_status = started;
    let mut accumulator = 0.0f32;
    let mut frame = TelemetryFrame::NEUTRAL;

    loop {
        let now = Instant::now();
        if limit.is_some_and(|limit| now.duration_since(started) >= limit) {
            break;
        }

        let dt = now.duration_since(last_time).as_secs_f32().min(0.1);
        last_time = now;
        accumulator += dt;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let axis = if args.autopilot {
                autopilot_axis(&frame)
            } else {
                0.0
            };
            frame = control.tick(&mut arena, SIM_DT, axis);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        if now.duration_since(last_status) >= Duration::from_secs(1) {
            last_status = now;
            log::info!(
                "{} | bricks {} cleared {} lost {}",
                control.status(),
                arena.bricks_remaining(),
                arena.bricks_cleared(),
                arena.balls_lost()
            );
        }

        std::thread::sleep(Duration::from_secs_f32(SIM_DT / 2.0));
    }

    control.stop().context("stopping telemetry server")?;
    log::info!(
        "Finished: {} bricks cleared, {} balls lost",
        arena.bricks_cleared(),
        arena.balls_lost()
    );
    Ok(())
}
