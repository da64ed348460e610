//! gamelanizer CLI: offline WAV rendering and live playback.
//!
//! Usage:
//!   gz-cli input.wav -o output.wav [--bpm 96] [--set pitch1=-700]
//!   gz-cli --live [--seconds 30]

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use cli::Cli;
use gz_master::{Controller, LatencyStrategy, Settings};

#[cfg(all(feature = "alloc_check", debug_assertions))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("gamelanizer.toml");
        local.exists().then_some(local)
    });
    let cfg = match config_path {
        Some(ref path) => {
            let cfg = config::load_config(path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => config::Config::default(),
    };

    let latency = match cli.latency {
        Some(latency) => latency,
        None => cfg
            .latency
            .parse::<LatencyStrategy>()
            .map_err(anyhow::Error::msg)
            .context("config `latency`")?,
    };
    let mut ctrl = Controller::new(Settings {
        bpm: cfg.bpm,
        levels: cli.levels.unwrap_or(cfg.levels),
        latency,
    });

    for (key, value) in &cfg.parameters {
        ctrl.set_parameter(key, *value)
            .with_context(|| format!("config parameter `{key}`"))?;
    }
    if let Some(ref path) = cli.state {
        ctrl.load_state(path)
            .with_context(|| format!("loading state {}", path.display()))?;
    }
    if let Some(bpm) = cli.bpm {
        ctrl.set_bpm(bpm)?;
    }
    for (key, value) in &cli.set {
        ctrl.set_parameter(key, *value)
            .with_context(|| format!("--set {key}={value}"))?;
    }

    if let Some(ref path) = cli.save_state {
        ctrl.save_state(path)
            .with_context(|| format!("saving state {}", path.display()))?;
        log::info!("Saved state to {}", path.display());
    }

    if cli.live {
        play_live(&mut ctrl, cli.seconds);
        return Ok(());
    }

    let Some(input) = cli.input else {
        if cli.save_state.is_some() {
            return Ok(());
        }
        bail!("no input file given (or use --live)");
    };
    let Some(output) = cli.output else {
        bail!("no output file given: use -o <out.wav>");
    };

    let started = Instant::now();
    let frames = ctrl
        .render_file(&input, &output, cli.stereo)
        .with_context(|| format!("rendering {} to {}", input.display(), output.display()))?;
    log::info!(
        "Wrote {} frames to {} in {:.2}s",
        frames,
        output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn play_live(ctrl: &mut Controller, seconds: Option<f64>) {
    let limit = seconds.map(Duration::from_secs_f64);
    let started = Instant::now();
    ctrl.play();
    println!("Playing live at {:.1} BPM...", ctrl.bpm());

    while ctrl.is_playing() {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            ctrl.stop();
            break;
        }
        if let Some(pos) = ctrl.position() {
            print!("\rSamples: {pos:>12}");
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    println!("\rDone.                  ");
}
