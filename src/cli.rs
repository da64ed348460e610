use clap::Parser;
use gz_master::LatencyStrategy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gz-cli",
    about = "Layer 2x/4x/8x/16x phase-vocoded copies of each beat over the input"
)]
pub struct Cli {
    /// Input WAV file (any channel count; mixed down to mono)
    pub input: Option<PathBuf>,

    /// Output WAV file (32-bit float)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tempo in beats per minute (30-1000)
    #[arg(long)]
    pub bpm: Option<f32>,

    /// Number of subdivision levels (1-4)
    #[arg(long)]
    pub levels: Option<usize>,

    /// Latency strategy: three-beats, earliest-a-with-c or earliest-a-before-c
    #[arg(long)]
    pub latency: Option<LatencyStrategy>,

    /// Set a parameter, e.g. `--set pitch1=-700` (repeatable)
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, f32)>,

    /// Load a saved session state (JSON) before rendering
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Save the session state (JSON) after applying every setting
    #[arg(long)]
    pub save_state: Option<PathBuf>,

    /// Write only the stereo mix instead of every individual channel
    #[arg(long)]
    pub stereo: bool,

    /// Run live from the default input to the default output device
    #[arg(long)]
    pub live: bool,

    /// Stop live playback after this many seconds
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Config file (defaults to gamelanizer.toml in the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Parse `key=value` into a parameter assignment.
pub fn parse_assignment(s: &str) -> Result<(String, f32), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value for {key}: {e}"))?;
    Ok((key.trim().to_string(), value))
}
