use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default = "default_latency")]
    pub latency: String,
    /// Parameter values by key, applied before any `--set`.
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            levels: default_levels(),
            latency: default_latency(),
            parameters: BTreeMap::new(),
        }
    }
}

fn default_bpm() -> f32 {
    120.0
}

fn default_levels() -> usize {
    4
}

fn default_latency() -> String {
    "three-beats".into()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}
