//! Headless controller for gamelanizer.
//!
//! Owns the parameter store and the tempo, and provides offline rendering,
//! live playback and session state persistence for the CLI.

mod live;
mod render;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use gz_dsp::constants::{MAX_BPM, MIN_BPM};
use gz_engine::{Engine, EngineConfig, ParameterReader};
use live::{LiveSettings, PlaybackHandle};
use thiserror::Error;

// Re-export common types so callers don't need the lower crates directly.
pub use gz_audio::AudioError;
pub use gz_dsp::AudioBuffer;
pub use gz_engine::{EngineError, LatencyStrategy, ParameterId, SharedParameters};
pub use gz_formats::{FormatError, MonoAudio, SessionState};
pub use render::{render_offline, tail_samples};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Engine settings that only change while stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub bpm: f32,
    pub levels: usize,
    pub latency: LatencyStrategy,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            bpm: engine.bpm,
            levels: engine.levels,
            latency: engine.latency,
        }
    }
}

/// Headless controller: owns the parameters and manages playback.
pub struct Controller {
    params: Arc<SharedParameters>,
    settings: Settings,
    playback: Option<PlaybackHandle>,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        Self {
            params: Arc::new(SharedParameters::new()),
            settings: Settings {
                bpm: settings.bpm.clamp(MIN_BPM, MAX_BPM),
                ..settings
            },
            playback: None,
        }
    }

    // --- Parameters ---

    pub fn params(&self) -> &Arc<SharedParameters> {
        &self.params
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Set a parameter by key, e.g. `pitch1` or `drop2_0`. Takes effect
    /// immediately, also during live playback.
    pub fn set_parameter(&self, key: &str, value: f32) -> Result<(), ControllerError> {
        self.params.set_by_key(key, value)?;
        log::debug!("{key} = {}", self.params.get(ParameterId::parse(key)?));
        Ok(())
    }

    pub fn bpm(&self) -> f32 {
        self.settings.bpm
    }

    /// Change the tempo; refused during live playback.
    pub fn set_bpm(&mut self, bpm: f32) -> Result<(), ControllerError> {
        if self.is_playing() {
            return Err(EngineError::TempoLocked.into());
        }
        self.settings.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        Ok(())
    }

    pub fn engine_config(&self, sample_rate: f64) -> EngineConfig {
        EngineConfig {
            sample_rate,
            levels: self.settings.levels,
            bpm: self.settings.bpm,
            latency: self.settings.latency,
        }
    }

    fn engine(&self, sample_rate: f64) -> Result<Engine<ParameterReader>, ControllerError> {
        let reader = ParameterReader::new(self.params.clone());
        Ok(Engine::new(self.engine_config(sample_rate), reader)?)
    }

    /// Latency the engine would report at `sample_rate`.
    pub fn latency_samples(&self, sample_rate: f64) -> Result<usize, ControllerError> {
        Ok(self.engine(sample_rate)?.latency_samples())
    }

    // --- Session state ---

    pub fn snapshot(&self) -> SessionState {
        SessionState::snapshot(&self.params, self.settings.bpm)
    }

    /// Apply a state document. Live playback restarts from a cold start.
    pub fn apply_state(&mut self, state: &SessionState) {
        let was_playing = self.is_playing();
        self.stop();
        let unknown = state.apply(&self.params);
        self.settings.bpm = state.current_bpm.clamp(MIN_BPM, MAX_BPM);
        log::info!(
            "state applied: {:.2} bpm, {} parameters, {} unknown",
            self.settings.bpm,
            state.parameters.len() - unknown,
            unknown
        );
        if was_playing {
            self.play();
        }
    }

    pub fn load_state(&mut self, path: impl AsRef<Path>) -> Result<(), ControllerError> {
        let state = SessionState::load(path)?;
        self.apply_state(&state);
        Ok(())
    }

    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), ControllerError> {
        self.snapshot().save(path)?;
        Ok(())
    }

    // --- Offline rendering ---

    /// Render mono `input` and return every output channel.
    pub fn render(&self, input: &MonoAudio) -> Result<AudioBuffer, ControllerError> {
        let mut engine = self.engine(input.sample_rate as f64)?;
        Ok(render_offline(&mut engine, &input.samples))
    }

    /// Render `input` into WAV bytes: the stereo mix only, or every channel.
    pub fn render_to_wav(&self, input: &MonoAudio, stereo_only: bool) -> Result<Vec<u8>, ControllerError> {
        let rendered = self.render(input)?;
        let channels = if stereo_only { 2 } else { rendered.channels() };
        Ok(gz_formats::render_to_wav_bytes(&rendered, channels, input.sample_rate)?)
    }

    /// Read a WAV file, render it, and write the result.
    pub fn render_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        stereo_only: bool,
    ) -> Result<usize, ControllerError> {
        let audio = gz_formats::load_wav(input)?;
        log::info!(
            "rendering {} samples at {} Hz, {} levels",
            audio.samples.len(),
            audio.sample_rate,
            self.settings.levels
        );
        let rendered = self.render(&audio)?;
        let channels = if stereo_only { 2 } else { rendered.channels() };
        let file = std::io::BufWriter::new(std::fs::File::create(output).map_err(FormatError::from)?);
        gz_formats::write_wav(file, &rendered, channels, audio.sample_rate)?;
        Ok(rendered.frames())
    }

    // --- Live playback ---

    pub fn play(&mut self) {
        self.stop();
        let settings = LiveSettings {
            levels: self.settings.levels,
            bpm: self.settings.bpm,
            latency: self.settings.latency,
        };
        self.playback = Some(live::spawn(self.params.clone(), settings));
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    /// Samples processed since live playback started.
    pub fn position(&self) -> Option<i64> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        Some(pb.position.load(Ordering::Relaxed))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
