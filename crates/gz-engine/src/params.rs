//! Parameter access for the audio thread.
//!
//! The engine reads every tunable through [`ParameterProvider`], once per
//! sample. [`SharedParameters`] is the default store: one atomic cell per
//! value, written by a control thread and read lock-free by
//! [`ParameterReader`] on the audio thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;
use gz_dsp::constants::{MAX_LEVELS, MAX_PITCH_CENTS, MIN_PITCH_CENTS};

use crate::error::EngineError;

/// Output sources with gain, pan and mute: the dry signal plus every level.
pub const NUM_LAYERS: usize = MAX_LEVELS + 1;

/// Notes in one beat pair at any level: A1, B1, A2, B2.
pub const NOTES_PER_PAIR: usize = 4;

const DEFAULT_GAINS_DB: [f32; NUM_LAYERS] = [0.0, -2.0, -3.0, -10.0, -12.0];
const DEFAULT_MUTES: [bool; NUM_LAYERS] = [false, false, false, true, true];
const DEFAULT_PANS: [f32; NUM_LAYERS] = [0.0, -100.0, 100.0, -50.0, 50.0];
const DEFAULT_TAPERS: [f32; MAX_LEVELS] = [0.0, 0.0, 0.1, 0.2];
const DEFAULT_LOW_PASS_HZ: [f32; MAX_LEVELS] = [10000.0, 9000.0, 6000.0, 5000.0];
const DEFAULT_HIGH_PASS_HZ: f32 = 10.0;
const DEFAULT_DROPS: [[bool; NOTES_PER_PAIR]; MAX_LEVELS] = [
    [false; NOTES_PER_PAIR],
    [false; NOTES_PER_PAIR],
    [false, false, true, false],
    [false, false, false, true],
];

/// Lowest and highest filter cutoff accepted.
pub const MIN_CUTOFF_HZ: f32 = 10.0;
pub const MAX_CUTOFF_HZ: f32 = 20000.0;

/// An output source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The delayed input.
    Dry,
    /// A subdivision level, `0` being the 2x level.
    Level(usize),
}

impl Layer {
    /// Dense index: 0 for dry, `level + 1` for levels.
    pub fn index(self) -> usize {
        match self {
            Layer::Dry => 0,
            Layer::Level(level) => level + 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Layer::Dry,
            n => Layer::Level(n - 1),
        }
    }
}

/// A parameter value and whether it differs from the previous read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamValue {
    pub value: f32,
    pub changed: bool,
}

/// Source of already-smoothed parameter values, polled once per sample.
///
/// Getters take `&mut self` so implementations can advance smoothers or
/// track changes as they are read.
pub trait ParameterProvider {
    /// Linear gain in `[0, 1]`.
    fn gain(&mut self, layer: Layer) -> f32;
    /// Pan in `[-100, 100]`, negative is left.
    fn pan(&mut self, layer: Layer) -> f32;
    /// Mute amount in `[0, 1]`; 1 is silent.
    fn mute(&mut self, layer: Layer) -> f32;
    /// Tukey taper alpha in `[0, 1]` applied to each beat fed to `level`.
    fn taper(&mut self, level: usize) -> f32;
    /// Pitch shift in cents.
    fn pitch(&mut self, level: usize, smoothed: bool) -> ParamValue;
    fn low_pass_cutoff(&mut self, level: usize) -> ParamValue;
    fn high_pass_cutoff(&mut self, level: usize) -> ParamValue;
    /// Whether `note` (0..4 within a beat pair) is silenced at `level`.
    fn drop_note(&self, level: usize, note: usize) -> bool;
}

/// Identifies one stored parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterId {
    Gain(Layer),
    Mute(Layer),
    Pan(Layer),
    Pitch(usize),
    Taper(usize),
    HighPass(usize),
    LowPass(usize),
    Drop { level: usize, note: usize },
}

impl ParameterId {
    /// Every parameter, in a stable order.
    pub fn all() -> Vec<ParameterId> {
        let mut ids = Vec::new();
        for layer in (0..NUM_LAYERS).map(Layer::from_index) {
            ids.extend([ParameterId::Gain(layer), ParameterId::Mute(layer), ParameterId::Pan(layer)]);
        }
        for level in 0..MAX_LEVELS {
            ids.extend([
                ParameterId::Pitch(level),
                ParameterId::Taper(level),
                ParameterId::HighPass(level),
                ParameterId::LowPass(level),
            ]);
            ids.extend((0..NOTES_PER_PAIR).map(|note| ParameterId::Drop { level, note }));
        }
        ids
    }

    /// Parse a key such as `gain0`, `pitch2` or `drop3_1`.
    pub fn parse(key: &str) -> Result<Self, EngineError> {
        let unknown = || EngineError::UnknownParameter(key.to_string());
        let split = key.find(|c: char| c.is_ascii_digit()).ok_or_else(unknown)?;
        let (name, rest) = key.split_at(split);

        if name == "drop" {
            let (level, note) = rest.split_once('_').ok_or_else(unknown)?;
            let level: usize = level.parse().map_err(|_| unknown())?;
            let note: usize = note.parse().map_err(|_| unknown())?;
            if level >= MAX_LEVELS || note >= NOTES_PER_PAIR {
                return Err(unknown());
            }
            return Ok(ParameterId::Drop { level, note });
        }

        let index: usize = rest.parse().map_err(|_| unknown())?;
        let id = match name {
            "gain" if index < NUM_LAYERS => ParameterId::Gain(Layer::from_index(index)),
            "mute" if index < NUM_LAYERS => ParameterId::Mute(Layer::from_index(index)),
            "pan" if index < NUM_LAYERS => ParameterId::Pan(Layer::from_index(index)),
            "pitch" if index < MAX_LEVELS => ParameterId::Pitch(index),
            "taper" if index < MAX_LEVELS => ParameterId::Taper(index),
            "hpf" if index < MAX_LEVELS => ParameterId::HighPass(index),
            "lpf" if index < MAX_LEVELS => ParameterId::LowPass(index),
            _ => return Err(unknown()),
        };
        Ok(id)
    }

    /// Accepted range; values outside it are clamped on write.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParameterId::Gain(_) | ParameterId::Taper(_) => (0.0, 1.0),
            ParameterId::Mute(_) | ParameterId::Drop { .. } => (0.0, 1.0),
            ParameterId::Pan(_) => (-100.0, 100.0),
            ParameterId::Pitch(_) => (MIN_PITCH_CENTS, MAX_PITCH_CENTS),
            ParameterId::HighPass(_) | ParameterId::LowPass(_) => (MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParameterId::Gain(layer) => db_to_gain(DEFAULT_GAINS_DB[layer.index()]),
            ParameterId::Mute(layer) => bool_value(DEFAULT_MUTES[layer.index()]),
            ParameterId::Pan(layer) => DEFAULT_PANS[layer.index()],
            ParameterId::Pitch(level) => 1200.0 * (level + 1) as f32,
            ParameterId::Taper(level) => DEFAULT_TAPERS[level],
            ParameterId::HighPass(_) => DEFAULT_HIGH_PASS_HZ,
            ParameterId::LowPass(level) => DEFAULT_LOW_PASS_HZ[level],
            ParameterId::Drop { level, note } => bool_value(DEFAULT_DROPS[level][note]),
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParameterId::Gain(layer) => write!(f, "gain{}", layer.index()),
            ParameterId::Mute(layer) => write!(f, "mute{}", layer.index()),
            ParameterId::Pan(layer) => write!(f, "pan{}", layer.index()),
            ParameterId::Pitch(level) => write!(f, "pitch{level}"),
            ParameterId::Taper(level) => write!(f, "taper{level}"),
            ParameterId::HighPass(level) => write!(f, "hpf{level}"),
            ParameterId::LowPass(level) => write!(f, "lpf{level}"),
            ParameterId::Drop { level, note } => write!(f, "drop{level}_{note}"),
        }
    }
}

/// Decibels to linear gain.
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn bool_value(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Atomic store for every parameter. Shared between a control thread
/// (writes) and the audio thread (reads through [`ParameterReader`]).
pub struct SharedParameters {
    gains: [AtomicF32; NUM_LAYERS],
    mutes: [AtomicBool; NUM_LAYERS],
    pans: [AtomicF32; NUM_LAYERS],
    pitches: [AtomicF32; MAX_LEVELS],
    tapers: [AtomicF32; MAX_LEVELS],
    high_pass: [AtomicF32; MAX_LEVELS],
    low_pass: [AtomicF32; MAX_LEVELS],
    drops: [[AtomicBool; NOTES_PER_PAIR]; MAX_LEVELS],
}

impl Default for SharedParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedParameters {
    /// A store holding every default.
    pub fn new() -> Self {
        let float = |id: fn(usize) -> ParameterId| -> [AtomicF32; MAX_LEVELS] {
            std::array::from_fn(|i| AtomicF32::new(id(i).default_value()))
        };
        Self {
            gains: std::array::from_fn(|i| {
                AtomicF32::new(ParameterId::Gain(Layer::from_index(i)).default_value())
            }),
            mutes: std::array::from_fn(|i| AtomicBool::new(DEFAULT_MUTES[i])),
            pans: std::array::from_fn(|i| AtomicF32::new(DEFAULT_PANS[i])),
            pitches: float(ParameterId::Pitch),
            tapers: float(ParameterId::Taper),
            high_pass: float(ParameterId::HighPass),
            low_pass: float(ParameterId::LowPass),
            drops: std::array::from_fn(|level| {
                std::array::from_fn(|note| AtomicBool::new(DEFAULT_DROPS[level][note]))
            }),
        }
    }

    /// Current value. Flags read as 0 or 1.
    pub fn get(&self, id: ParameterId) -> f32 {
        match id {
            ParameterId::Gain(layer) => self.gains[layer.index()].load(Ordering::Acquire),
            ParameterId::Mute(layer) => bool_value(self.mutes[layer.index()].load(Ordering::Acquire)),
            ParameterId::Pan(layer) => self.pans[layer.index()].load(Ordering::Acquire),
            ParameterId::Pitch(level) => self.pitches[level].load(Ordering::Acquire),
            ParameterId::Taper(level) => self.tapers[level].load(Ordering::Acquire),
            ParameterId::HighPass(level) => self.high_pass[level].load(Ordering::Acquire),
            ParameterId::LowPass(level) => self.low_pass[level].load(Ordering::Acquire),
            ParameterId::Drop { level, note } => {
                bool_value(self.drops[level][note].load(Ordering::Acquire))
            }
        }
    }

    /// Store a value, clamped into the parameter's range. Flags are set for
    /// any value of at least 0.5.
    pub fn set(&self, id: ParameterId, value: f32) {
        let (min, max) = id.range();
        let value = if value.is_nan() { id.default_value() } else { value.clamp(min, max) };
        match id {
            ParameterId::Gain(layer) => self.gains[layer.index()].store(value, Ordering::Release),
            ParameterId::Mute(layer) => self.mutes[layer.index()].store(value >= 0.5, Ordering::Release),
            ParameterId::Pan(layer) => self.pans[layer.index()].store(value, Ordering::Release),
            ParameterId::Pitch(level) => self.pitches[level].store(value, Ordering::Release),
            ParameterId::Taper(level) => self.tapers[level].store(value, Ordering::Release),
            ParameterId::HighPass(level) => self.high_pass[level].store(value, Ordering::Release),
            ParameterId::LowPass(level) => self.low_pass[level].store(value, Ordering::Release),
            ParameterId::Drop { level, note } => {
                self.drops[level][note].store(value >= 0.5, Ordering::Release)
            }
        }
    }

    /// Parse `key` and store `value`.
    pub fn set_by_key(&self, key: &str, value: f32) -> Result<(), EngineError> {
        self.set(ParameterId::parse(key)?, value);
        Ok(())
    }

    /// Put every parameter back to its default.
    pub fn restore_defaults(&self) {
        for id in ParameterId::all() {
            self.set(id, id.default_value());
        }
    }
}

/// Audio-thread view of a [`SharedParameters`] store with change tracking.
pub struct ParameterReader {
    shared: Arc<SharedParameters>,
    last_pitch: [f32; MAX_LEVELS],
    last_low_pass: [f32; MAX_LEVELS],
    last_high_pass: [f32; MAX_LEVELS],
}

impl ParameterReader {
    pub fn new(shared: Arc<SharedParameters>) -> Self {
        Self {
            shared,
            last_pitch: [f32::NAN; MAX_LEVELS],
            last_low_pass: [f32::NAN; MAX_LEVELS],
            last_high_pass: [f32::NAN; MAX_LEVELS],
        }
    }

    pub fn shared(&self) -> &Arc<SharedParameters> {
        &self.shared
    }
}

#[inline]
fn track(last: &mut f32, value: f32) -> ParamValue {
    let changed = *last != value;
    *last = value;
    ParamValue { value, changed }
}

impl ParameterProvider for ParameterReader {
    #[inline]
    fn gain(&mut self, layer: Layer) -> f32 {
        self.shared.gains[layer.index()].load(Ordering::Acquire)
    }

    #[inline]
    fn pan(&mut self, layer: Layer) -> f32 {
        self.shared.pans[layer.index()].load(Ordering::Acquire)
    }

    #[inline]
    fn mute(&mut self, layer: Layer) -> f32 {
        bool_value(self.shared.mutes[layer.index()].load(Ordering::Acquire))
    }

    #[inline]
    fn taper(&mut self, level: usize) -> f32 {
        self.shared.tapers[level].load(Ordering::Acquire)
    }

    #[inline]
    fn pitch(&mut self, level: usize, _smoothed: bool) -> ParamValue {
        let value = self.shared.pitches[level].load(Ordering::Acquire);
        track(&mut self.last_pitch[level], value)
    }

    #[inline]
    fn low_pass_cutoff(&mut self, level: usize) -> ParamValue {
        let value = self.shared.low_pass[level].load(Ordering::Acquire);
        track(&mut self.last_low_pass[level], value)
    }

    #[inline]
    fn high_pass_cutoff(&mut self, level: usize) -> ParamValue {
        let value = self.shared.high_pass[level].load(Ordering::Acquire);
        track(&mut self.last_high_pass[level], value)
    }

    #[inline]
    fn drop_note(&self, level: usize, note: usize) -> bool {
        self.shared.drops[level][note].load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_layer_layout() {
        let params = SharedParameters::new();
        assert_eq!(params.get(ParameterId::Gain(Layer::Dry)), 1.0);
        assert!((params.get(ParameterId::Gain(Layer::Level(0))) - db_to_gain(-2.0)).abs() < 1e-6);
        assert_eq!(params.get(ParameterId::Mute(Layer::Level(2))), 1.0);
        assert_eq!(params.get(ParameterId::Mute(Layer::Level(1))), 0.0);
        assert_eq!(params.get(ParameterId::Pan(Layer::Level(0))), -100.0);
        assert_eq!(params.get(ParameterId::Pitch(3)), 4800.0);
        assert_eq!(params.get(ParameterId::Drop { level: 2, note: 2 }), 1.0);
        assert_eq!(params.get(ParameterId::Drop { level: 3, note: 3 }), 1.0);
        assert_eq!(params.get(ParameterId::Drop { level: 0, note: 2 }), 0.0);
    }

    #[test]
    fn keys_parse_back_to_ids() {
        for id in ParameterId::all() {
            assert_eq!(ParameterId::parse(&id.to_string()).unwrap(), id);
        }
        assert_eq!(ParameterId::all().len(), 3 * NUM_LAYERS + 8 * MAX_LEVELS);
    }

    #[test]
    fn rejects_unknown_keys() {
        for key in ["gain", "gain9", "pitch4", "drop1", "drop0_4", "volume0", "pitchx"] {
            assert!(ParameterId::parse(key).is_err(), "{key}");
        }
    }

    #[test]
    fn writes_are_clamped() {
        let params = SharedParameters::new();
        params.set(ParameterId::Pitch(0), 10000.0);
        assert_eq!(params.get(ParameterId::Pitch(0)), MAX_PITCH_CENTS);
        params.set(ParameterId::Pan(Layer::Dry), -300.0);
        assert_eq!(params.get(ParameterId::Pan(Layer::Dry)), -100.0);
        params.set(ParameterId::LowPass(1), 1.0);
        assert_eq!(params.get(ParameterId::LowPass(1)), MIN_CUTOFF_HZ);
        params.set(ParameterId::Gain(Layer::Dry), f32::NAN);
        assert_eq!(params.get(ParameterId::Gain(Layer::Dry)), 1.0);
    }

    #[test]
    fn reader_reports_changes_once() {
        let shared = Arc::new(SharedParameters::new());
        let mut reader = ParameterReader::new(shared.clone());

        assert!(reader.pitch(1, true).changed);
        assert!(!reader.pitch(1, true).changed);

        shared.set(ParameterId::Pitch(1), 700.0);
        let value = reader.pitch(1, true);
        assert_eq!(value, ParamValue { value: 700.0, changed: true });
        assert!(!reader.pitch(1, true).changed);
        assert!(reader.low_pass_cutoff(1).changed);
    }

    #[test]
    fn restore_defaults_undoes_writes() {
        let params = SharedParameters::new();
        params.set_by_key("taper1", 0.9).unwrap();
        params.set_by_key("drop0_1", 1.0).unwrap();
        params.restore_defaults();
        assert_eq!(params.get(ParameterId::Taper(1)), 0.0);
        assert_eq!(params.get(ParameterId::Drop { level: 0, note: 1 }), 0.0);
    }
}
