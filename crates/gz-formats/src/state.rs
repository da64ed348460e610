//! Session state document.
//!
//! A JSON object holding the tempo and every stored parameter by key:
//!
//! ```json
//! { "currentBpm": 120.0, "parameters": { "gain0": 1.0, "drop2_2": 1.0 } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gz_engine::{ParameterId, SharedParameters};
use serde::{Deserialize, Serialize};

use crate::FormatError;

fn default_bpm() -> f32 {
    120.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default = "default_bpm")]
    pub current_bpm: f32,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_bpm: default_bpm(),
            parameters: BTreeMap::new(),
        }
    }
}

impl SessionState {
    /// Capture every parameter in `params` along with the tempo.
    pub fn snapshot(params: &SharedParameters, bpm: f32) -> Self {
        let parameters = ParameterId::all()
            .into_iter()
            .map(|id| (id.to_string(), params.get(id)))
            .collect();
        Self {
            current_bpm: bpm,
            parameters,
        }
    }

    /// Write every known key into `params`. Unknown keys are skipped;
    /// returns how many were.
    pub fn apply(&self, params: &SharedParameters) -> usize {
        let mut unknown = 0;
        for (key, &value) in &self.parameters {
            if params.set_by_key(key, value).is_err() {
                log::warn!("ignoring unknown parameter {key:?} in state document");
                unknown += 1;
            }
        }
        unknown
    }

    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gz_engine::Layer;

    #[test]
    fn snapshot_lists_every_key() {
        let params = SharedParameters::new();
        let state = SessionState::snapshot(&params, 97.5);
        assert_eq!(state.parameters.len(), ParameterId::all().len());
        assert_eq!(state.parameters["pan1"], -100.0);
        assert_eq!(state.parameters["drop3_3"], 1.0);
        assert_eq!(state.current_bpm, 97.5);
    }

    #[test]
    fn json_uses_camel_case_tempo() {
        let state = SessionState::snapshot(&SharedParameters::new(), 120.0);
        let json = state.to_json().unwrap();
        assert!(json.contains("\"currentBpm\""));
        assert!(json.contains("\"lpf0\""));
        assert_eq!(SessionState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn apply_restores_values_and_skips_unknown_keys() {
        let source = SharedParameters::new();
        source.set(ParameterId::Pitch(1), -700.0);
        source.set(ParameterId::Mute(Layer::Dry), 1.0);
        let mut state = SessionState::snapshot(&source, 80.0);
        state.parameters.insert("wobble0".into(), 3.0);

        let target = SharedParameters::new();
        assert_eq!(state.apply(&target), 1);
        assert_eq!(target.get(ParameterId::Pitch(1)), -700.0);
        assert_eq!(target.get(ParameterId::Mute(Layer::Dry)), 1.0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let state = SessionState::from_json("{}").unwrap();
        assert_eq!(state, SessionState::default());
        assert!(SessionState::from_json("[1, 2]").is_err());
    }
}
