//! Startup configuration: initial raw values for the six parameters.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::error::{LustreError, LustreResult};
use crate::params::ParamKind;

/// Named initial parameter values, in raw `[0, 10]` units.
///
/// Unset names default to 0. Values pass through the same clamped adjust
/// path as live edits, so out-of-range config entries saturate.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Initial smoothing value.
    pub smoothing: f32,
    /// Initial whitening value.
    pub whitening: f32,
    /// Initial face-slim value.
    pub face_slim: f32,
    /// Initial eye-zoom value.
    pub eye_zoom: f32,
    /// Initial lipstick value.
    pub lipstick: f32,
    /// Initial blusher value.
    pub blusher: f32,
}

impl EffectConfig {
    /// Load a config file. A parse failure is a fatal startup error.
    pub fn load(path: &Path) -> LustreResult<Self> {
        let f = File::open(path).map_err(|e| {
            LustreError::validation(format!(
                "failed to open config file '{}': {e}",
                path.display()
            ))
        })?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            LustreError::validation(format!(
                "failed to parse config file '{}': {e}",
                path.display()
            ))
        })
    }

    /// Initial value for one parameter.
    pub fn value(&self, kind: ParamKind) -> f32 {
        match kind {
            ParamKind::Smoothing => self.smoothing,
            ParamKind::Whitening => self.whitening,
            ParamKind::FaceSlim => self.face_slim,
            ParamKind::EyeZoom => self.eye_zoom,
            ParamKind::Lipstick => self.lipstick,
            ParamKind::Blusher => self.blusher,
        }
    }
}
