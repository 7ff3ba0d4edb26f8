// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile settings and RON persistence helpers.

use crate::compiler::{FeatureLevel, QualityLevel};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error loading or saving a RON document
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid RON for the expected type
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Serialize to pretty RON
pub fn to_ron<T: Serialize>(value: &T) -> Result<String, LoadError> {
    let config = ron::ser::PrettyConfig::default()
        .struct_names(true)
        .enumerate_arrays(false);
    Ok(ron::ser::to_string_pretty(value, config)?)
}

/// Deserialize from RON
pub fn from_ron<T: DeserializeOwned>(s: &str) -> Result<T, LoadError> {
    Ok(ron::from_str(s)?)
}

/// Read a RON document from disk
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path)?;
    from_ron(&content)
}

/// Write a RON document to disk
pub fn save_ron<T: Serialize>(value: &T, path: &Path) -> Result<(), LoadError> {
    std::fs::write(path, to_ron(value)?)?;
    Ok(())
}

/// Target and overrides of one compile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Quality tier selected by quality switches
    pub quality_level: QualityLevel,
    /// Feature tier selected by feature level switches
    pub feature_level: FeatureLevel,
    /// Values replacing the defaults of named static bool parameters
    pub static_parameter_overrides: IndexMap<String, bool>,
}

impl CompileSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        load_ron(path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        save_ron(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: CompileSettings = from_ron("(quality_level: Low)").unwrap();
        assert_eq!(settings.quality_level, QualityLevel::Low);
        assert_eq!(settings.feature_level, FeatureLevel::Sm5);
        assert!(settings.static_parameter_overrides.is_empty());
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = CompileSettings {
            feature_level: FeatureLevel::Es31,
            ..CompileSettings::default()
        };
        settings
            .static_parameter_overrides
            .insert("UseDetail".to_string(), true);

        let text = to_ron(&settings).unwrap();
        let loaded: CompileSettings = from_ron(&text).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_invalid_document_is_a_parse_error() {
        let result = from_ron::<CompileSettings>("(quality_level: Ultra)");
        assert!(matches!(result, Err(LoadError::Parse(_))));
    }
}
