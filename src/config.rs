//! Layer options for batched line rendering.
//!
//! Options are plain serde data with per-field defaults so a partial JSON
//! document (or none at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::RenderResult;

#[derive(Debug, Clone, thiserror::Error)]
#[error("LayerOptions validation failed: {message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOptions {
    /// Antialiasing softness radius in pixels, fed to `u_blur`.
    #[serde(default = "LayerOptions::default_blur")]
    pub blur: f32,
    /// Interior join extrusion is capped at this multiple of the half-thickness.
    #[serde(default = "LayerOptions::default_miter_limit")]
    pub miter_limit: f32,
    /// Edge length of the largest atlas bitmap the builder may produce.
    #[serde(default = "LayerOptions::default_max_atlas_size")]
    pub max_atlas_size: u32,
    /// Transparent gutter between packed sprites.
    #[serde(default = "LayerOptions::default_atlas_padding")]
    pub atlas_padding: u32,
    /// Hand the composed atlas bitmap to the inspector hook after each rebuild.
    #[serde(default)]
    pub debug_atlas: bool,
    /// Clear color used by the standalone wgpu backend, or `None` to load.
    #[serde(default)]
    pub clear_color: Option<[f32; 4]>,
}

impl LayerOptions {
    const fn default_blur() -> f32 {
        2.0
    }

    const fn default_miter_limit() -> f32 {
        4.0
    }

    const fn default_max_atlas_size() -> u32 {
        2048
    }

    const fn default_atlas_padding() -> u32 {
        1
    }

    pub fn with_blur(mut self, blur: f32) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_debug_atlas(mut self, enabled: bool) -> Self {
        self.debug_atlas = enabled;
        self
    }

    /// Parse options from a JSON document and validate them.
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let options: LayerOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file.
    pub fn from_path(path: &Path) -> RenderResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.blur.is_finite() || self.blur < 0.0 {
            return Err(ConfigError::new(format!(
                "blur must be finite and >= 0, got {}",
                self.blur
            )));
        }
        if !self.miter_limit.is_finite() || self.miter_limit < 1.0 {
            return Err(ConfigError::new(format!(
                "miterLimit must be >= 1, got {}",
                self.miter_limit
            )));
        }
        if self.max_atlas_size == 0 {
            return Err(ConfigError::new("maxAtlasSize must be greater than zero"));
        }
        if self.atlas_padding >= self.max_atlas_size {
            return Err(ConfigError::new(format!(
                "atlasPadding {} leaves no room in a {} px atlas",
                self.atlas_padding, self.max_atlas_size
            )));
        }
        Ok(())
    }
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            blur: Self::default_blur(),
            miter_limit: Self::default_miter_limit(),
            max_atlas_size: Self::default_max_atlas_size(),
            atlas_padding: Self::default_atlas_padding(),
            debug_atlas: false,
            clear_color: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_layer_defaults() {
        let options = LayerOptions::default();
        assert_eq!(options.blur, 2.0);
        assert_eq!(options.miter_limit, 4.0);
        assert_eq!(options.max_atlas_size, 2048);
        assert!(!options.debug_atlas);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let options = LayerOptions::from_json_str(r#"{"blur": 0.5, "debugAtlas": true}"#).unwrap();
        assert_eq!(options.blur, 0.5);
        assert!(options.debug_atlas);
        assert_eq!(options.atlas_padding, 1);
    }

    #[test]
    fn rejects_negative_blur() {
        let err = LayerOptions::from_json_str(r#"{"blur": -1}"#).unwrap_err();
        assert!(err.to_string().contains("blur must be finite"));
    }

    #[test]
    fn rejects_small_miter_limit() {
        let options = LayerOptions {
            miter_limit: 0.5,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
