use anyhow::{Context, Result};
use serde::Deserialize;
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use crate::geometry::spiral::SpiralParams;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub spiral: SpiralParams,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub text: TextConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
}

/// Look of the record and the per-frame motion.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of cached section layers.
    pub sections: usize,
    /// Target segment length (pixels of arc) when drawing the spiral.
    pub precision: f64,
    /// Largest angular step per drawn segment, in radians.
    pub step_max: f64,
    /// Extra scale at the peak of a full-confidence beat.
    pub pulse_strength: f64,
    pub pulse_window_ms: f64,
    /// Marker radius per unit of relative loudness.
    pub marker_scale: f64,
    /// Radial marker offset per pitch class away from the groove center.
    pub pitch_spread: f64,
    /// Full turns of the record over the whole track.
    pub rotation_turns: f64,
    /// Added to the playback position to hide display latency.
    pub lead_ms: f64,
}

#[derive(Debug, Deserialize)]
pub struct TextConfig {
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub font_url: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sections: 10,
            precision: 20.0,
            step_max: TAU / 180.0,
            pulse_strength: 0.05,
            pulse_window_ms: 150.0,
            marker_scale: 2.5,
            pitch_spread: 1.2,
            rotation_turns: 2.0,
            lead_ms: 20.0,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_url: None,
            font_size: default_font_size(),
        }
    }
}

fn default_width() -> u32 { 1200 }
fn default_height() -> u32 { 1200 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_font_size() -> f64 { 28.0 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Explicit path first, then `./spindle.toml`, then the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spindle.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spindle").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spindle").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("empty config");
        assert_eq!(cfg.output.width, 1200);
        assert_eq!(cfg.output.codec, "libx264");
        assert_eq!(cfg.render, RenderConfig::default());
        assert_eq!(cfg.spiral, SpiralParams::default());
        assert!(cfg.text.font.is_none());
    }

    #[test]
    fn partial_sections_override() {
        let cfg: Config = toml::from_str(
            r#"
            [output]
            fps = 60

            [spiral]
            rotations = 20.0

            [render]
            sections = 4
            pulse_strength = 0.1

            [text]
            font = "/tmp/font.ttf"
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.output.fps, 60);
        assert_eq!(cfg.output.height, 1200);
        assert_eq!(cfg.spiral.rotations, 20.0);
        assert_eq!(cfg.spiral.a, 1.0);
        assert_eq!(cfg.render.sections, 4);
        assert_eq!(cfg.render.pulse_strength, 0.1);
        assert_eq!(cfg.render.pulse_window_ms, 150.0);
        assert_eq!(cfg.text.font, Some(PathBuf::from("/tmp/font.ttf")));
        assert_eq!(cfg.text.font_size, 28.0);
    }

    #[test]
    fn explicit_path_wins() {
        let p = PathBuf::from("/nonexistent/custom.toml");
        assert_eq!(find_config(Some(&p)), Some(p));
    }
}
