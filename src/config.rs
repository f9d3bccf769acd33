// ============================================================================
// EDITOR CONFIG — persisted defaults for sessions, dispatch and export
// ============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PixmarkError, Result};

/// Default pixel count at which color-matrix effects move to the GPU (≈400×400).
pub const DEFAULT_GPU_PIXEL_THRESHOLD: u64 = 160_000;

/// Settings shared by the editor session, the effect dispatcher and the CLI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Stroke color for new annotations, `#rrggbb` or `#rrggbbaa`.
    pub stroke_color: String,
    pub stroke_width: f32,
    /// Point size used by text-bearing annotations.
    pub font_size: f32,
    /// Edge length of the selection handle squares.
    pub handle_size: f32,
    pub gpu_enabled: bool,
    /// Preferred GPU adapter ("Auto", "High Performance", "Low Power").
    pub preferred_gpu: String,
    pub gpu_pixel_threshold: u64,
    pub default_export_format: String,
    /// JPEG / WebP quality (1-100).
    pub default_quality: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            stroke_color: "#ef4444".to_string(),
            stroke_width: 4.0,
            font_size: 24.0,
            handle_size: 8.0,
            gpu_enabled: true,
            preferred_gpu: "Auto".to_string(),
            gpu_pixel_threshold: DEFAULT_GPU_PIXEL_THRESHOLD,
            default_export_format: "png".to_string(),
            default_quality: 90,
        }
    }
}

impl EditorConfig {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixmark/pixmark.json  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Pixmark\pixmark.json
    /// On macOS:   ~/Library/Application Support/Pixmark/pixmark.json
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("pixmark");
            return Some(config_dir.join("pixmark.json"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("Pixmark").join("pixmark.json"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Pixmark")
                    .join("pixmark.json"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("pixmark.json")))
        }
    }

    /// Load settings from the default location (returns defaults if missing or corrupt).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(cfg) => {
                log_info!("Loaded settings from {}", path.display());
                cfg
            }
            Err(e) => {
                log_warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: EditorConfig =
            serde_json::from_str(&text).map_err(|e| PixmarkError::Config(e.to_string()))?;
        Ok(cfg.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text =
            serde_json::to_string_pretty(self).map_err(|e| PixmarkError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Save to the default location; failures are logged, not returned.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    /// Clamp every field into its valid range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if parse_hex_color(&self.stroke_color).is_none() {
            self.stroke_color = defaults.stroke_color;
        }
        if !self.stroke_width.is_finite() {
            self.stroke_width = defaults.stroke_width;
        }
        self.stroke_width = self.stroke_width.clamp(1.0, 100.0);
        if !self.font_size.is_finite() {
            self.font_size = defaults.font_size;
        }
        self.font_size = self.font_size.clamp(6.0, 400.0);
        if !self.handle_size.is_finite() {
            self.handle_size = defaults.handle_size;
        }
        self.handle_size = self.handle_size.clamp(2.0, 64.0);
        self.default_quality = self.default_quality.clamp(1, 100);
        self
    }

    /// Stroke color as straight RGBA, falling back to the default red.
    pub fn stroke_rgba(&self) -> [u8; 4] {
        parse_hex_color(&self.stroke_color).unwrap_or([0xef, 0x44, 0x44, 0xff])
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<[u8; 4]> {
    let hex = s.trim().trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (i, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ef4444"), Some([0xef, 0x44, 0x44, 0xff]));
        assert_eq!(parse_hex_color("00ff0080"), Some([0, 255, 0, 0x80]));
        assert_eq!(parse_hex_color("#fff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let cfg = EditorConfig {
            stroke_color: "nope".into(),
            stroke_width: 0.0,
            handle_size: f32::NAN,
            default_quality: 0,
            ..EditorConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.stroke_color, "#ef4444");
        assert_eq!(cfg.stroke_width, 1.0);
        assert_eq!(cfg.handle_size, 8.0);
        assert_eq!(cfg.default_quality, 1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EditorConfig = serde_json::from_str(r#"{ "stroke_width": 7.5 }"#).unwrap();
        assert_eq!(cfg.stroke_width, 7.5);
        assert_eq!(cfg.gpu_pixel_threshold, DEFAULT_GPU_PIXEL_THRESHOLD);
    }
}
