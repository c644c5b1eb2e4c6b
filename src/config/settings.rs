//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::detect::EngineKind;

use super::AppPaths;

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Settings for the landmark-detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Which backend to initialise first. A lite failure automatically
    /// falls back to the full backend.
    pub preferred_engine: EngineKind,
    /// Constrained-device flag: widens the lite detection interval and
    /// shrinks the smoothing window from 5 to 3.
    pub mobile: bool,
    /// Route detection through the dedicated worker thread instead of
    /// calling the backend in-process.
    pub offload: bool,
    /// How long a detect call issued during initialisation waits for
    /// readiness before resolving "no hand".
    pub ready_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            preferred_engine: EngineKind::Lite,
            mobile: false,
            offload: false,
            ready_timeout_ms: 2_000,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Settings for the capture device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture device index (0 = system default camera).
    pub device_index: u32,
    /// Ideal frame width; the device may negotiate a different value.
    pub width: u32,
    /// Ideal frame height; the device may negotiate a different value.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
        }
    }
}

// ---------------------------------------------------------------------------
// CompositorConfig
// ---------------------------------------------------------------------------

/// Settings for the render worker's output canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositorConfig {
    /// Canvas width in pixels (portrait 9:16 by default).
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Use the smaller mobile font sizes.
    pub mobile: bool,
    /// TTF font for the text overlays. `None` renders texture-only frames.
    pub font_path: Option<PathBuf>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1_280,
            mobile: false,
            font_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use finger_rhythm::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Landmark-detection settings.
    pub detection: DetectionConfig,
    /// Capture-device settings.
    pub camera: CameraConfig,
    /// Render-worker settings.
    pub compositor: CompositorConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(
            original.detection.preferred_engine,
            loaded.detection.preferred_engine
        );
        assert_eq!(original.detection.mobile, loaded.detection.mobile);
        assert_eq!(original.detection.offload, loaded.detection.offload);
        assert_eq!(
            original.detection.ready_timeout_ms,
            loaded.detection.ready_timeout_ms
        );

        assert_eq!(original.camera.device_index, loaded.camera.device_index);
        assert_eq!(original.camera.width, loaded.camera.width);
        assert_eq!(original.camera.height, loaded.camera.height);

        assert_eq!(original.compositor.width, loaded.compositor.width);
        assert_eq!(original.compositor.height, loaded.compositor.height);
        assert_eq!(original.compositor.font_path, loaded.compositor.font_path);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.detection.preferred_engine, EngineKind::Lite);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.compositor.height, 1_280);
    }

    /// Verify default values.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.detection.preferred_engine, EngineKind::Lite);
        assert!(!cfg.detection.mobile);
        assert!(!cfg.detection.offload);
        assert_eq!(cfg.detection.ready_timeout_ms, 2_000);
        assert_eq!(cfg.camera.device_index, 0);
        assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
        assert_eq!((cfg.compositor.width, cfg.compositor.height), (720, 1_280));
        assert!(cfg.compositor.font_path.is_none());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.detection.preferred_engine = EngineKind::Full;
        cfg.detection.mobile = true;
        cfg.detection.offload = true;
        cfg.detection.ready_timeout_ms = 500;
        cfg.camera.device_index = 2;
        cfg.camera.width = 1_280;
        cfg.camera.height = 720;
        cfg.compositor.mobile = true;
        cfg.compositor.font_path = Some(PathBuf::from("/usr/share/fonts/Inter.ttf"));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.detection.preferred_engine, EngineKind::Full);
        assert!(loaded.detection.mobile);
        assert!(loaded.detection.offload);
        assert_eq!(loaded.detection.ready_timeout_ms, 500);
        assert_eq!(loaded.camera.device_index, 2);
        assert_eq!((loaded.camera.width, loaded.camera.height), (1_280, 720));
        assert!(loaded.compositor.mobile);
        assert_eq!(
            loaded.compositor.font_path,
            Some(PathBuf::from("/usr/share/fonts/Inter.ttf"))
        );
    }
}
