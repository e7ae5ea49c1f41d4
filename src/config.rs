use crate::scene::TransformState;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MODEL_INSPECTOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "model-inspector.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Whether rotation input is clamped to its declared range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// The declared range only sizes the control; values accumulate freely.
    #[default]
    Unbounded,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKey {
    #[default]
    Shift,
    Control,
    Alt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedrawPolicy {
    #[default]
    Continuous,
    OnDemand,
}

/// One control slot in the inspector panel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SlotConfig {
    pub id: String,
    pub label: String,
}

impl SlotConfig {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window_size: [u32; 2],
    pub layout: Vec<SlotConfig>,
    /// Scale sliders span `[-scale_limit, scale_limit]`.
    pub scale_limit: f32,
    pub rotation_policy: RotationPolicy,
    pub uniform_scale_key: ModifierKey,
    pub redraw: RedrawPolicy,
    pub export_dir: PathBuf,
    /// Create a cube at startup so the controls are live before a model is loaded.
    pub start_with_cube: bool,
    pub initial_state: TransformState,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_size: [1280, 720],
            layout: default_layout(),
            scale_limit: 30.0,
            rotation_policy: RotationPolicy::default(),
            uniform_scale_key: ModifierKey::default(),
            redraw: RedrawPolicy::default(),
            export_dir: PathBuf::from("."),
            start_with_cube: true,
            initial_state: TransformState::default(),
        }
    }
}

pub fn default_layout() -> Vec<SlotConfig> {
    vec![
        SlotConfig::new("field01", "Color"),
        SlotConfig::new("field02", "Position X"),
        SlotConfig::new("field03", "Position Y"),
        SlotConfig::new("field04", "Position Z"),
        SlotConfig::new("field05", "Rotation X"),
        SlotConfig::new("field06", "Rotation Y"),
        SlotConfig::new("field07", "Rotation Z"),
        SlotConfig::new("range01", "Scale X"),
        SlotConfig::new("range02", "Scale Y"),
        SlotConfig::new("range03", "Scale Z"),
    ]
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Resolve the configuration from the environment, falling back to defaults.
    pub fn load() -> Self {
        let (path, explicit) = match std::env::var_os(CONFIG_ENV) {
            Some(value) => (PathBuf::from(value), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            log::debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!(
                    "Ignoring configuration at {}: {}; using defaults",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }
}
