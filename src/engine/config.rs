// Session configuration.
//
// Loaded from TOML; every field has a default so a partial (or empty) file
// is valid. The defaults reproduce the shipped level's tuning.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::camera::ViewCamera;
use super::character::CharacterParams;
use super::cluster::ClusterParams;
use super::ground::DEFAULT_PROBE_HEIGHT;
use super::grid::GridParams;
use super::physics::PhysicsParams;
use super::scene::SceneNames;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which movement controller drives the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Discrete validated steps with tweened transitions.
    #[default]
    Stepped,
    /// Impulses under gravity, resolved against the collision world.
    Physics,
}

/// Collider build tuning for the level mesh.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColliderConfig {
    pub cell_size: f32,
    pub min_cells_per_cluster: usize,
    pub height_above_ground: f32,
    pub expand: f32,
}

impl Default for ColliderConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.6,
            min_cells_per_cluster: 2,
            height_above_ground: 0.04,
            expand: 0.08,
        }
    }
}

impl ColliderConfig {
    pub fn grid_params(&self) -> GridParams {
        GridParams { cell_size: self.cell_size, height_above_ground: self.height_above_ground }
    }

    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams { min_cells_per_cluster: self.min_cells_per_cluster, expand_margin: self.expand }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Height the per-move downward probe starts from.
    pub probe_height: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self { probe_height: DEFAULT_PROBE_HEIGHT }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub movement_mode: MovementMode,
    pub colliders: ColliderConfig,
    pub character: CharacterParams,
    pub ground: GroundConfig,
    pub physics: PhysicsParams,
    pub names: SceneNames,
    pub camera: ViewCamera,
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from `path`, or fall back to defaults if the file is missing or
    /// unreadable. Parse errors are logged, not fatal.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::Projection;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.movement_mode, MovementMode::Stepped);
        assert_eq!(config.colliders.cell_size, 0.6);
        assert_eq!(config.colliders.min_cells_per_cluster, 2);
        assert_eq!(config.ground.probe_height, 1000.0);
        assert_eq!(config.names.character, "Man");
        assert_eq!(config.names.interactive.len(), 6);
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let config = SessionConfig::from_toml_str(
            r#"
            movement_mode = "physics"

            [character]
            move_distance = 2.0

            [names]
            interactive = ["Sign"]

            [camera]
            eye = [0.0, 10.0, -10.0]
            projection = { kind = "perspective", fov_y = 0.8 }
            "#,
        )
        .unwrap();
        assert_eq!(config.movement_mode, MovementMode::Physics);
        assert_eq!(config.character.move_distance, 2.0);
        assert_eq!(config.character.jump_height, 1.0);
        assert_eq!(config.names.interactive, vec!["Sign".to_string()]);
        assert_eq!(config.names.level, "Level_1");
        assert_eq!(config.camera.projection, Projection::Perspective { fov_y: 0.8 });
        assert_eq!(config.camera.far, 1000.0);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(SessionConfig::from_toml_str("movement_mode = "), Err(ConfigError::Toml(_))));
        assert!(matches!(SessionConfig::from_toml_str("movement_mode = \"flying\""), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn missing_file_falls_back() {
        let config = SessionConfig::load_or_default("/nonexistent/level_walker.toml");
        assert_eq!(config, SessionConfig::default());
    }
}
