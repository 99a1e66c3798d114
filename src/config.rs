//! Runtime configuration
//!
//! Every field has a default, so an empty or partial TOML file is valid.
//! The defaults describe the demo scene: a dragon, a spinning monkey head
//! and a ground plane inside a skybox.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    gfx::{camera::CameraSettings, rendering::shadow_pipeline::ShadowSettings},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    /// Directory holding meshes and textures.
    pub assets: PathBuf,
    pub shadows: ShadowSettings,
    pub camera: CameraSettings,
    /// Upper bound on frames submitted to the GPU but not yet completed.
    pub frames_in_flight: usize,
    pub objects: Vec<ObjectConfig>,
    pub skybox: SkyboxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: PathBuf::from("assets"),
            shadows: ShadowSettings::default(),
            camera: CameraSettings::default(),
            frames_in_flight: 3,
            objects: vec![
                ObjectConfig {
                    name: "dragon".to_string(),
                    shininess: 64.0,
                    scale: 1.2,
                    translation: [-0.5, 0.0, -0.5],
                    casts_shadow: true,
                    spin_speed: 0.0,
                },
                ObjectConfig {
                    name: "suzanne".to_string(),
                    shininess: 8.0,
                    scale: 0.65,
                    translation: [0.5, 0.0, 0.5],
                    casts_shadow: true,
                    spin_speed: 1.0,
                },
                ObjectConfig {
                    name: "plane".to_string(),
                    shininess: 32.0,
                    scale: 2.75,
                    translation: [0.0, -0.8, 0.0],
                    casts_shadow: false,
                    spin_speed: 0.0,
                },
            ],
            skybox: SkyboxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            title: "Penumbra".to_string(),
        }
    }
}

/// One textured, lit object: `<assets>/<name>.obj` plus its two textures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    pub name: String,
    pub shininess: f32,
    pub scale: f32,
    pub translation: [f32; 3],
    pub casts_shadow: bool,
    /// Radians per second about +Y; 0 keeps the object static.
    pub spin_speed: f32,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            shininess: 32.0,
            scale: 1.0,
            translation: [0.0; 3],
            casts_shadow: true,
            spin_speed: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkyboxConfig {
    pub name: String,
    pub scale: f32,
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        Self {
            name: "cubemap".to_string(),
            scale: 15.0,
        }
    }
}

impl Config {
    /// Reads and validates a TOML config, or returns the defaults when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse TOML: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        let shadows = &self.shadows;
        if !shadows.map_size.is_power_of_two() || !(512..=4096).contains(&shadows.map_size) {
            return Err(Error::Config(format!(
                "shadows.map_size must be a power of two in 512..=4096, got {}",
                shadows.map_size
            )));
        }
        if shadows.blur_radius > 8 {
            return Err(Error::Config(format!(
                "shadows.blur_radius must be at most 8, got {}",
                shadows.blur_radius
            )));
        }
        if !(shadows.min_variance > 0.0) {
            return Err(Error::Config("shadows.min_variance must be positive".into()));
        }
        if !(0.0..1.0).contains(&shadows.bleed_reduction) {
            return Err(Error::Config(
                "shadows.bleed_reduction must be in [0, 1)".into(),
            ));
        }

        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(Error::Config(format!(
                "camera planes must satisfy 0 < near < far, got near {} far {}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov > 0.0 && camera.fov < std::f32::consts::PI) {
            return Err(Error::Config(format!("camera.fov out of range: {}", camera.fov)));
        }
        if !(camera.min_radius > 0.0 && camera.min_radius <= camera.max_radius) {
            return Err(Error::Config(format!(
                "camera radii must satisfy 0 < min_radius <= max_radius, got {} and {}",
                camera.min_radius, camera.max_radius
            )));
        }

        if self.frames_in_flight == 0 {
            return Err(Error::Config("frames_in_flight must be at least 1".into()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config("window size must be non-zero".into()));
        }
        for object in &self.objects {
            if object.name.is_empty() {
                return Err(Error::Config("every object needs a name".into()));
            }
            if !(object.scale > 0.0) {
                return Err(Error::Config(format!(
                    "object '{}' has non-positive scale {}",
                    object.name, object.scale
                )));
            }
        }
        if self.skybox.name.is_empty() {
            return Err(Error::Config("skybox.name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.shadows.map_size, 1024);
        let names: Vec<&str> = config.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["dragon", "suzanne", "plane"]);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.skybox.name, "cubemap");
        assert_eq!(config.objects.len(), 3);
    }

    #[test]
    fn test_partial_toml_overrides_fields() {
        let config = Config::from_toml(
            r#"
            assets = "data"
            frames_in_flight = 2

            [shadows]
            map_size = 2048

            [camera]
            radius = 5.0

            [[objects]]
            name = "teapot"
            spin_speed = 0.5
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.assets, PathBuf::from("data"));
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.shadows.map_size, 2048);
        assert_eq!(config.shadows.blur_radius, 2);
        assert_eq!(config.camera.radius, 5.0);
        assert_eq!(config.camera.max_radius, 8.0);
        assert_eq!(config.objects.len(), 1);
        assert_eq!(config.objects[0].scale, 1.0);
        assert!(config.objects[0].casts_shadow);
    }

    #[test]
    fn test_rejects_bad_shadow_map_size() {
        for size in [0, 300, 256, 8192] {
            let mut config = Config::default();
            config.shadows.map_size = size;
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{}", size);
        }
    }

    #[test]
    fn test_rejects_inverted_camera_planes() {
        let mut config = Config::default();
        config.camera.near = 10.0;
        config.camera.far = 1.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_frames_in_flight() {
        let mut config = Config::default();
        config.frames_in_flight = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml("frames_in_flight = \"three\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load(Some(Path::new("no/such/penumbra.toml")));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.window.height, 800);
    }
}
