// config.rs: construction-time viewer settings
//
// Sources, later ones win:
// - built-in defaults
// - JSON file passed with --config <file>
// - env PANORAMA_TEXTURE
// - CLI: --texture <path|url>, --fov <deg>, --radius <r>, --segments <w>x<h>, or a bare texture argument

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::texture::TextureSource;

pub const DEFAULT_TEXTURE: &str = "assets/textures/panorama.jpg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("width segments must be at least 3, got {0}")]
    WidthSegments(u32),
    #[error("height segments must be at least 2, got {0}")]
    HeightSegments(u32),
    #[error("sphere radius must be positive, got {0}")]
    Radius(f32),
    #[error("near clipping plane must be positive, got {0}")]
    NearClipping(f32),
    #[error("far clipping plane ({far}) must lie beyond the near plane ({near})")]
    FarClipping { near: f32, far: f32 },
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value for {flag}: {value:?}")]
    InvalidValue { flag: String, value: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub near_clipping: f32,
    pub far_clipping: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub radius: f32,
    /// File path or http(s) URL of the equirectangular image shown at startup.
    pub texture: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            field_of_view: 75.0,
            near_clipping: 1.0,
            far_clipping: 1100.0,
            width_segments: 60,
            height_segments: 40,
            radius: 500.0,
            texture: DEFAULT_TEXTURE.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve from the process arguments and environment, then validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_texture = std::env::var("PANORAMA_TEXTURE").ok();
        Self::resolve(std::env::args().skip(1), env_texture)
    }

    /// `args` excludes the program name.
    pub fn resolve(
        args: impl IntoIterator<Item = String>,
        env_texture: Option<String>,
    ) -> Result<Self, ConfigError> {
        let args: Vec<String> = args.into_iter().collect();

        // --config is applied first so explicit flags override file values
        let mut config = match find_flag(&args, "--config")? {
            Some(path) => Self::from_json_file(Path::new(path))?,
            None => Self::default(),
        };

        if let Some(texture) = env_texture.filter(|t| !t.trim().is_empty()) {
            config.texture = texture;
        }

        let mut it = args.iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--config" => {
                    it.next();
                }
                "--texture" => config.texture = next_value(&mut it, arg)?.to_string(),
                "--fov" => config.field_of_view = parse_value(next_value(&mut it, arg)?, arg)?,
                "--radius" => config.radius = parse_value(next_value(&mut it, arg)?, arg)?,
                "--segments" => {
                    let value = next_value(&mut it, arg)?;
                    let (w, h) = value.split_once('x').ok_or_else(|| invalid(arg, value))?;
                    config.width_segments = parse_value(w, arg)?;
                    config.height_segments = parse_value(h, arg)?;
                }
                other if !other.starts_with("--") => config.texture = other.to_string(),
                _ => log::warn!("ignoring unknown argument {arg}"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width_segments < 3 {
            return Err(ConfigError::WidthSegments(self.width_segments));
        }
        if self.height_segments < 2 {
            return Err(ConfigError::HeightSegments(self.height_segments));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::Radius(self.radius));
        }
        if !(self.near_clipping.is_finite() && self.near_clipping > 0.0) {
            return Err(ConfigError::NearClipping(self.near_clipping));
        }
        if !(self.far_clipping.is_finite() && self.far_clipping > self.near_clipping) {
            return Err(ConfigError::FarClipping {
                near: self.near_clipping,
                far: self.far_clipping,
            });
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(ConfigError::FieldOfView(self.field_of_view));
        }
        Ok(())
    }

    pub fn texture_source(&self) -> TextureSource {
        TextureSource::parse(&self.texture)
    }
}

fn find_flag<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>, ConfigError> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|v| Some(v.as_str()))
            .ok_or_else(|| ConfigError::MissingValue(flag.to_string())),
        None => Ok(None),
    }
}

fn next_value<'a>(
    it: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a str, ConfigError> {
    it.next()
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(flag, value))
}

fn invalid(flag: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}
