//! Configuration parsing and management for Skeletar

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SkeletarError};
use crate::skeleton::topology::IntJoint;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub converter: ConverterConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            converter: ConverterConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SkeletarError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        contents.parse()
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, SkeletarError> {
        // Try config paths in order
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SkeletarError> {
        if self.tracking.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracking.port".to_string(),
                message: "Port must be greater than 0".to_string(),
            }
            .into());
        }

        if self.http.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.port".to_string(),
                message: "Port must be greater than 0".to_string(),
            }
            .into());
        }

        for constraint in &self.converter.constraints {
            if IntJoint::from_name(&constraint.joint).is_none() {
                return Err(ConfigError::UnknownJoint(constraint.joint.clone()).into());
            }
            if !(constraint.half_angle_deg > 0.0 && constraint.half_angle_deg < 180.0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("converter.constraints.{}", constraint.joint),
                    message: "Cone half-angle must be in (0, 180) degrees".to_string(),
                }
                .into());
            }
        }

        for bind in &self.converter.bind_pose {
            if IntJoint::from_name(&bind.joint).is_none() {
                return Err(ConfigError::UnknownJoint(bind.joint.clone()).into());
            }
            let len_sq: f32 = bind.rotation.iter().map(|v| v * v).sum();
            if len_sq < 1e-6 {
                return Err(ConfigError::InvalidValue {
                    field: format!("converter.bind_pose.{}", bind.joint),
                    message: "Quaternion must be non-zero".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = SkeletarError;

    /// Parse configuration from a TOML string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }
}

/// Skeleton receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// UDP port to receive skeleton frames on
    pub port: u16,
    /// Listen address for UDP socket
    pub listen_address: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            port: 12360,
            listen_address: "127.0.0.1".to_string(),
        }
    }
}

/// Joint conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Enable double-exponential orientation smoothing
    pub filtering: bool,
    /// Per-axis scale applied to every raw joint position
    pub joint_scale: [f32; 3],
    /// Install the built-in biomechanical constraint set
    pub default_constraints: bool,
    /// Extra cone constraints on top of the defaults
    pub constraints: Vec<ConstraintConfig>,
    /// Bind-pose calibration overrides, one per joint
    pub bind_pose: Vec<BindPoseConfig>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            filtering: true,
            joint_scale: [1.0, 1.0, -1.0],
            default_constraints: true,
            constraints: Vec::new(),
            bind_pose: Vec::new(),
        }
    }
}

/// One bind-pose calibration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindPoseConfig {
    /// Joint name (lowerCamel, e.g. "forearmLeft")
    pub joint: String,
    /// Calibrated bind rotation as `[x, y, z, w]`; normalized on load
    pub rotation: [f32; 4],
}

/// One configured cone constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// Joint name (lowerCamel, e.g. "upperArmLeft")
    pub joint: String,
    /// Cone axis in the joint's parent-local space
    pub axis: [f32; 3],
    /// Cone half-angle in degrees
    pub half_angle_deg: f32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("skeletar");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/skeletar");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/skeletar");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("skeletar");
        }
    }

    PathBuf::from(".")
}
