//! Synthesis configuration: device limits and default block shapes.
//!
//! Loaded from TOML (missing keys fall back to the `default` preset),
//! optionally overridden by `FIELDSYNTH_*` environment variables, and
//! validated before use. Block shapes are given in launch order:
//! columns first, then rows, then layers.


use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::kir::lower::KNOWN_TARGETS;

/// Errors that can occur when loading or validating a [`SynthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown preset '{0}' (expected one of: default, compact)")]
    UnknownPreset(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Lowering backend name.
    /// Override: `FIELDSYNTH_TARGET`
    pub target: String,
    /// Ceiling on threads in one work group.
    /// Override: `FIELDSYNTH_MAX_THREADS`
    pub max_threads_per_block: usize,
    /// Per-axis work-group ceilings.
    pub max_block: [usize; 3],
    /// Default block for 1-D launches.
    /// Override: `FIELDSYNTH_BLOCK_1D`
    pub block_1d: usize,
    /// Override: `FIELDSYNTH_BLOCK_2D` (e.g. `16x16`)
    pub block_2d: [usize; 2],
    pub block_3d: [usize; 3],
    /// Edge of the square transpose tile.
    /// Override: `FIELDSYNTH_TRANSPOSE_TILE`
    pub transpose_tile: usize,
    /// Largest radix a single transform pass may use.
    /// Override: `FIELDSYNTH_FFT_MAX_RADIX`
    pub fft_max_radix: usize,
    /// Local memory available to one work group.
    /// Override: `FIELDSYNTH_LOCAL_MEMORY`
    pub local_memory_bytes: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            target: "opencl".to_string(),
            max_threads_per_block: 256,
            max_block: [256, 256, 64],
            block_1d: 256,
            block_2d: [16, 16],
            block_3d: [8, 8, 4],
            transpose_tile: 16,
            fft_max_radix: 16,
            local_memory_bytes: 32 * 1024,
        }
    }
}

impl SynthConfig {
    /// Small work groups for embedded or integrated devices.
    pub fn compact() -> Self {
        Self {
            target: "opencl".to_string(),
            max_threads_per_block: 64,
            max_block: [64, 64, 16],
            block_1d: 64,
            block_2d: [8, 8],
            block_3d: [4, 4, 4],
            transpose_tile: 8,
            fft_max_radix: 8,
            local_memory_bytes: 16 * 1024,
        }
    }

    /// Resolve a preset by name.
    pub fn resolve(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::default()),
            "compact" => Ok(Self::compact()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Block shape for a launch of `dims` axes.
    pub fn default_block(&self, dims: usize) -> Vec<usize> {
        match dims {
            0 | 1 => vec![self.block_1d],
            2 => self.block_2d.to_vec(),
            _ => self.block_3d.to_vec(),
        }
    }

    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut cfg: SynthConfig = toml::from_str(&contents)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a TOML string. No environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let cfg: SynthConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !KNOWN_TARGETS.contains(&self.target.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown target '{}' (known: {})",
                self.target,
                KNOWN_TARGETS.join(", ")
            )));
        }
        if self.max_threads_per_block == 0 || !self.max_threads_per_block.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "max_threads_per_block must be a power of two, got {}",
                self.max_threads_per_block
            )));
        }
        if self.max_block.contains(&0) {
            return Err(ConfigError::Validation(
                "max_block extents must be > 0".into(),
            ));
        }
        let blocks: [(&str, Vec<usize>); 3] = [
            ("block_1d", vec![self.block_1d]),
            ("block_2d", self.block_2d.to_vec()),
            ("block_3d", self.block_3d.to_vec()),
        ];
        for (name, block) in &blocks {
            if block.contains(&0) {
                return Err(ConfigError::Validation(format!("{} extents must be > 0", name)));
            }
            let threads: usize = block.iter().product();
            if threads > self.max_threads_per_block {
                return Err(ConfigError::Validation(format!(
                    "{} has {} threads, above max_threads_per_block {}",
                    name, threads, self.max_threads_per_block
                )));
            }
            for (axis, (&extent, &max)) in block.iter().zip(self.max_block.iter()).enumerate() {
                if extent > max {
                    return Err(ConfigError::Validation(format!(
                        "{} axis {} is {}, above max_block {}",
                        name, axis, extent, max
                    )));
                }
            }
        }
        if self.transpose_tile == 0 || !self.transpose_tile.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "transpose_tile must be a power of two, got {}",
                self.transpose_tile
            )));
        }
        if self.transpose_tile * self.transpose_tile > self.max_threads_per_block {
            return Err(ConfigError::Validation(format!(
                "transpose_tile {} needs {} threads, above max_threads_per_block {}",
                self.transpose_tile,
                self.transpose_tile * self.transpose_tile,
                self.max_threads_per_block
            )));
        }
        if !(2..=64).contains(&self.fft_max_radix) || !self.fft_max_radix.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "fft_max_radix must be a power of two in 2..=64, got {}",
                self.fft_max_radix
            )));
        }
        if self.local_memory_bytes == 0 {
            return Err(ConfigError::Validation(
                "local_memory_bytes must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Apply `FIELDSYNTH_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("FIELDSYNTH_TARGET") {
            self.target = val;
        }
        if let Some(val) = lookup("FIELDSYNTH_MAX_THREADS") {
            self.max_threads_per_block = parse_usize("FIELDSYNTH_MAX_THREADS", &val)?;
        }
        if let Some(val) = lookup("FIELDSYNTH_BLOCK_1D") {
            self.block_1d = parse_usize("FIELDSYNTH_BLOCK_1D", &val)?;
        }
        if let Some(val) = lookup("FIELDSYNTH_BLOCK_2D") {
            self.block_2d = parse_block_2d("FIELDSYNTH_BLOCK_2D", &val)?;
        }
        if let Some(val) = lookup("FIELDSYNTH_TRANSPOSE_TILE") {
            self.transpose_tile = parse_usize("FIELDSYNTH_TRANSPOSE_TILE", &val)?;
        }
        if let Some(val) = lookup("FIELDSYNTH_FFT_MAX_RADIX") {
            self.fft_max_radix = parse_usize("FIELDSYNTH_FFT_MAX_RADIX", &val)?;
        }
        if let Some(val) = lookup("FIELDSYNTH_LOCAL_MEMORY") {
            self.local_memory_bytes = parse_usize("FIELDSYNTH_LOCAL_MEMORY", &val)?;
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::EnvOverride {
            key: key.into(),
            value: value.into(),
            reason: e.to_string(),
        })
}

fn parse_block_2d(key: &str, value: &str) -> Result<[usize; 2], ConfigError> {
    let parts: Vec<&str> = value.split('x').collect();
    if parts.len() != 2 {
        return Err(ConfigError::EnvOverride {
            key: key.into(),
            value: value.into(),
            reason: "expected WIDTHxHEIGHT".into(),
        });
    }
    Ok([parse_usize(key, parts[0])?, parse_usize(key, parts[1])?])
}
