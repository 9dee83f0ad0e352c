//! Runtime configuration loaded from RON.
//!
//! Every field has a default, so a config file only needs to name the values
//! it changes:
//!
//! ```ron
//! (
//!     fixed_timestep_us: 16_667,
//!     frame_budget_us: 4_000,
//!     chain: (max_depth: 3),
//! )
//! ```

use std::path::{Path, PathBuf};

use ability_core::clock::StepPolicy;
use ability_core::config::{ChainConfig, CoreConfig};
use ability_core::error::{CoreError, ErrorSeverity};
use serde::{Deserialize, Serialize};

/// Pacemaker, queue and chain tunables for one simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Length of one logical tick in microseconds.
    pub fixed_timestep_us: u64,
    /// Wall time the pacemaker may spend per real frame.
    pub frame_budget_us: u64,
    /// Slices one logical tick may take before the budget fuse trips.
    pub max_slices_per_logic_frame: u32,
    /// Logical ticks committed per real frame at most; the rest carries over.
    pub max_ticks_per_frame: u32,
    pub frames_per_step: u32,
    /// Work units a time-sliced system processes before yielding.
    pub max_work_units_per_slice: u32,
    pub request_capacity: usize,
    pub event_capacity: usize,
    pub order_capacity: usize,
    /// Committed events retained by the simulation's history.
    pub event_history: usize,
    /// Cell edge length of the spatial grid.
    pub spatial_cell_size: f32,
    pub chain: ChainConfig,
}

impl RuntimeConfig {
    pub const DEFAULT_FIXED_TIMESTEP_US: u64 = 16_667;

    /// Parses RON text and validates the result.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|error| ConfigError::Parse {
            path: None,
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = ron::from_str(&text).map_err(|error| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            message: error.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(
            target: "runtime::config",
            path = %path.display(),
            timestep_us = config.fixed_timestep_us,
            "runtime config loaded"
        );
        Ok(config)
    }

    /// Rejects values the pacemaker or queues cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("fixed_timestep_us", self.fixed_timestep_us),
            ("frame_budget_us", self.frame_budget_us),
            (
                "max_slices_per_logic_frame",
                self.max_slices_per_logic_frame as u64,
            ),
            ("max_ticks_per_frame", self.max_ticks_per_frame as u64),
            ("frames_per_step", self.frames_per_step as u64),
            (
                "max_work_units_per_slice",
                self.max_work_units_per_slice as u64,
            ),
            ("request_capacity", self.request_capacity as u64),
            ("event_capacity", self.event_capacity as u64),
            ("order_capacity", self.order_capacity as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        if !(self.spatial_cell_size.is_finite() && self.spatial_cell_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "spatial_cell_size",
                reason: "must be a positive finite length",
            });
        }
        if self.chain.max_depth > CoreConfig::MAX_CHAIN_DEPTH {
            return Err(ConfigError::Invalid {
                field: "chain.max_depth",
                reason: "exceeds the compiled chain depth ceiling",
            });
        }
        Ok(())
    }

    pub fn step_policy(&self) -> StepPolicy {
        StepPolicy::new(self.frames_per_step)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fixed_timestep_us: Self::DEFAULT_FIXED_TIMESTEP_US,
            frame_budget_us: 4_000,
            max_slices_per_logic_frame: 64,
            max_ticks_per_frame: 4,
            frames_per_step: StepPolicy::DEFAULT_FRAMES_PER_STEP,
            max_work_units_per_slice: 32,
            request_capacity: CoreConfig::DEFAULT_REQUEST_CAPACITY,
            event_capacity: CoreConfig::DEFAULT_EVENT_CAPACITY,
            order_capacity: CoreConfig::DEFAULT_ORDER_CAPACITY,
            event_history: 1024,
            spatial_cell_size: 4.0,
            chain: ChainConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse runtime config{}: {message}", display_path(.path))]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("invalid runtime config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

impl CoreError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Read { .. } => ErrorSeverity::Recoverable,
            Self::Parse { .. } | Self::Invalid { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ",
            Self::Parse { .. } => "CONFIG_PARSE",
            Self::Invalid { .. } => "CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ability_core::config::{PromptTimeout, TimeoutFallback};

    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = RuntimeConfig::from_ron_str(
            "(fixed_timestep_us: 10_000, chain: (max_depth: 2))",
        )
        .unwrap();

        assert_eq!(config.fixed_timestep_us, 10_000);
        assert_eq!(config.chain.max_depth, 2);
        assert_eq!(config.frames_per_step, StepPolicy::DEFAULT_FRAMES_PER_STEP);
        assert_eq!(config.chain.prompt_timeout, PromptTimeout::Never);
    }

    #[test]
    fn prompt_timeout_parses_as_struct_variant() {
        let config = RuntimeConfig::from_ron_str(
            "(chain: (prompt_timeout: AfterTicks(ticks: 30, fallback: Negate)))",
        )
        .unwrap();
        assert_eq!(
            config.chain.prompt_timeout,
            PromptTimeout::AfterTicks {
                ticks: 30,
                fallback: TimeoutFallback::Negate
            }
        );
    }

    #[test]
    fn zero_timestep_is_rejected() {
        let error = RuntimeConfig::from_ron_str("(fixed_timestep_us: 0)").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "fixed_timestep_us",
                ..
            }
        ));
        assert_eq!(error.severity(), ErrorSeverity::Validation);
    }

    #[test]
    fn chain_depth_above_ceiling_is_rejected() {
        let text = format!("(chain: (max_depth: {}))", CoreConfig::MAX_CHAIN_DEPTH + 1);
        let error = RuntimeConfig::from_ron_str(&text).unwrap_err();
        assert_eq!(error.error_code(), "CONFIG_INVALID");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(max_work_units_per_slice: 3, frames_per_step: 2)").unwrap();

        let config = RuntimeConfig::from_file(file.path()).unwrap();

        assert_eq!(config.max_work_units_per_slice, 3);
        assert_eq!(config.step_policy().frames_per_step(), 2);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ron");

        let error = RuntimeConfig::from_file(&path).unwrap_err();

        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("absent.ron"));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let error = RuntimeConfig::from_ron_str("(fixed_timestep_us: \"fast\")").unwrap_err();
        assert!(matches!(error, ConfigError::Parse { path: None, .. }));
    }
}
