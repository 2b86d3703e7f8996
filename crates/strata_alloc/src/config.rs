//! # Tracker Configuration
//!
//! ```toml
//! capture_stacks = true
//! stack_depth = 16
//! poison = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_core::{MemoryError, MemoryResult};

use crate::stack::MAX_STACK_DEPTH;

/// Byte written over every released chunk when poisoning is enabled.
pub const POISON_BYTE: u8 = 0xEE;

/// Allocation tracker settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Record the call stack of every allocation.
    pub capture_stacks: bool,
    /// Frames kept per allocation, at most [`MAX_STACK_DEPTH`].
    pub stack_depth: usize,
    /// Overwrite released chunks with [`POISON_BYTE`].
    pub poison: bool,
}

impl TrackerConfig {
    /// Stacks and poisoning in debug builds, neither in release builds.
    pub const DEFAULT: Self = Self {
        capture_stacks: cfg!(debug_assertions),
        stack_depth: 16,
        poison: cfg!(debug_assertions),
    };

    /// Counting only: no stacks, no poisoning.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            capture_stacks: false,
            stack_depth: 0,
            poison: false,
        }
    }

    /// Full diagnostics regardless of build profile.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            capture_stacks: true,
            stack_depth: MAX_STACK_DEPTH,
            poison: true,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] on malformed TOML or bad values.
    pub fn from_toml_str(source: &str) -> MemoryResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| MemoryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ConfigIo`] if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks the stack depth fits the fixed frame buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] if `stack_depth` is too large.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.stack_depth > MAX_STACK_DEPTH {
            return Err(MemoryError::InvalidConfig(format!(
                "stack_depth {} exceeds {MAX_STACK_DEPTH}",
                self.stack_depth
            )));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
        assert!(TrackerConfig::production().validate().is_ok());
        assert!(TrackerConfig::debug().validate().is_ok());
    }

    #[test]
    fn test_toml_overrides() {
        let config = TrackerConfig::from_toml_str("poison = false\nstack_depth = 4\n").unwrap();
        assert!(!config.poison);
        assert_eq!(config.stack_depth, 4);
        assert_eq!(config.capture_stacks, TrackerConfig::DEFAULT.capture_stacks);
    }

    #[test]
    fn test_deep_stacks_rejected() {
        let err = TrackerConfig::from_toml_str("stack_depth = 1000\n").unwrap_err();
        assert!(matches!(err, MemoryError::InvalidConfig(_)));
    }

    fn temp_config_path(name: &str) -> std::path::PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("strata_tracker_{name}_{id}.toml"))
    }

    #[test]
    fn test_from_file_round_trip() {
        let path = temp_config_path("debug");
        let written = TrackerConfig {
            stack_depth: 8,
            ..TrackerConfig::debug()
        };
        std::fs::write(&path, toml::to_string(&written).unwrap()).unwrap();

        let loaded = TrackerConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, written);
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let path = temp_config_path("missing");
        let err = TrackerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, MemoryError::ConfigIo(_)));
    }
}
