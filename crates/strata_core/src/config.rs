//! # Memory Configuration
//!
//! Arena and table sizing, loaded once at startup from TOML.
//!
//! ```toml
//! [arena]
//! block_slots = 256
//!
//! [table]
//! initial_buckets = 64
//! block_slots = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};

/// Default number of slots per arena block.
pub const DEFAULT_BLOCK_SLOTS: usize = 256;

/// Upper bound on slots per block; slot indices are 32-bit.
pub const MAX_BLOCK_SLOTS: usize = 1 << 24;

/// Slot arena sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Slots allocated per block when the free-list runs dry.
    pub block_slots: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_slots: DEFAULT_BLOCK_SLOTS,
        }
    }
}

impl ArenaConfig {
    /// Checks the block size is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] if `block_slots` is zero or too large.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.block_slots == 0 {
            return Err(MemoryError::InvalidConfig(
                "arena.block_slots must be at least 1".into(),
            ));
        }
        if self.block_slots > MAX_BLOCK_SLOTS {
            return Err(MemoryError::InvalidConfig(format!(
                "arena.block_slots {} exceeds {MAX_BLOCK_SLOTS}",
                self.block_slots
            )));
        }
        Ok(())
    }
}

/// Bucket table sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Bucket array length reserved up front (0 = allocate on first insert).
    pub initial_buckets: usize,
    /// Slots per block of the entry arena.
    pub block_slots: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_buckets: 0,
            block_slots: DEFAULT_BLOCK_SLOTS,
        }
    }
}

impl TableConfig {
    /// Checks the entry arena sizing.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] on an unusable block size.
    pub fn validate(&self) -> MemoryResult<()> {
        self.arena().validate().map_err(|_| {
            MemoryError::InvalidConfig(format!(
                "table.block_slots must be in 1..={MAX_BLOCK_SLOTS}, got {}",
                self.block_slots
            ))
        })
    }

    /// Arena configuration for the entry pool.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> ArenaConfig {
        ArenaConfig {
            block_slots: self.block_slots,
        }
    }
}

/// Top-level memory configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Standalone arena sizing.
    pub arena: ArenaConfig,
    /// Bucket table sizing.
    pub table: TableConfig,
}

impl MemoryConfig {
    /// Production sizing: large blocks, tables pre-sized for a few hundred keys.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            arena: ArenaConfig { block_slots: 1024 },
            table: TableConfig {
                initial_buckets: 512,
                block_slots: 512,
            },
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
    /// Returns [`MemoryError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`MemoryConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`MemoryError::InvalidConfig`] found.
    pub fn validate(&self) -> MemoryResult<()> {
        self.arena.validate()?;
        self.table.validate()
    }
}
