// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for kexport
//!
//! All kexport data is stored under ~/.kexport/:
//! - ~/.kexport/config.json - user defaults
//! - ~/.kexport/log/ - rolling log files

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::export::OutputVersion;

/// Get the base kexport directory (~/.kexport/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kexport"))
        .context("Could not determine home directory")
}

/// Defaults applied when the matching flag is not given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Output API version (e.g. "v1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_version: Option<String>,

    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write through a temporary file in the same directory, then rename
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("Invalid config path: {}", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        let mut file = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        file.write_all(content.as_bytes())
            .context("Failed to write config")?;
        file.persist(path)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the config file path (~/.kexport/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// The configured output version, parsed
    pub fn output_version(&self) -> Result<Option<OutputVersion>> {
        self.output_version
            .as_deref()
            .map(|v| {
                v.parse::<OutputVersion>()
                    .map_err(|e| anyhow!("{} in config file", e))
            })
            .transpose()
    }
}
