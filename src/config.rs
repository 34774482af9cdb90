use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::chunk::DEFAULT_EDITIONS_PER_CHUNK;

/// Run settings. Read from `TOON_*` environment variables; CLI flags win.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub editions_per_chunk: usize,
    pub size_ceiling_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_dir: PathBuf::from("toon"),
            dest_dir: PathBuf::from("sql"),
            editions_per_chunk: DEFAULT_EDITIONS_PER_CHUNK,
            size_ceiling_mb: 100,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::Environment::with_prefix("TOON").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Invalid TOON_* settings")
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.size_ceiling_mb * 1024 * 1024
    }

    pub fn db_dir(&self) -> PathBuf {
        self.dest_dir.join("db")
    }

    pub fn editions_dir(&self) -> PathBuf {
        self.db_dir().join("editions")
    }

    pub fn tafsir_db_dir(&self) -> PathBuf {
        self.dest_dir.join("tafsirs").join("db")
    }

    pub fn tafsir_source_dir(&self) -> PathBuf {
        self.source_dir.join("tafsirs")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.db_dir(), self.editions_dir(), self.tafsir_db_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
