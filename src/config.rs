use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Overrides `source.base_url` when set (also read from `.env`).
pub const SOURCE_URL_ENV: &str = "SLOT_REPLAY_SOURCE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub playback: PlaybackConfig,
    pub cache: CacheConfig,
    pub navigation: NavigationConfig,
    pub general: General,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Dashboard API root, e.g. "http://localhost:8000"
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub slot_duration_ms: u64,
    pub tick_ms: u64,
    /// Start counting down as soon as the first slot is shown
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            slot_duration_ms: 12_000,
            tick_ms: 100,
            autoplay: true,
        }
    }
}

impl PlaybackConfig {
    pub fn slot_duration(&self) -> Duration {
        Duration::from_millis(self.slot_duration_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max snapshots kept in memory
    pub capacity: usize,
    /// How many slots ahead to prefetch
    pub prefetch_window: u64,
    /// How long to wait on someone else's in-flight fetch
    pub wait_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            prefetch_window: 5,
            wait_timeout_secs: 10,
        }
    }
}

impl CacheConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Re-query the live head every N forward moves
    pub resync_every: u64,
    /// Delay between failed startup attempts
    pub bootstrap_retry_secs: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            resync_every: 10,
            bootstrap_retry_secs: 3,
        }
    }
}

impl NavigationConfig {
    pub fn bootstrap_retry(&self) -> Duration {
        Duration::from_secs(self.bootstrap_retry_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Load `path` if it exists, defaults otherwise. Env overrides apply either way.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(SOURCE_URL_ENV) {
            if !url.is_empty() {
                config.source.base_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.playback.tick_ms == 0 {
            bail!("playback.tick_ms must be positive");
        }
        if self.playback.slot_duration_ms == 0 {
            bail!("playback.slot_duration_ms must be positive");
        }
        if self.playback.tick_ms > self.playback.slot_duration_ms {
            bail!("playback.tick_ms cannot exceed playback.slot_duration_ms");
        }
        if self.cache.capacity == 0 {
            bail!("cache.capacity must be positive");
        }
        if self.navigation.resync_every == 0 {
            bail!("navigation.resync_every must be positive");
        }
        Ok(())
    }
}
