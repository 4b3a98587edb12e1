//! Runtime configuration for the frame pipeline.
//!
//! Configuration is read from a TOML file; every field is optional and falls
//! back to [`Config::default`].
//!
//! ```toml
//! frames_in_flight = 3
//! fence_timeout_ms = 5000
//! frame_count = 600
//! gpu_latency_ms = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::logging::DEFAULT_LOG_FILTER;

/// Upper bound on the ring size accepted by [`Config::validate`].
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// Pipeline and demo configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of frame resource slots in the ring.
    pub frames_in_flight: usize,
    /// Maximum time to block on a fence before treating the GPU as lost.
    /// `None` waits forever.
    pub fence_timeout_ms: Option<u64>,
    /// Number of frames the demo renders before shutting down.
    pub frame_count: u64,
    /// Artificial execution time per submission on the simulated queue.
    pub gpu_latency_ms: u64,
    /// Render target width in pixels.
    pub render_width: u32,
    /// Render target height in pixels.
    pub render_height: u32,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            fence_timeout_ms: None,
            frame_count: 600,
            gpu_latency_ms: 4,
            render_width: 1280,
            render_height: 720,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path.to_path_buf())
    }

    /// Parses and validates config from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text, PathBuf::from("<inline>"))
    }

    fn parse(text: &str, path: PathBuf) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|source| Error::ConfigParse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight) {
            return Err(Error::Config(format!(
                "frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT, self.frames_in_flight
            )));
        }
        if self.render_width == 0 || self.render_height == 0 {
            return Err(Error::Config(format!(
                "render target must be non-empty, got {}x{}",
                self.render_width, self.render_height
            )));
        }
        if self.fence_timeout_ms == Some(0) {
            return Err(Error::Config(
                "fence_timeout_ms must be positive; omit it to wait forever".to_string(),
            ));
        }
        Ok(())
    }

    /// Fence wait timeout as a [`Duration`].
    #[inline]
    pub fn fence_timeout(&self) -> Option<Duration> {
        self.fence_timeout_ms.map(Duration::from_millis)
    }

    /// Simulated GPU latency as a [`Duration`].
    #[inline]
    pub fn gpu_latency(&self) -> Duration {
        Duration::from_millis(self.gpu_latency_ms)
    }
}
