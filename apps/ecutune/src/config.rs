//! Server configuration.
//!
//! Values come from CLI flags with `ECUTUNE_*` environment fallbacks (see
//! [`crate::cli::ServeArgs`]); [`ServerConfig::default`] matches the flag
//! defaults.

use std::path::PathBuf;

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default directory for stored uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "ecu-files";
/// Default request body limit (16 MiB). Large enough for a 4MB dump.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
/// Default requests per second across all clients.
pub const DEFAULT_RATE_LIMIT: u32 = 50;
/// Default number of sessions kept in memory.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Runtime configuration of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where uploaded files are written.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit_per_sec: u32,
    /// Sessions kept before the least recently loaded one is dropped.
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_per_sec: DEFAULT_RATE_LIMIT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Same configuration with uploads stored under `dir`.
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Same configuration with a different rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, per_sec: u32) -> Self {
        self.rate_limit_per_sec = per_sec;
        self
    }

    /// Same configuration with a different session cap.
    #[must_use]
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }
}
