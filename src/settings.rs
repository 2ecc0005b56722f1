use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "GENEA";

/// Runtime knobs that are not worth a command-line flag.
/// Each one can be overridden with `GENEA_<NAME>`, e.g. `GENEA_REQUEST_DELAY_MS=500`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cache_path: PathBuf,
    pub user_agent: String,
    /// Pause before every network request.
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("cache_path", "data/pages.sqlite")?
            .set_default(
                "user_agent",
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("request_delay_ms", 1000_i64)?
            .set_default("max_retries", 3_i64)?
            .set_default("timeout_secs", 30_i64)?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let s = Settings::load().unwrap();
        assert!(s.max_retries <= 10);
        assert!(!s.user_agent.is_empty());
        assert_eq!(s.timeout(), Duration::from_secs(s.timeout_secs));
    }
}
