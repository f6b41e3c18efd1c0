use std::time::Duration;

pub const TICK_INTERVAL_ENV: &str = "STOPWATCH_TICK_MS";
const DEFAULT_TICK_MS: u64 = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickerConfig {
    /// Wait between two published samples.
    pub tick_interval: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl TickerConfig {
    /// Reads `STOPWATCH_TICK_MS`; falls back to the default when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(TICK_INTERVAL_ENV).ok();
        Self::from_tick_ms(raw.as_deref())
    }

    fn from_tick_ms(raw: Option<&str>) -> Result<Self, ConfigError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let ms: u64 = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidTickInterval {
                var: TICK_INTERVAL_ENV,
                value: raw.to_string(),
            })?;
        if ms == 0 {
            return Err(ConfigError::ZeroTickInterval(TICK_INTERVAL_ENV));
        }
        Ok(Self {
            tick_interval: Duration::from_millis(ms),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidTickInterval { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroTickInterval(&'static str),
}
