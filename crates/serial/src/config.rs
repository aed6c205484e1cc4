use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
        }
    }
}

impl SerialConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty or unparsable
    /// values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = SerialConfig::default();

        if let Some(v) = lookup("SERIAL_PORT") {
            if !v.is_empty() {
                cfg.port = v;
            }
        }
        if let Some(v) = lookup("SERIAL_BAUD_RATE") {
            if let Ok(b) = v.parse::<u32>() {
                cfg.baud_rate = b;
            }
        }
        if let Some(v) = lookup("SERIAL_TIMEOUT_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                cfg.timeout = Duration::from_millis(ms);
            }
        }

        cfg
    }
}
