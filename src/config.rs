//! Startup configuration, read once from the environment.
//!
//! Mirrors `progbase::init()` in the services this crate is modeled on:
//! read everything up front, fail fast and loud on anything malformed.

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub bind: std::net::IpAddr,
    pub port: u16,
    pub dt_ms: u64,
    pub warmup_steps: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
            port: 5020,
            dt_ms: 1000,
            warmup_steps: 900,
        }
    }
}

impl Config {
    /// Reads `TWIN_PORT`, `TWIN_BIND`, `TWIN_DT_MS`, `TWIN_WARMUP_STEPS`,
    /// falling back to the defaults named in the spec when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let bind = match std::env::var("TWIN_BIND") {
            Err(_) => default.bind,
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "TWIN_BIND",
                value: value.clone(),
                expected: "IP address",
            })?,
        };

        let port = match std::env::var("TWIN_PORT") {
            Err(_) => default.port,
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "TWIN_PORT",
                value: value.clone(),
                expected: "u16 port number",
            })?,
        };

        let dt_ms = match std::env::var("TWIN_DT_MS") {
            Err(_) => default.dt_ms,
            Ok(value) => {
                let parsed: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                    var: "TWIN_DT_MS",
                    value: value.clone(),
                    expected: "positive integer milliseconds",
                })?;
                if parsed == 0 {
                    return Err(ConfigError::Invalid {
                        var: "TWIN_DT_MS",
                        value,
                        expected: "positive integer milliseconds",
                    });
                }
                parsed
            }
        };

        let warmup_steps = match std::env::var("TWIN_WARMUP_STEPS") {
            Err(_) => default.warmup_steps,
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "TWIN_WARMUP_STEPS",
                value: value.clone(),
                expected: "non-negative integer",
            })?,
        };

        Ok(Self {
            bind,
            port,
            dt_ms,
            warmup_steps,
        })
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_ms as f64 / 1000.0
    }
}
