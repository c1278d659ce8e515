//! Crate-wide error taxonomy.
//!
//! `Config` and `Bind` are fatal at startup and propagate out of `main`
//! as a non-zero exit code (§6, §7: "port in use" is a configuration
//! error). `Gateway` covers per-connection I/O failures the gateway logs
//! and drops; it is never propagated to the driver (see `gateway`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum TwinError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind Modbus TCP listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("gateway I/O error: {0}")]
    Gateway(#[source] std::io::Error),
}
