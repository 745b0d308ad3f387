//! Process-wide client configuration.
//!
//! # Design
//! `SharedConfig` is a cloneable handle to one set of flags. Every client
//! keeps a clone, so `configure` on any handle is observed by all existing
//! and future clients built from it. Clients built without an explicit
//! handle use [`SharedConfig::global`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Snapshot of the configuration flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Log the endpoint, method and URL of a failed call, plus a backtrace
    /// of the logging site (not of where the error arose). Never changes
    /// control flow.
    pub debug: bool,
    /// Skip schema validation and hand back raw JSON.
    pub no_validate: bool,
}

impl ClientConfig {
    /// Read `TRS_CLIENT_DEBUG` and `TRS_CLIENT_NO_VALIDATE`.
    pub fn from_env() -> Self {
        Self {
            debug: env_flag("TRS_CLIENT_DEBUG"),
            no_validate: env_flag("TRS_CLIENT_NO_VALIDATE"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug, Default)]
struct Flags {
    debug: AtomicBool,
    no_validate: AtomicBool,
}

static GLOBAL: Lazy<SharedConfig> = Lazy::new(SharedConfig::default);

/// Handle to configuration shared between clients.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    flags: Arc<Flags>,
}

impl SharedConfig {
    pub fn new(config: ClientConfig) -> Self {
        let shared = Self::default();
        shared.configure(config);
        shared
    }

    /// The process-wide handle used by clients built without one.
    pub fn global() -> SharedConfig {
        GLOBAL.clone()
    }

    /// Replace all flags in place.
    pub fn configure(&self, config: ClientConfig) {
        self.set_debug(config.debug);
        self.set_no_validate(config.no_validate);
    }

    pub fn set_debug(&self, debug: bool) {
        self.flags.debug.store(debug, Ordering::Relaxed);
    }

    pub fn set_no_validate(&self, no_validate: bool) {
        self.flags.no_validate.store(no_validate, Ordering::Relaxed);
    }

    pub fn debug(&self) -> bool {
        self.flags.debug.load(Ordering::Relaxed)
    }

    pub fn no_validate(&self) -> bool {
        self.flags.no_validate.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ClientConfig {
        ClientConfig {
            debug: self.debug(),
            no_validate: self.no_validate(),
        }
    }
}
