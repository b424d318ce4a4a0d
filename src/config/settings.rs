//! Application settings loaded from config.toml
//!
//! The `[checkout]` table tunes the checkout unit of work (license term, deadline and
//! key collision retries). `[[products]]` entries seed the catalog on first run, the same
//! way the store would be pre-populated by the excluded admin panel.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

/// License lifetime written on every order line unless configured otherwise.
pub const DEFAULT_LICENSE_TERM_DAYS: u32 = 365;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_KEY_ATTEMPTS: u32 = 5;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Checkout tuning
    #[serde(default)]
    pub checkout: CheckoutSettings,
    /// Products to seed into an empty catalog
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// Parameters of one checkout. Passed explicitly into the checkout call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    /// Days between activation and expiry of each issued key
    pub license_term_days: u32,
    /// Deadline for the whole checkout transaction
    pub timeout_secs: u64,
    /// How many keys to draw for one unit before giving up on collisions
    pub key_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            license_term_days: DEFAULT_LICENSE_TERM_DAYS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            key_attempts: DEFAULT_KEY_ATTEMPTS,
        }
    }
}

impl CheckoutSettings {
    /// Deadline for the checkout transaction.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of key draws per unit, never less than one.
    #[must_use]
    pub const fn key_attempts(&self) -> u32 {
        if self.key_attempts == 0 {
            1
        } else {
            self.key_attempts
        }
    }
}

/// A catalog entry to create at startup
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProductSeed {
    /// Product name, used to detect already-seeded entries
    pub name: String,
    /// Unit price in cents
    pub price_cents: i64,
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {}", path_ref.display());

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads ./config.toml, or the defaults when that file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        info!("No config.toml found, using default settings");
        Ok(AppConfig::default())
    }
}
