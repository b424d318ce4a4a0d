/// Database configuration and connection management
pub mod database;

/// Checkout settings and catalog seed loading from config.toml
pub mod settings;
