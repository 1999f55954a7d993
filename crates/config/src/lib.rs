//! Process-wide configuration
//!
//! Settings are read once at startup from `config/default`, an optional
//! environment-specific file, and `CALL_ASSISTANT__`-prefixed environment
//! variables (highest priority).

mod settings;

pub use settings::{
    load_settings, AudioConfig, LlmConfig, MailConfig, ServerConfig, Settings, SiteConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
