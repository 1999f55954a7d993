//! Main settings module

use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Webhook server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model endpoint and model names
    #[serde(default)]
    pub llm: LlmConfig,

    /// Audio capture/playback configuration
    #[serde(default)]
    pub audio: AudioConfig,

    /// Roster site credentials and automation endpoints
    #[serde(default)]
    pub site: SiteConfig,

    /// Outgoing mail transport
    #[serde(default)]
    pub mail: MailConfig,

    /// Fixed "today" for deterministic date reasoning (testing only)
    #[serde(default)]
    pub today_override: Option<NaiveDate>,

    /// Log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            audio: AudioConfig::default(),
            site: SiteConfig::default(),
            mail: MailConfig::default(),
            today_override: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.silence_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.silence_timeout_secs".to_string(),
                message: "silence timeout must be at least 1 second".to_string(),
            });
        }

        if self.audio.silence_timeout_secs >= self.audio.max_phrase_secs {
            return Err(ConfigError::InvalidValue {
                field: "audio.max_phrase_secs".to_string(),
                message: "phrase duration cap must exceed the silence timeout".to_string(),
            });
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.request_timeout_secs".to_string(),
                message: "model deadline must be at least 1 second".to_string(),
            });
        }

        if self.site.username.is_empty() || self.site.password.is_empty() {
            tracing::warn!("site credentials not configured; shift lookups will fail to authenticate");
        }
        if self.site.totp_secret.is_empty() {
            tracing::warn!("site.totp_secret not configured; the login one-time-password step will fail");
        }
        if self.mail.sender.is_empty() || self.mail.collector.is_empty() {
            tracing::warn!("mail sender/collector not configured; cancellation submissions will fail");
        }

        Ok(())
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Language model configuration
///
/// Two model names: a larger one drives the conversation, a smaller one
/// does date reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_conversation_model")]
    pub conversation_model: String,

    #[serde(default = "default_reasoner_model")]
    pub reasoner_model: String,

    /// Deadline for a single model call, in seconds
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            conversation_model: default_conversation_model(),
            reasoner_model: default_reasoner_model(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

/// Audio capture and playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture device name; `None` selects the platform default
    #[serde(default)]
    pub input_device: Option<String>,

    /// Playback device name (e.g. the virtual cable feeding the call);
    /// an unknown name falls back to the platform default
    #[serde(default)]
    pub output_device: Option<String>,

    /// Transcription service endpoint (accepts WAV, returns `{"text": ...}`)
    #[serde(default = "default_transcription_url")]
    pub transcription_url: String,

    /// Synthesis service endpoint (accepts `{"text": ...}`, returns WAV)
    #[serde(default = "default_synthesis_url")]
    pub synthesis_url: String,

    /// Silence gap that ends an utterance, in seconds
    #[serde(default = "default_silence_timeout")]
    pub silence_timeout_secs: u64,

    /// Hard cap on one utterance's duration, in seconds
    #[serde(default = "default_max_phrase")]
    pub max_phrase_secs: u64,

    /// Sample rate audio is downsampled to before transcription
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            transcription_url: default_transcription_url(),
            synthesis_url: default_synthesis_url(),
            silence_timeout_secs: default_silence_timeout(),
            max_phrase_secs: default_max_phrase(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Roster site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_url")]
    pub base_url: String,

    /// Key for the cached browser session on disk
    #[serde(default = "default_service_name")]
    pub service: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Shared secret for the time-based one-time-password challenge
    #[serde(default)]
    pub totp_secret: String,

    /// Directory for cached browser session state
    #[serde(default = "default_session_dir")]
    pub session_dir: String,

    /// WebDriver endpoint driving the browser
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Deadline for one navigation action, in seconds
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_site_url(),
            service: default_service_name(),
            username: String::new(),
            password: String::new(),
            totp_secret: String::new(),
            session_dir: default_session_dir(),
            webdriver_url: default_webdriver_url(),
            navigation_timeout_secs: default_navigation_timeout(),
        }
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// 465 for SSL, 587 for STARTTLS
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub sender: String,

    #[serde(default)]
    pub app_password: String,

    /// Address cancellation notifications are delivered to
    #[serde(default)]
    pub collector: String,

    #[serde(default = "default_mail_subject")]
    pub subject: String,

    #[serde(default = "default_mail_timeout")]
    pub send_timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            sender: String::new(),
            app_password: String::new(),
            collector: String::new(),
            subject: default_mail_subject(),
            send_timeout_secs: default_mail_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_llm_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_conversation_model() -> String {
    "qwen3:8b".to_string()
}
fn default_reasoner_model() -> String {
    "gemma3:1b".to_string()
}
fn default_llm_timeout() -> u64 {
    30
}
fn default_transcription_url() -> String {
    "http://127.0.0.1:8178/inference".to_string()
}
fn default_synthesis_url() -> String {
    "http://127.0.0.1:8179/synthesize".to_string()
}
fn default_silence_timeout() -> u64 {
    5
}
fn default_max_phrase() -> u64 {
    15
}
fn default_sample_rate() -> u32 {
    16_000
}
fn default_site_url() -> String {
    "https://hahs-vic3495.ezaango.app".to_string()
}
fn default_service_name() -> String {
    "hahs_vic3495_admin".to_string()
}
fn default_session_dir() -> String {
    ".sessions".to_string()
}
fn default_webdriver_url() -> String {
    "http://127.0.0.1:9515".to_string()
}
fn default_navigation_timeout() -> u64 {
    10
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    465
}
fn default_mail_subject() -> String {
    "SHIFT CANCELLATION REQUEST".to_string()
}
fn default_mail_timeout() -> u64 {
    15
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`CALL_ASSISTANT__` prefix, `__` separator)
/// 2. `config/{env}` (if an environment name is given)
/// 3. `config/default`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CALL_ASSISTANT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}
