use crate::defaults;
use crate::error::{NarratorError, Result};
use crate::narration::rate::{AdmissionMode, RateLimits};
use crate::narration::retry::{ExponentialBackoff, Immediate, RetryPolicy, RetryStrategy};
use crate::narration::types::{AudioEncoding, OutputFormat, VoiceSelection};
use crate::tts::{GoogleAuth, HttpTimeouts};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub metadata: MetadataConfig,
}

/// Speech provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub voice: String,
    /// Derived from the voice name when unset.
    pub language_code: Option<String>,
    pub encoding: AudioEncoding,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub max_chunk_bytes: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// Provider quota configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests_per_minute: u32,
    pub max_characters_per_minute: u64,
    pub poll_interval_secs: u64,
    pub mode: AdmissionMode,
}

/// Transient error retry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub strategy: RetryStrategy,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

/// Assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub ffmpeg: String,
    /// System temp directory when unset.
    pub scratch_dir: Option<PathBuf>,
    pub keep_scratch_on_failure: bool,
}

/// Tag defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataConfig {
    pub genre: String,
    pub default_author: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            voice: defaults::DEFAULT_VOICE.to_string(),
            language_code: None,
            encoding: AudioEncoding::default(),
            endpoint: defaults::GOOGLE_TTS_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            max_chunk_bytes: defaults::MAX_CHUNK_BYTES,
            connect_timeout_secs: defaults::CONNECT_TIMEOUT_SECS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: defaults::MAX_REQUESTS_PER_MINUTE,
            max_characters_per_minute: defaults::MAX_CHARACTERS_PER_MINUTE,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            mode: AdmissionMode::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::default(),
            initial_delay_ms: defaults::RETRY_INITIAL_DELAY_MS,
            max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            ffmpeg: defaults::FFMPEG.to_string(),
            scratch_dir: None,
            keep_scratch_on_failure: false,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            genre: defaults::DEFAULT_GENRE.to_string(),
            default_author: defaults::DEFAULT_AUTHOR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NarratorError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                NarratorError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML and invalid values are still errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(NarratorError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NARRATOR_VOICE → synthesis.voice
    /// - NARRATOR_API_KEY (or GOOGLE_API_KEY) → synthesis.api_key
    /// - NARRATOR_ACCESS_TOKEN → synthesis.access_token
    /// - NARRATOR_FFMPEG → output.ffmpeg
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(voice) = non_empty_env("NARRATOR_VOICE") {
            self.synthesis.voice = voice;
        }

        if let Some(key) = non_empty_env("NARRATOR_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY")) {
            self.synthesis.api_key = Some(key);
        }

        if let Some(token) = non_empty_env("NARRATOR_ACCESS_TOKEN") {
            self.synthesis.access_token = Some(token);
        }

        if let Some(ffmpeg) = non_empty_env("NARRATOR_FFMPEG") {
            self.output.ffmpeg = ffmpeg;
        }

        self
    }

    /// Reject values that would stall or break the pipeline.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(NarratorError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.rate_limit.max_requests_per_minute == 0 {
            return invalid("rate_limit.max_requests_per_minute", "must be greater than 0");
        }
        if self.rate_limit.max_characters_per_minute == 0 {
            return invalid("rate_limit.max_characters_per_minute", "must be greater than 0");
        }
        if self.rate_limit.poll_interval_secs == 0 {
            return invalid("rate_limit.poll_interval_secs", "must be greater than 0");
        }
        if self.synthesis.max_chunk_bytes == 0 {
            return invalid("synthesis.max_chunk_bytes", "must be greater than 0");
        }
        if self.synthesis.connect_timeout_secs == 0 {
            return invalid("synthesis.connect_timeout_secs", "must be greater than 0");
        }
        if self.synthesis.request_timeout_secs == 0 {
            return invalid("synthesis.request_timeout_secs", "must be greater than 0");
        }
        if self.synthesis.voice.trim().is_empty() {
            return invalid("synthesis.voice", "must not be empty");
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return invalid("retry.max_delay_ms", "must not be less than retry.initial_delay_ms");
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/narrator/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("narrator").join("config.toml"))
            .ok_or_else(|| NarratorError::Other("Could not determine config directory".to_string()))
    }

    /// Serialize the effective configuration, secrets masked.
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        for secret in [&mut shown.synthesis.api_key, &mut shown.synthesis.access_token] {
            if secret.is_some() {
                *secret = Some("***".to_string());
            }
        }
        toml::to_string_pretty(&shown).map_err(|e| NarratorError::ConfigParse {
            message: e.to_string(),
        })
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            max_requests_per_minute: self.rate_limit.max_requests_per_minute,
            max_characters_per_minute: self.rate_limit.max_characters_per_minute,
            poll_interval: Duration::from_secs(self.rate_limit.poll_interval_secs),
            mode: self.rate_limit.mode,
        }
    }

    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        match self.retry.strategy {
            RetryStrategy::Immediate => Box::new(Immediate),
            RetryStrategy::Exponential => Box::new(ExponentialBackoff {
                initial: Duration::from_millis(self.retry.initial_delay_ms),
                max: Duration::from_millis(self.retry.max_delay_ms),
                jitter: self.retry.jitter,
            }),
        }
    }

    pub fn voice(&self) -> VoiceSelection {
        match &self.synthesis.language_code {
            Some(code) => VoiceSelection::new(code, &self.synthesis.voice),
            None => VoiceSelection::from_name(&self.synthesis.voice),
        }
    }

    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.synthesis.connect_timeout_secs),
            request: Duration::from_secs(self.synthesis.request_timeout_secs),
        }
    }

    /// Credentials for the provider; an API key wins over an access token.
    pub fn google_auth(&self) -> Option<GoogleAuth> {
        let present = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        present(&self.synthesis.api_key)
            .map(GoogleAuth::ApiKey)
            .or_else(|| present(&self.synthesis.access_token).map(GoogleAuth::AccessToken))
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.output
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
