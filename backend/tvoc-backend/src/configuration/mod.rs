use std::{env::VarError, error::Error, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::error::{TvocError, TvocResult, UserError};
use chrono::Duration;
use secure_string::SecureString;

/// The configuration of the application.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// The url to access postgres.
    pub postgres_url: SecureString,

    /// The url to send opentelemetry to.
    pub opentelemetry_url: Option<String>,

    /// The address to listen for API requests.
    pub api_listen_address: SocketAddr,

    /// The maximum number of retries for a failed transaction.
    pub maximum_transaction_retry_count: u64,

    /// The interval at which the job queue will be polled.
    pub job_queue_poll_interval: std::time::Duration,

    /// The interval at which broken streaks are reset.
    pub streak_maintenance_interval: Duration,

    /// The number of quiz questions returned when the client does not ask
    /// for a specific amount.
    pub quiz_default_question_count: i64,

    /// The maximum number of questions a single quiz or arrange-sentence
    /// request may ask for.
    pub quiz_maximum_question_count: i64,

    /// The maximum length of a text-to-speech input in characters.
    pub maximum_tts_text_length: usize,

    /// The timeout for a single text-to-speech provider request.
    pub tts_request_timeout: std::time::Duration,

    /// The API key for the AIForThai VAJA9 synthesizer.
    /// The provider is disabled if this is unset.
    pub vaja9_api_key: Option<SecureString>,

    /// The API key for Google Cloud text-to-speech.
    /// The provider is disabled if this is unset.
    pub google_tts_api_key: Option<SecureString>,

    /// The directory where synthesized audio is cached.
    /// Caching is disabled if this is unset.
    pub tts_cache_directory: Option<PathBuf>,
}

impl Configuration {
    /// Read the configuration values from environment variables.
    pub fn from_environment() -> TvocResult<Self> {
        Ok(Self {
            postgres_url: read_env_var_with_default(
                "POSTGRES_TVOC_URL",
                "postgres://tvoc@localhost/tvoc",
            )?
            .into(),
            opentelemetry_url: read_optional_env_var("OPENTELEMETRY_URL")?,
            api_listen_address: read_env_var_with_default_as_type(
                "API_LISTEN_ADDRESS",
                SocketAddr::from(([0, 0, 0, 0], 8061)),
            )?,
            maximum_transaction_retry_count: read_env_var_with_default_as_type(
                "MAXIMUM_TRANSACTION_RETRY_COUNT",
                10u64,
            )?,
            job_queue_poll_interval: std::time::Duration::from_secs(
                read_env_var_with_default_as_type("JOB_QUEUE_POLL_INTERVAL_SECONDS", 60u64)?,
            ),
            streak_maintenance_interval: Duration::hours(read_env_var_with_default_as_type::<i64>(
                "STREAK_MAINTENANCE_INTERVAL_HOURS",
                6,
            )?),
            quiz_default_question_count: read_env_var_with_default_as_type(
                "QUIZ_DEFAULT_QUESTION_COUNT",
                10i64,
            )?,
            quiz_maximum_question_count: read_env_var_with_default_as_type(
                "QUIZ_MAXIMUM_QUESTION_COUNT",
                50i64,
            )?,
            maximum_tts_text_length: read_env_var_with_default_as_type(
                "MAXIMUM_TTS_TEXT_LENGTH",
                500usize,
            )?,
            tts_request_timeout: std::time::Duration::from_secs(
                read_env_var_with_default_as_type("TTS_REQUEST_TIMEOUT_SECONDS", 10u64)?,
            ),
            vaja9_api_key: read_optional_env_var("VAJA9_API_KEY")?.map(SecureString::from),
            google_tts_api_key: read_optional_env_var("GOOGLE_TTS_API_KEY")?
                .map(SecureString::from),
            tts_cache_directory: read_optional_env_var("TTS_CACHE_DIRECTORY")?.map(PathBuf::from),
        })
    }

    /// Clamp a client-requested question count to the configured bounds.
    pub fn clamp_question_count(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.quiz_default_question_count)
            .clamp(1, self.quiz_maximum_question_count)
    }

    /// Check that a text-to-speech input is neither empty nor too long.
    pub fn verify_tts_text(&self, text: &str) -> TvocResult<()> {
        if text.trim().is_empty() {
            return Err(UserError::TtsTextEmpty.into());
        }

        let length = text.chars().count();
        if length > self.maximum_tts_text_length {
            return Err(UserError::TtsTextTooLong {
                length,
                maximum: self.maximum_tts_text_length,
            }
            .into());
        }

        Ok(())
    }
}

fn read_optional_env_var(key: &str) -> TvocResult<Option<String>> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(value)) => Err(TvocError::MalformedEnvironmentVariable {
            key: key.to_string(),
            value: value.clone(),
            source: Box::new(VarError::NotUnicode(value)),
        }),
    }
}

fn read_env_var_with_default(key: &str, default: impl Into<String>) -> TvocResult<String> {
    match std::env::var(key) {
        Ok(value) => Ok(value),
        Err(VarError::NotPresent) => Ok(default.into()),
        Err(VarError::NotUnicode(value)) => Err(TvocError::MalformedEnvironmentVariable {
            key: key.to_string(),
            value: value.clone(),
            source: Box::new(VarError::NotUnicode(value)),
        }),
    }
}

fn read_env_var_with_default_as_type<T: FromStr>(key: &str, default: impl Into<T>) -> TvocResult<T>
where
    <T as FromStr>::Err: 'static + Error + Send + Sync,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|error| TvocError::MalformedEnvironmentVariable {
                key: key.to_string(),
                value: value.into(),
                source: Box::new(error),
            }),
        Err(VarError::NotPresent) => Ok(default.into()),
        Err(VarError::NotUnicode(value)) => Err(TvocError::MalformedEnvironmentVariable {
            key: key.to_string(),
            value: value.clone(),
            source: Box::new(VarError::NotUnicode(value)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_configuration() -> Configuration {
        Configuration {
            postgres_url: "postgres://tvoc@localhost/tvoc".into(),
            opentelemetry_url: None,
            api_listen_address: SocketAddr::from(([127, 0, 0, 1], 8061)),
            maximum_transaction_retry_count: 10,
            job_queue_poll_interval: std::time::Duration::from_secs(60),
            streak_maintenance_interval: Duration::hours(6),
            quiz_default_question_count: 10,
            quiz_maximum_question_count: 50,
            maximum_tts_text_length: 20,
            tts_request_timeout: std::time::Duration::from_secs(10),
            vaja9_api_key: None,
            google_tts_api_key: None,
            tts_cache_directory: None,
        }
    }

    #[test]
    fn test_clamp_question_count() {
        let configuration = test_configuration();
        assert_eq!(configuration.clamp_question_count(None), 10);
        assert_eq!(configuration.clamp_question_count(Some(5)), 5);
        assert_eq!(configuration.clamp_question_count(Some(0)), 1);
        assert_eq!(configuration.clamp_question_count(Some(-3)), 1);
        assert_eq!(configuration.clamp_question_count(Some(1000)), 50);
    }

    #[test]
    fn test_verify_tts_text() {
        let configuration = test_configuration();
        assert!(configuration.verify_tts_text("สวัสดีครับ").is_ok());
        assert!(configuration.verify_tts_text("").is_err());
        assert!(configuration.verify_tts_text("   ").is_err());
        assert!(configuration
            .verify_tts_text("a very long sentence that exceeds the limit")
            .is_err());
    }
}
