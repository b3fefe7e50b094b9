//! Text-to-speech synthesis through an ordered chain of remote providers.
//!
//! One client owns all configured providers. The first provider to succeed
//! wins; per-provider failures are logged and the next provider is tried.
//! Synthesized audio is optionally cached on disk, keyed by a hash of the
//! input text.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    configuration::Configuration,
    error::{BoxDynError, TvocError, TvocResult},
};

mod google;
mod vaja9;

pub use google::GoogleTtsProvider;
pub use vaja9::Vaja9Provider;

/// A single remote synthesis backend.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    /// Synthesize the given text into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BoxDynError>;
}

/// Synthesized audio, either fresh from a provider or from the disk cache.
#[derive(Debug)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub mime_type: &'static str,
    pub provider: &'static str,
    pub cached: bool,
}

pub struct TtsClient {
    providers: Vec<Box<dyn TtsProvider>>,
    cache_directory: Option<PathBuf>,
}

impl TtsClient {
    /// Build the provider chain from the configuration.
    ///
    /// Providers whose API key is unset are left out. The cache directory is
    /// created if caching is configured.
    pub fn new(configuration: &Configuration) -> TvocResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(configuration.tts_request_timeout)
            .build()
            .map_err(|error| TvocError::TtsClientCreation {
                source: Box::new(error),
            })?;

        let mut providers: Vec<Box<dyn TtsProvider>> = Vec::new();
        if let Some(api_key) = &configuration.vaja9_api_key {
            providers.push(Box::new(Vaja9Provider::new(
                http_client.clone(),
                api_key.clone(),
            )));
        }
        if let Some(api_key) = &configuration.google_tts_api_key {
            providers.push(Box::new(GoogleTtsProvider::new(
                http_client.clone(),
                api_key.clone(),
            )));
        }

        if let Some(cache_directory) = &configuration.tts_cache_directory {
            std::fs::create_dir_all(cache_directory).map_err(|error| {
                TvocError::CreateDirectory {
                    path: cache_directory.clone(),
                    source: Box::new(error),
                }
            })?;
        }

        Ok(Self::from_parts(
            providers,
            configuration.tts_cache_directory.clone(),
        ))
    }

    fn from_parts(
        providers: Vec<Box<dyn TtsProvider>>,
        cache_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            providers,
            cache_directory,
        }
    }

    /// Synthesize the given text, trying each provider in order.
    ///
    /// Returns [`TvocError::TtsNotConfigured`] when no provider is configured
    /// and [`TvocError::AllTtsProvidersFailed`] when every provider failed.
    #[instrument(err, skip(self))]
    pub async fn synthesize(&self, text: &str) -> TvocResult<SynthesizedAudio> {
        if self.providers.is_empty() {
            return Err(TvocError::TtsNotConfigured);
        }

        if let Some(audio) = self.read_cache(text).await {
            return Ok(audio);
        }

        for provider in &self.providers {
            match provider.synthesize(text).await {
                Ok(audio) => {
                    self.write_cache(text, provider.as_ref(), &audio).await;
                    return Ok(SynthesizedAudio {
                        audio,
                        mime_type: provider.mime_type(),
                        provider: provider.name(),
                        cached: false,
                    });
                }
                Err(error) => {
                    warn!(
                        "text-to-speech provider {} failed: {error}",
                        provider.name()
                    );
                }
            }
        }

        Err(TvocError::AllTtsProvidersFailed {
            attempted: self.providers.len(),
        })
    }

    fn cache_path(&self, text: &str, file_extension: &str) -> Option<PathBuf> {
        self.cache_directory
            .as_ref()
            .map(|directory| directory.join(format!("{:016x}.{file_extension}", xxh3_64(text.as_bytes()))))
    }

    /// Cache read failures are logged and treated as misses.
    async fn read_cache(&self, text: &str) -> Option<SynthesizedAudio> {
        for provider in &self.providers {
            let path = self.cache_path(text, provider.file_extension())?;
            match tokio::fs::read(&path).await {
                Ok(audio) => {
                    debug!("serving cached audio from {path:?}");
                    return Some(SynthesizedAudio {
                        audio,
                        mime_type: provider.mime_type(),
                        provider: provider.name(),
                        cached: true,
                    });
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => warn!("error reading audio cache file {path:?}: {error}"),
            }
        }

        None
    }

    /// Cache write failures are logged, the response is unaffected.
    async fn write_cache(&self, text: &str, provider: &dyn TtsProvider, audio: &[u8]) {
        let Some(path) = self.cache_path(text, provider.file_extension()) else {
            return;
        };

        if let Err(error) = tokio::fs::write(&path, audio).await {
            warn!("error writing audio cache file {path:?}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct StubProvider {
        name: &'static str,
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn new(name: &'static str, succeed: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    succeed,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TtsProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn mime_type(&self) -> &'static str {
            "audio/wav"
        }

        fn file_extension(&self) -> &'static str {
            "wav"
        }

        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BoxDynError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.succeed {
                Ok(format!("{}:{text}", self.name).into_bytes())
            } else {
                Err("stub failure".into())
            }
        }
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = TtsClient::from_parts(Vec::new(), None);
        assert!(matches!(
            client.synthesize("สวัสดี").await,
            Err(TvocError::TtsNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let (first, first_calls) = StubProvider::new("first", true);
        let (second, second_calls) = StubProvider::new("second", true);
        let client = TtsClient::from_parts(vec![Box::new(first), Box::new(second)], None);

        let audio = client.synthesize("สวัสดี").await.unwrap();
        assert_eq!(audio.provider, "first");
        assert_eq!(audio.audio, "first:สวัสดี".as_bytes());
        assert!(!audio.cached);
        assert_eq!(first_calls.load(Ordering::Relaxed), 1);
        assert_eq!(second_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_next_provider() {
        let (first, first_calls) = StubProvider::new("first", false);
        let (second, second_calls) = StubProvider::new("second", true);
        let client = TtsClient::from_parts(vec![Box::new(first), Box::new(second)], None);

        let audio = client.synthesize("สวัสดี").await.unwrap();
        assert_eq!(audio.provider, "second");
        assert_eq!(first_calls.load(Ordering::Relaxed), 1);
        assert_eq!(second_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing() {
        let (first, _) = StubProvider::new("first", false);
        let (second, _) = StubProvider::new("second", false);
        let client = TtsClient::from_parts(vec![Box::new(first), Box::new(second)], None);

        assert!(matches!(
            client.synthesize("สวัสดี").await,
            Err(TvocError::AllTtsProvidersFailed { attempted: 2 })
        ));
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let cache_directory = tempfile::tempdir().unwrap();
        let (provider, calls) = StubProvider::new("stub", true);
        let client = TtsClient::from_parts(
            vec![Box::new(provider)],
            Some(cache_directory.path().to_path_buf()),
        );

        let fresh = client.synthesize("สวัสดี").await.unwrap();
        assert!(!fresh.cached);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        let cached = client.synthesize("สวัสดี").await.unwrap();
        assert!(cached.cached);
        assert_eq!(cached.audio, fresh.audio);
        assert_eq!(cached.provider, "stub");
        // The provider is not asked again.
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        // A different text misses the cache.
        let other = client.synthesize("ขอบคุณ").await.unwrap();
        assert!(!other.cached);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
