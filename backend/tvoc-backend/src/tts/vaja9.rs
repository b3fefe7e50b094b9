use async_trait::async_trait;
use secure_string::SecureString;
use serde::{Deserialize, Serialize};

use crate::error::BoxDynError;

use super::TtsProvider;

const SYNTHESIS_URL: &str = "https://api.aiforthai.in.th/vaja9/synth_audiovisual";

/// The AIForThai VAJA9 synthesizer.
///
/// Synthesis is a two-step protocol: a synthesis request returns the URL of
/// the generated wav file, which is then downloaded with the same API key.
pub struct Vaja9Provider {
    http_client: reqwest::Client,
    api_key: SecureString,
}

#[derive(Serialize)]
struct Vaja9Request<'a> {
    input_text: &'a str,
    speaker: u8,
    phrase_break: u8,
    audiovisual: u8,
}

#[derive(Deserialize)]
struct Vaja9Response {
    wav_url: String,
}

impl Vaja9Provider {
    pub fn new(http_client: reqwest::Client, api_key: SecureString) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl TtsProvider for Vaja9Provider {
    fn name(&self) -> &'static str {
        "vaja9"
    }

    fn mime_type(&self) -> &'static str {
        "audio/wav"
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BoxDynError> {
        let response: Vaja9Response = self
            .http_client
            .post(SYNTHESIS_URL)
            .header("Apikey", self.api_key.unsecure())
            .json(&Vaja9Request {
                input_text: text,
                speaker: 1,
                phrase_break: 0,
                audiovisual: 0,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let audio = self
            .http_client
            .get(&response.wav_url)
            .header("Apikey", self.api_key.unsecure())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(audio.to_vec())
    }
}
