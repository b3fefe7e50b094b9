use async_trait::async_trait;
use base64::Engine;
use secure_string::SecureString;
use serde::{Deserialize, Serialize};

use crate::error::BoxDynError;

use super::TtsProvider;

const LANGUAGE_CODE: &str = "th-TH";
const VOICE_NAME: &str = "th-TH-Standard-A";

/// Google Cloud text-to-speech.
pub struct GoogleTtsProvider {
    http_client: reqwest::Client,
    api_key: SecureString,
}

#[derive(Serialize)]
struct GoogleTtsRequest<'a> {
    input: GoogleTtsInput<'a>,
    voice: GoogleTtsVoice,
    #[serde(rename = "audioConfig")]
    audio_config: GoogleTtsAudioConfig,
}

#[derive(Serialize)]
struct GoogleTtsInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GoogleTtsVoice {
    #[serde(rename = "languageCode")]
    language_code: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
struct GoogleTtsAudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
struct GoogleTtsResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

impl GoogleTtsProvider {
    pub fn new(http_client: reqwest::Client, api_key: SecureString) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl TtsProvider for GoogleTtsProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn mime_type(&self) -> &'static str {
        "audio/mpeg"
    }

    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BoxDynError> {
        let url = format!(
            "https://texttospeech.googleapis.com/v1/text:synthesize?key={}",
            self.api_key.unsecure()
        );

        let response: GoogleTtsResponse = self
            .http_client
            .post(&url)
            .json(&GoogleTtsRequest {
                input: GoogleTtsInput { text },
                voice: GoogleTtsVoice {
                    language_code: LANGUAGE_CODE,
                    name: VOICE_NAME,
                },
                audio_config: GoogleTtsAudioConfig {
                    audio_encoding: "MP3",
                },
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Google returns the audio base64-encoded.
        let audio = base64::engine::general_purpose::STANDARD.decode(response.audio_content)?;

        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_the_google_field_names() {
        let request = GoogleTtsRequest {
            input: GoogleTtsInput { text: "สวัสดี" },
            voice: GoogleTtsVoice {
                language_code: LANGUAGE_CODE,
                name: VOICE_NAME,
            },
            audio_config: GoogleTtsAudioConfig {
                audio_encoding: "MP3",
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["voice"]["languageCode"], "th-TH");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(json["input"]["text"], "สวัสดี");
    }

    #[test]
    fn test_response_decodes_audio_content() {
        let response: GoogleTtsResponse =
            serde_json::from_str(r#"{"audioContent":"aGVsbG8="}"#).unwrap();
        let audio = base64::engine::general_purpose::STANDARD
            .decode(response.audio_content)
            .unwrap();
        assert_eq!(audio, b"hello");
    }
}
