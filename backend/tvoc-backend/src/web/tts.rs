use api_types::{TtsRequest, TtsResponse};
use axum::{Extension, Json};
use base64::Engine;
use tracing::instrument;

use crate::error::TvocResult;

use super::{WebConfiguration, WebTtsClient};

#[instrument(err, skip(tts_client, configuration))]
pub async fn synthesize_speech(
    Extension(configuration): WebConfiguration,
    Extension(tts_client): WebTtsClient,
    Json(request): Json<TtsRequest>,
) -> TvocResult<Json<TtsResponse>> {
    configuration.verify_tts_text(&request.text)?;

    let audio = tts_client.synthesize(request.text.trim()).await?;

    Ok(Json(TtsResponse {
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&audio.audio),
        mime_type: audio.mime_type.to_string(),
        provider: audio.provider.to_string(),
        cached: audio.cached,
    }))
}
