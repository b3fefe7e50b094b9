use std::sync::Arc;

use api_types::ServiceStatusResponse;
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument};

use crate::{
    configuration::Configuration,
    database::TvocAsyncDatabaseConnectionPool,
    error::{TvocError, TvocResult},
    tts::TtsClient,
};

mod arrange_sentence;
mod games;
mod lessons;
mod progress;
mod questions;
mod tts;
mod vocabulary;

/// The number of rows a listing endpoint returns when the client does not
/// ask for a specific amount.
const DEFAULT_PAGE_LIMIT: i64 = 100;
/// The maximum number of rows a single listing request may ask for.
const MAXIMUM_PAGE_LIMIT: i64 = 500;

type WebDatabaseConnectionPool = Extension<TvocAsyncDatabaseConnectionPool>;
type WebConfiguration = Extension<Configuration>;
type WebTtsClient = Extension<Arc<TtsClient>>;

#[instrument(err, skip(database_connection_pool, tts_client, configuration))]
pub async fn run_web_api(
    database_connection_pool: TvocAsyncDatabaseConnectionPool,
    tts_client: Arc<TtsClient>,
    configuration: &Configuration,
) -> TvocResult<()> {
    info!("Starting web API");

    let router = Router::new()
        .route("/", get(service_status))
        .route(
            "/vocabulary",
            get(vocabulary::list_vocabulary).post(vocabulary::create_vocabulary),
        )
        .route("/vocabulary/random", get(vocabulary::random_vocabulary))
        .route(
            "/vocabulary/:id",
            get(vocabulary::get_vocabulary)
                .put(vocabulary::update_vocabulary)
                .delete(vocabulary::delete_vocabulary),
        )
        .route(
            "/lessons",
            get(lessons::list_lessons).post(lessons::create_lesson),
        )
        .route(
            "/lessons/:id",
            get(lessons::get_lesson)
                .put(lessons::update_lesson)
                .delete(lessons::delete_lesson),
        )
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/:id",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route(
            "/progress/:user_id",
            get(progress::get_progress)
                .put(progress::update_progress)
                .delete(progress::delete_progress),
        )
        .route("/game/vocab-quiz", get(games::generate_vocab_quiz))
        .route("/game/results", post(games::submit_game_result))
        .route("/game/results/:user_id", get(games::list_game_results))
        .route(
            "/arrange-sentence/submit",
            post(arrange_sentence::submit_arrangement),
        )
        .route(
            "/arrange-sentence/:difficulty",
            get(arrange_sentence::generate_arrange_sentence),
        )
        .route("/tts", post(tts::synthesize_speech))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(database_connection_pool))
                .layer(Extension(tts_client))
                .layer(Extension(configuration.clone())),
        );

    debug!(
        "Listening for API requests on {}",
        configuration.api_listen_address
    );
    axum::Server::bind(&configuration.api_listen_address)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| TvocError::ApiServerError {
            source: Box::new(error),
        })?;

    info!("Web API terminated normally");
    Ok(())
}

async fn service_status() -> Json<ServiceStatusResponse> {
    Json(ServiceStatusResponse {
        service: "tvoc-backend".to_string(),
        status: "ok".to_string(),
    })
}

/// Clamp a client-requested page limit to the allowed range.
fn clamp_page_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAXIMUM_PAGE_LIMIT)
}

async fn shutdown_signal() {
    let sigint = async {
        if let Err(error) =
            tokio::signal::ctrl_c()
                .await
                .map_err(|error| TvocError::ApiServerError {
                    source: Box::new(error),
                })
        {
            error!("Error receiving SIGINT: {error}");
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                if handler.recv().await.is_none() {
                    error!("Received None from SIGTERM handler. This is unexpected.");
                }
            }
            Err(error) => error!("Error installing SIGTERM handler: {error}"),
        }
    };

    // This future never completes, hence we offer no other means of shutdown on non-unix platforms.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    // Shutdown if either signal is received
    tokio::select! {
        _ = sigint => info!("Received SIGINT, shutting down"),
        _ = sigterm => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_limit() {
        assert_eq!(clamp_page_limit(None), DEFAULT_PAGE_LIMIT);
        assert_eq!(clamp_page_limit(Some(25)), 25);
        assert_eq!(clamp_page_limit(Some(0)), 1);
        assert_eq!(clamp_page_limit(Some(10_000)), MAXIMUM_PAGE_LIMIT);
    }
}
