use std::{error::Error, ffi::OsString, path::PathBuf};

use axum::{http::StatusCode, response::IntoResponse, Json};
use api_types::ErrorResponse;
use thiserror::Error;
use tracing::{debug, error};

pub type TvocResult<T> = Result<T, TvocError>;

pub type BoxDynError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TvocError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error("environment variable '{key}' has malformed value {value:?}: {source}")]
    MalformedEnvironmentVariable {
        key: String,
        value: OsString,
        source: BoxDynError,
    },

    #[error("error setting up tracing: {source}")]
    SetupTracing { source: BoxDynError },

    #[error("error connecting to the database: {source}")]
    DatabaseConnection { source: BoxDynError },

    #[error("error executing database migrations: {source}")]
    DatabaseMigration { source: BoxDynError },

    #[error("error creating the database connection pool: {source}")]
    DatabaseConnectionPoolCreation { source: BoxDynError },

    #[error("the database transaction was retried too often: {limit}")]
    DatabaseTransactionRetryLimitReached { limit: u64 },

    #[error("permanent database transaction error: {source}")]
    PermanentDatabaseTransactionError { source: BoxDynError },

    #[error("error accessing the job queue: {source}")]
    AccessJobQueue { source: BoxDynError },

    #[error("error expiring broken streaks: {source}")]
    ExpireBrokenStreaks { source: BoxDynError },

    #[error("error running the web server: {source}")]
    ApiServerError { source: BoxDynError },

    #[error("error joining a tokio task: {source}")]
    TokioTaskJoin { source: BoxDynError },

    #[error("error creating directory {path:?}: {source}")]
    CreateDirectory { path: PathBuf, source: BoxDynError },

    #[error("error building the text-to-speech http client: {source}")]
    TtsClientCreation { source: BoxDynError },

    #[error("no text-to-speech provider is configured")]
    TtsNotConfigured,

    #[error("all {attempted} text-to-speech providers failed")]
    AllTtsProvidersFailed { attempted: usize },

    #[error("the database contains a malformed {column} value: {value:?}")]
    MalformedDatabaseValue { column: &'static str, value: String },
}

/// Errors caused by the client. These are reported back in detail, with a
/// 4xx status code. Everything else becomes an opaque internal server error.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("vocabulary entry {id} not found")]
    VocabularyNotFound { id: i64 },

    #[error("lesson {id} not found")]
    LessonNotFound { id: i64 },

    #[error("question {id} not found")]
    QuestionNotFound { id: i64 },

    #[error("no progress recorded for user '{user_id}'")]
    ProgressNotFound { user_id: String },

    #[error("a vocabulary entry for word '{word}' already exists")]
    DuplicateWord { word: String },

    #[error("the update does not contain any changes")]
    EmptyUpdate,

    #[error("'{value}' is not a valid difficulty")]
    InvalidDifficulty { value: String },

    #[error("not enough vocabulary matches the filter to build a quiz")]
    NotEnoughVocabulary,

    #[error("no arrange-sentence questions exist for difficulty '{difficulty}'")]
    NoArrangeSentenceQuestions { difficulty: String },

    #[error("total_questions must be positive")]
    NonPositiveQuestionCount,

    #[error("correct_answers must be between 0 and total_questions")]
    CorrectAnswersOutOfRange,

    #[error("total_questions is {count}, the maximum is {maximum}")]
    TooManyQuestions { count: i32, maximum: i64 },

    #[error("time_spent_seconds must not be negative")]
    NegativeTimeSpent,

    #[error("the text to synthesize must not be empty")]
    TtsTextEmpty,

    #[error("the text to synthesize is {length} characters long, the maximum is {maximum}")]
    TtsTextTooLong { length: usize, maximum: usize },
}

impl UserError {
    fn status_code(&self) -> StatusCode {
        match self {
            UserError::VocabularyNotFound { .. }
            | UserError::LessonNotFound { .. }
            | UserError::QuestionNotFound { .. }
            | UserError::ProgressNotFound { .. } => StatusCode::NOT_FOUND,
            UserError::DuplicateWord { .. } => StatusCode::CONFLICT,
            UserError::NotEnoughVocabulary | UserError::NoArrangeSentenceQuestions { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            UserError::EmptyUpdate
            | UserError::InvalidDifficulty { .. }
            | UserError::NonPositiveQuestionCount
            | UserError::CorrectAnswersOutOfRange
            | UserError::TooManyQuestions { .. }
            | UserError::NegativeTimeSpent
            | UserError::TtsTextEmpty
            | UserError::TtsTextTooLong { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for TvocError {
    fn into_response(self) -> axum::response::Response {
        match self {
            TvocError::UserError(error) => {
                debug!("user error: {error}");
                (
                    error.status_code(),
                    Json(ErrorResponse {
                        error: error.to_string(),
                    }),
                )
                    .into_response()
            }
            TvocError::TtsNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            TvocError::AllTtsProvidersFailed { .. } => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            error => {
                error!("internal error while handling a request: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_report_their_message() {
        let response = TvocError::from(UserError::VocabularyNotFound { id: 7 }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = TvocError::from(UserError::DuplicateWord {
            word: "น้ำ".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = TvocError::from(UserError::NotEnoughVocabulary).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = TvocError::from(UserError::TtsTextEmpty).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = TvocError::from(UserError::TooManyQuestions {
            count: 2_000_000_000,
            maximum: 50,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let response = TvocError::DatabaseTransactionRetryLimitReached { limit: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_tts_failures_map_to_gateway_statuses() {
        let response = TvocError::AllTtsProvidersFailed { attempted: 2 }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = TvocError::TtsNotConfigured.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
