use api_types::{CreateQuestion, QuestionFilter, QuestionResponse, UpdateQuestion};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use crate::{
    database::model::{NewQuestion, Question, QuestionChangeset},
    error::{TvocError, TvocResult, UserError},
};

use super::{clamp_page_limit, WebConfiguration, WebDatabaseConnectionPool};

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn list_questions(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Query(filter): Query<QuestionFilter>,
) -> TvocResult<Json<Vec<QuestionResponse>>> {
    let limit = clamp_page_limit(filter.limit);
    let offset = filter.offset.unwrap_or(0).max(0);
    let filter = &filter;

    let entries = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let mut query = questions.into_boxed();
                    if let Some(filter_lesson_id) = filter.lesson_id {
                        query = query.filter(lesson_id.eq(filter_lesson_id));
                    }
                    if let Some(filter_kind) = &filter.kind {
                        query = query.filter(kind.eq(filter_kind.as_ref()));
                    }
                    if let Some(filter_difficulty) = &filter.difficulty {
                        query = query.filter(difficulty.eq(filter_difficulty.as_ref()));
                    }

                    Ok(query
                        .select(Question::as_select())
                        .order(id.asc())
                        .limit(limit)
                        .offset(offset)
                        .load(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(Json(
        entries
            .into_iter()
            .map(QuestionResponse::try_from)
            .collect::<TvocResult<_>>()?,
    ))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn create_question(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Json(create): Json<CreateQuestion>,
) -> TvocResult<(StatusCode, Json<QuestionResponse>)> {
    let new_question = NewQuestion {
        lesson_id: create.lesson_id,
        vocabulary_id: create.vocabulary_id,
        kind: create.kind.as_ref(),
        difficulty: create.difficulty.as_ref(),
        prompt: &create.prompt,
        correct_answer: &create.correct_answer,
        choices: create.choices.clone().unwrap_or_default(),
    };
    let new_question = &new_question;

    let question = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::SelectableHelper;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::insert_into(questions)
                        .values(new_question)
                        .returning(Question::as_returning())
                        .get_result(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(question.try_into()?)))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn get_question(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(question_id): Path<i64>,
) -> TvocResult<Json<QuestionResponse>> {
    let question = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(questions
                        .find(question_id)
                        .select(Question::as_select())
                        .first(database_connection)
                        .await
                        .optional()?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::QuestionNotFound { id: question_id })?;

    Ok(Json(question.try_into()?))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn update_question(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(question_id): Path<i64>,
    Json(update): Json<UpdateQuestion>,
) -> TvocResult<Json<QuestionResponse>> {
    if update.is_noop() {
        return Err(UserError::EmptyUpdate.into());
    }

    let changeset = QuestionChangeset {
        lesson_id: update.lesson_id,
        vocabulary_id: update.vocabulary_id,
        kind: update.kind.as_ref().map(AsRef::as_ref),
        difficulty: update.difficulty.as_ref().map(AsRef::as_ref),
        prompt: update.prompt.as_deref(),
        correct_answer: update.correct_answer.as_deref(),
        choices: update.choices.clone(),
    };
    let changeset = &changeset;

    let question = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::update(questions.find(question_id))
                        .set(changeset)
                        .returning(Question::as_returning())
                        .get_result(database_connection)
                        .await
                        .optional()?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::QuestionNotFound { id: question_id })?;

    Ok(Json(question.try_into()?))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn delete_question(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(question_id): Path<i64>,
) -> TvocResult<StatusCode> {
    let deleted_rows = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::questions::dsl::*;
                    use diesel::QueryDsl;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::delete(questions.find(question_id))
                        .execute(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    if deleted_rows == 0 {
        return Err(UserError::QuestionNotFound { id: question_id }.into());
    }

    Ok(StatusCode::NO_CONTENT)
}
