use api_types::{
    CreateLesson, LessonFilter, LessonResponse, LessonWithQuestions, QuestionResponse,
    UpdateLesson,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use crate::{
    database::model::{Lesson, LessonChangeset, NewLesson, Question},
    error::{TvocError, TvocResult, UserError},
};

use super::{clamp_page_limit, WebConfiguration, WebDatabaseConnectionPool};

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn list_lessons(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Query(filter): Query<LessonFilter>,
) -> TvocResult<Json<Vec<LessonResponse>>> {
    let limit = clamp_page_limit(filter.limit);
    let offset = filter.offset.unwrap_or(0).max(0);
    let filter = &filter;

    let entries = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::lessons::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let mut query = lessons.into_boxed();
                    if let Some(filter_category) = &filter.category {
                        query = query.filter(category.eq(filter_category));
                    }
                    if let Some(filter_difficulty) = &filter.difficulty {
                        query = query.filter(difficulty.eq(filter_difficulty.as_ref()));
                    }

                    Ok(query
                        .select(Lesson::as_select())
                        .order((position.asc(), id.asc()))
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
            .map(LessonResponse::try_from)
            .collect::<TvocResult<_>>()?,
    ))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn create_lesson(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Json(create): Json<CreateLesson>,
) -> TvocResult<(StatusCode, Json<LessonResponse>)> {
    let new_lesson = NewLesson {
        title: &create.title,
        description: create.description.as_deref().unwrap_or_default(),
        category: &create.category,
        difficulty: create.difficulty.as_ref(),
        position: create.position.unwrap_or(0),
    };
    let new_lesson = &new_lesson;

    let lesson = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::lessons::dsl::*;
                    use diesel::SelectableHelper;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::insert_into(lessons)
                        .values(new_lesson)
                        .returning(Lesson::as_returning())
                        .get_result(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(lesson.try_into()?)))
}

/// Fetch one lesson together with its questions.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn get_lesson(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(requested_lesson_id): Path<i64>,
) -> TvocResult<Json<LessonWithQuestions>> {
    let (lesson, lesson_questions) = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let lesson = {
                        use crate::database::schema::lessons::dsl::*;

                        lessons
                            .find(requested_lesson_id)
                            .select(Lesson::as_select())
                            .first(database_connection)
                            .await
                            .optional()?
                    };

                    let Some(lesson) = lesson else {
                        return Ok(None);
                    };

                    let lesson_questions = {
                        use crate::database::schema::questions::dsl::*;

                        questions
                            .filter(lesson_id.eq(lesson.id))
                            .select(Question::as_select())
                            .order(id.asc())
                            .load(database_connection)
                            .await?
                    };

                    Ok(Some((lesson, lesson_questions)))
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::LessonNotFound {
            id: requested_lesson_id,
        })?;

    Ok(Json(LessonWithQuestions {
        lesson: lesson.try_into()?,
        questions: lesson_questions
            .into_iter()
            .map(QuestionResponse::try_from)
            .collect::<TvocResult<_>>()?,
    }))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn update_lesson(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(lesson_id): Path<i64>,
    Json(update): Json<UpdateLesson>,
) -> TvocResult<Json<LessonResponse>> {
    if update.is_noop() {
        return Err(UserError::EmptyUpdate.into());
    }

    let changeset = LessonChangeset {
        title: update.title.as_deref(),
        description: update.description.as_deref(),
        category: update.category.as_deref(),
        difficulty: update.difficulty.as_ref().map(AsRef::as_ref),
        position: update.position,
    };
    let changeset = &changeset;

    let lesson = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::lessons::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::update(lessons.find(lesson_id))
                        .set(changeset)
                        .returning(Lesson::as_returning())
                        .get_result(database_connection)
                        .await
                        .optional()?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::LessonNotFound { id: lesson_id })?;

    Ok(Json(lesson.try_into()?))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn delete_lesson(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(lesson_id): Path<i64>,
) -> TvocResult<StatusCode> {
    let deleted_rows = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::lessons::dsl::*;
                    use diesel::QueryDsl;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::delete(lessons.find(lesson_id))
                        .execute(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    if deleted_rows == 0 {
        return Err(UserError::LessonNotFound { id: lesson_id }.into());
    }

    Ok(StatusCode::NO_CONTENT)
}
