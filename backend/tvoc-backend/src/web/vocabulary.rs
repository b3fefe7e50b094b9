use api_types::{
    CreateVocabulary, RandomVocabularyQuery, UpdateVocabulary, VocabularyFilter,
    VocabularyResponse,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use crate::{
    database::model::{NewVocabulary, Vocabulary, VocabularyChangeset},
    error::{TvocError, TvocResult, UserError},
};

use super::{clamp_page_limit, WebConfiguration, WebDatabaseConnectionPool};

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn list_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Query(filter): Query<VocabularyFilter>,
) -> TvocResult<Json<Vec<VocabularyResponse>>> {
    let limit = clamp_page_limit(filter.limit);
    let offset = filter.offset.unwrap_or(0).max(0);
    let filter = &filter;

    let entries = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let mut query = vocabulary.into_boxed();
                    if let Some(filter_category) = &filter.category {
                        query = query.filter(category.eq(filter_category));
                    }
                    if let Some(filter_difficulty) = &filter.difficulty {
                        query = query.filter(difficulty.eq(filter_difficulty.as_ref()));
                    }

                    Ok(query
                        .select(Vocabulary::as_select())
                        .order(word.asc())
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
            .map(VocabularyResponse::try_from)
            .collect::<TvocResult<_>>()?,
    ))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn create_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Json(create): Json<CreateVocabulary>,
) -> TvocResult<(StatusCode, Json<VocabularyResponse>)> {
    let new_vocabulary = NewVocabulary {
        word: &create.word,
        romanization: &create.romanization,
        translation: &create.translation,
        category: &create.category,
        difficulty: create.difficulty.as_ref(),
        example_sentence: create.example_sentence.as_deref(),
        example_translation: create.example_translation.as_deref(),
    };
    let new_vocabulary = &new_vocabulary;
    let create = &create;

    let entry = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::SelectableHelper;
                    use diesel_async::RunQueryDsl;

                    let result = diesel::insert_into(vocabulary)
                        .values(new_vocabulary)
                        .returning(Vocabulary::as_returning())
                        .get_result(database_connection)
                        .await;

                    match result {
                        Ok(entry) => Ok(entry),
                        Err(diesel::result::Error::DatabaseError(
                            diesel::result::DatabaseErrorKind::UniqueViolation,
                            _,
                        )) => Err(TvocError::from(UserError::DuplicateWord {
                            word: create.word.clone(),
                        })
                        .into()),
                        Err(error) => Err(error.into()),
                    }
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry.try_into()?)))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn random_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Query(query): Query<RandomVocabularyQuery>,
) -> TvocResult<Json<Vec<VocabularyResponse>>> {
    let count = configuration.clamp_question_count(query.count);
    let query = &query;

    let entries = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let mut sample = vocabulary.into_boxed();
                    if let Some(filter_category) = &query.category {
                        sample = sample.filter(category.eq(filter_category));
                    }
                    if let Some(filter_difficulty) = &query.difficulty {
                        sample = sample.filter(difficulty.eq(filter_difficulty.as_ref()));
                    }

                    Ok(sample
                        .select(Vocabulary::as_select())
                        .order(crate::database::random())
                        .limit(count)
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
            .map(VocabularyResponse::try_from)
            .collect::<TvocResult<_>>()?,
    ))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn get_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(vocabulary_id): Path<i64>,
) -> TvocResult<Json<VocabularyResponse>> {
    let entry = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(vocabulary
                        .find(vocabulary_id)
                        .select(Vocabulary::as_select())
                        .first(database_connection)
                        .await
                        .optional()?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::VocabularyNotFound { id: vocabulary_id })?;

    Ok(Json(entry.try_into()?))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn update_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(vocabulary_id): Path<i64>,
    Json(update): Json<UpdateVocabulary>,
) -> TvocResult<Json<VocabularyResponse>> {
    if update.is_noop() {
        return Err(UserError::EmptyUpdate.into());
    }

    let changeset = VocabularyChangeset {
        word: update.word.as_deref(),
        romanization: update.romanization.as_deref(),
        translation: update.translation.as_deref(),
        category: update.category.as_deref(),
        difficulty: update.difficulty.as_ref().map(AsRef::as_ref),
        example_sentence: update.example_sentence.as_deref(),
        example_translation: update.example_translation.as_deref(),
    };
    let changeset = &changeset;
    let update = &update;

    let entry = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let result = diesel::update(vocabulary.find(vocabulary_id))
                        .set(changeset)
                        .returning(Vocabulary::as_returning())
                        .get_result(database_connection)
                        .await
                        .optional();

                    match result {
                        Ok(entry) => Ok(entry),
                        Err(diesel::result::Error::DatabaseError(
                            diesel::result::DatabaseErrorKind::UniqueViolation,
                            _,
                        )) => Err(TvocError::from(UserError::DuplicateWord {
                            word: update.word.clone().unwrap_or_default(),
                        })
                        .into()),
                        Err(error) => Err(error.into()),
                    }
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or(UserError::VocabularyNotFound { id: vocabulary_id })?;

    Ok(Json(entry.try_into()?))
}

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn delete_vocabulary(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(vocabulary_id): Path<i64>,
) -> TvocResult<StatusCode> {
    let deleted_rows = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::vocabulary::dsl::*;
                    use diesel::QueryDsl;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::delete(vocabulary.find(vocabulary_id))
                        .execute(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    if deleted_rows == 0 {
        return Err(UserError::VocabularyNotFound { id: vocabulary_id }.into());
    }

    Ok(StatusCode::NO_CONTENT)
}
