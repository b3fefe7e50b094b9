use api_types::{ProgressResponse, UpdateProgress};
use axum::{extract::Path, http::StatusCode, Extension, Json};
use tracing::instrument;

use crate::{
    database::model::{UserProgress, UserProgressUpsert},
    error::{TvocError, TvocResult, UserError},
};

use super::{WebConfiguration, WebDatabaseConnectionPool};

#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn get_progress(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(target_user_id): Path<String>,
) -> TvocResult<Json<ProgressResponse>> {
    let target_user_id = &target_user_id;

    let progress = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    Ok(user_progress
                        .find(target_user_id.as_str())
                        .select(UserProgress::as_select())
                        .first(database_connection)
                        .await
                        .optional()?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?
        .ok_or_else(|| UserError::ProgressNotFound {
            user_id: target_user_id.clone(),
        })?;

    Ok(Json(progress.into()))
}

/// Partially update a user's progress counters, creating the row if it does
/// not exist yet.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn update_progress(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(target_user_id): Path<String>,
    Json(update): Json<UpdateProgress>,
) -> TvocResult<Json<ProgressResponse>> {
    if update.is_noop() {
        return Err(UserError::EmptyUpdate.into());
    }

    let target_user_id = &target_user_id;
    let update = &update;

    let progress = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let existing: Option<UserProgress> = user_progress
                        .find(target_user_id.as_str())
                        .select(UserProgress::as_select())
                        .first(database_connection)
                        .await
                        .optional()?;

                    let upsert = match existing {
                        Some(existing) => UserProgressUpsert {
                            user_id: existing.user_id,
                            total_diamonds: update
                                .total_diamonds
                                .unwrap_or(existing.total_diamonds),
                            total_xp: update.total_xp.unwrap_or(existing.total_xp),
                            games_played: update.games_played.unwrap_or(existing.games_played),
                            current_streak: update
                                .current_streak
                                .unwrap_or(existing.current_streak),
                            longest_streak: update
                                .longest_streak
                                .unwrap_or(existing.longest_streak),
                            last_played_at: update.last_played_at.or(existing.last_played_at),
                        },
                        None => UserProgressUpsert {
                            user_id: target_user_id.clone(),
                            total_diamonds: update.total_diamonds.unwrap_or(0),
                            total_xp: update.total_xp.unwrap_or(0),
                            games_played: update.games_played.unwrap_or(0),
                            current_streak: update.current_streak.unwrap_or(0),
                            longest_streak: update.longest_streak.unwrap_or(0),
                            last_played_at: update.last_played_at,
                        },
                    };

                    Ok(diesel::insert_into(user_progress)
                        .values(&upsert)
                        .on_conflict(user_id)
                        .do_update()
                        .set(&upsert)
                        .returning(UserProgress::as_returning())
                        .get_result(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(Json(progress.into()))
}

/// Reset a user's progress by deleting the row. Idempotent.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn delete_progress(
    Extension(database_connection_pool): WebDatabaseConnectionPool,
    Extension(configuration): WebConfiguration,
    Path(target_user_id): Path<String>,
) -> TvocResult<StatusCode> {
    let target_user_id = &target_user_id;

    database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel::QueryDsl;
                    use diesel_async::RunQueryDsl;

                    Ok(diesel::delete(user_progress.find(target_user_id.as_str()))
                        .execute(database_connection)
                        .await?)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
