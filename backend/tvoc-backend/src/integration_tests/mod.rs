use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::configuration::Configuration;
use crate::database::create_async_database_connection_pool;
use crate::database::model::{UserProgress, UserProgressUpsert};
use crate::error::{TvocError, TvocResult};
use crate::job_queue::jobs::expire_broken_streaks::expire_broken_streaks;

#[instrument(err, skip(configuration))]
pub async fn run_internal_integration_tests(configuration: &Configuration) -> TvocResult<()> {
    test_aborted_transaction(configuration).await?;
    test_expire_broken_streaks(configuration).await
}

#[instrument(err, skip(configuration))]
async fn test_aborted_transaction(configuration: &Configuration) -> TvocResult<()> {
    let database_connection_pool = create_async_database_connection_pool(configuration).await?;

    // Set up test table
    database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::integration_test_scratch::dsl::*;
                    use diesel::ExpressionMethods;
                    use diesel_async::RunQueryDsl;

                    diesel::delete(integration_test_scratch)
                        .filter(id.eq_any([1, 2]))
                        .execute(database_connection)
                        .await?;
                    diesel::insert_into(integration_test_scratch)
                        .values([(id.eq(1), value.eq("nam")), (id.eq(2), value.eq("khao"))])
                        .execute(database_connection)
                        .await?;

                    Ok(())
                })
            },
            0,
        )
        .await?;

    info!("Test table set up successfully");

    // Trigger a serialisation failure
    let (first, second) = tokio::join!(
        database_connection_pool.execute_transaction::<_, TvocError>(
            |database_connection| Box::pin(async move {
                use crate::database::schema::integration_test_scratch::dsl::*;
                use diesel::ExpressionMethods;
                use diesel::OptionalExtension;
                use diesel::QueryDsl;
                use diesel_async::RunQueryDsl;

                let first_value: Option<String> = integration_test_scratch
                    .select(value)
                    .filter(id.eq(1))
                    .first(database_connection)
                    .await
                    .optional()?;

                sleep(Duration::from_secs(5)).await;

                diesel::update(integration_test_scratch)
                    .filter(id.eq(2))
                    .set(value.eq(first_value.unwrap()))
                    .execute(database_connection)
                    .await?;

                Ok(())
            }),
            0
        ),
        database_connection_pool.execute_transaction::<_, TvocError>(
            |database_connection| Box::pin(async move {
                use crate::database::schema::integration_test_scratch::dsl::*;
                use diesel::ExpressionMethods;
                use diesel::OptionalExtension;
                use diesel::QueryDsl;
                use diesel_async::RunQueryDsl;

                let second_value: Option<String> = integration_test_scratch
                    .select(value)
                    .filter(id.eq(2))
                    .first(database_connection)
                    .await
                    .optional()?;

                sleep(Duration::from_secs(5)).await;

                diesel::update(integration_test_scratch)
                    .filter(id.eq(1))
                    .set(value.eq(second_value.unwrap()))
                    .execute(database_connection)
                    .await?;

                Ok(())
            }),
            0
        ),
    );

    info!("Serialisation failure should have triggered");
    info!("First result:  {first:?}");
    info!("Second result: {second:?}");
    assert!(
        matches!(
            first,
            Err(TvocError::DatabaseTransactionRetryLimitReached { .. })
        ) || matches!(
            second,
            Err(TvocError::DatabaseTransactionRetryLimitReached { .. })
        )
    );

    // Ensure that we can still do transactions on the same data
    database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::integration_test_scratch::dsl::*;
                    use diesel::ExpressionMethods;
                    use diesel_async::RunQueryDsl;

                    diesel::delete(integration_test_scratch)
                        .filter(id.eq_any([1, 2]))
                        .execute(database_connection)
                        .await?;

                    Ok(())
                })
            },
            0,
        )
        .await?;

    info!("Success! Transactions still work after serialisation failure");

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn test_expire_broken_streaks(configuration: &Configuration) -> TvocResult<()> {
    let database_connection_pool = create_async_database_connection_pool(configuration).await?;
    let now = Utc::now();

    let stale_user = "internal-test-stale-user";
    let fresh_user = "internal-test-fresh-user";

    // Set up one user with an expired streak and one who played today.
    let upserts = [
        UserProgressUpsert {
            user_id: stale_user.to_string(),
            total_diamonds: 10,
            total_xp: 50,
            games_played: 5,
            current_streak: 5,
            longest_streak: 5,
            last_played_at: Some(now - ChronoDuration::days(3)),
        },
        UserProgressUpsert {
            user_id: fresh_user.to_string(),
            total_diamonds: 4,
            total_xp: 20,
            games_played: 2,
            current_streak: 2,
            longest_streak: 2,
            last_played_at: Some(now),
        },
    ];
    let upserts = &upserts;

    database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel_async::RunQueryDsl;

                    for upsert in upserts {
                        diesel::insert_into(user_progress)
                            .values(upsert)
                            .on_conflict(user_id)
                            .do_update()
                            .set(upsert)
                            .execute(database_connection)
                            .await?;
                    }

                    Ok(())
                })
            },
            0,
        )
        .await?;

    expire_broken_streaks(&database_connection_pool, configuration).await?;

    let (stale, fresh) = database_connection_pool
        .execute_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel::{QueryDsl, SelectableHelper};
                    use diesel_async::RunQueryDsl;

                    let stale: UserProgress = user_progress
                        .find(stale_user)
                        .select(UserProgress::as_select())
                        .first(database_connection)
                        .await?;
                    let fresh: UserProgress = user_progress
                        .find(fresh_user)
                        .select(UserProgress::as_select())
                        .first(database_connection)
                        .await?;

                    // Clean up the test users.
                    diesel::delete(user_progress.find(stale_user))
                        .execute(database_connection)
                        .await?;
                    diesel::delete(user_progress.find(fresh_user))
                        .execute(database_connection)
                        .await?;

                    Ok((stale, fresh))
                })
            },
            0,
        )
        .await?;

    assert_eq!(stale.current_streak, 0);
    assert_eq!(stale.longest_streak, 5);
    assert_eq!(fresh.current_streak, 2);

    info!("Success! Streak expiry resets only broken streaks");

    Ok(())
}
