use chrono::Utc;
use tracing::{info, instrument};

use crate::{
    configuration::Configuration,
    database::TvocAsyncDatabaseConnectionPool,
    error::{TvocError, TvocResult},
    model::scoring::streak_expiry_cutoff,
};

/// Reset the current streak of all users whose last game is older than the
/// streak expiry cutoff.
#[instrument(err, skip(database_connection_pool, configuration))]
pub async fn expire_broken_streaks(
    database_connection_pool: &TvocAsyncDatabaseConnectionPool,
    configuration: &Configuration,
) -> TvocResult<()> {
    let cutoff = streak_expiry_cutoff(Utc::now());

    let reset_count = database_connection_pool
        .execute_read_committed_transaction::<_, TvocError>(
            |database_connection| {
                Box::pin(async move {
                    use crate::database::schema::user_progress::dsl::*;
                    use diesel::{ExpressionMethods, QueryDsl};
                    use diesel_async::RunQueryDsl;

                    let reset_count = diesel::update(
                        user_progress
                            .filter(current_streak.gt(0))
                            .filter(last_played_at.lt(cutoff)),
                    )
                    .set(current_streak.eq(0))
                    .execute(database_connection)
                    .await?;

                    Ok(reset_count)
                })
            },
            configuration.maximum_transaction_retry_count,
        )
        .await
        .map_err(|error| TvocError::ExpireBrokenStreaks {
            source: Box::new(error),
        })?;

    if reset_count > 0 {
        info!("Reset the streak of {reset_count} users");
    }

    Ok(())
}
