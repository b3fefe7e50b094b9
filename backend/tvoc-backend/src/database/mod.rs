use tracing::instrument;

use crate::{configuration::Configuration, error::TvocResult};

mod async_connection_pool;
pub mod migrations;
pub mod model;
pub mod schema;
mod sync_connection;
pub mod transactions;

pub use async_connection_pool::TvocAsyncDatabaseConnectionPool;

diesel::sql_function!(fn random() -> diesel::sql_types::Double);

#[instrument(err, skip(configuration))]
pub async fn create_async_database_connection_pool(
    configuration: &Configuration,
) -> TvocResult<TvocAsyncDatabaseConnectionPool> {
    TvocAsyncDatabaseConnectionPool::new(configuration)
}
