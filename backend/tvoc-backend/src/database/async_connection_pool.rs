use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    scoped_futures::ScopedBoxFuture,
    AsyncPgConnection,
};
use tracing::{debug, instrument};

use crate::{
    configuration::Configuration,
    database::transactions::{PermanentTransactionError, TransactionError},
    error::{TvocError, TvocResult},
};

#[derive(Clone)]
pub struct TvocAsyncDatabaseConnectionPool {
    implementation: Pool<AsyncPgConnection>,
}

#[derive(Debug, Clone, Copy)]
enum TransactionIsolationLevel {
    Serializable,
    ReadCommitted,
}

impl TvocAsyncDatabaseConnectionPool {
    #[instrument(err, skip(configuration))]
    pub(super) fn new(configuration: &Configuration) -> TvocResult<Self> {
        // create a new connection pool with the default config
        let connection_manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(
            configuration.postgres_url.unsecure(),
        );
        let pool = Pool::builder(connection_manager).build().map_err(|error| {
            TvocError::DatabaseConnectionPoolCreation {
                source: Box::new(error),
            }
        })?;

        Ok(Self {
            implementation: pool,
        })
    }

    /// Execute a transaction with serializable isolation.
    ///
    /// Serialisation failures and [`TransactionError::Temporary`] errors are
    /// logged and the transaction is retried (by calling the closure again).
    /// After `maximum_retry_count` temporary errors,
    /// [`PermanentTransactionError::too_many_temporary_errors`] is returned.
    pub async fn execute_transaction<'b, ReturnType, PermanentErrorType>(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Sync,
        maximum_retry_count: u64,
    ) -> Result<ReturnType, PermanentErrorType>
    where
        ReturnType: Send + 'b,
        PermanentErrorType: PermanentTransactionError,
    {
        self.execute_transaction_with_isolation_level(
            transaction,
            maximum_retry_count,
            TransactionIsolationLevel::Serializable,
        )
        .await
    }

    /// Execute a transaction with read-committed isolation.
    ///
    /// This is meant for reads and single-statement bulk updates, where
    /// serialisation failures cannot occur or losing a race is acceptable.
    pub async fn execute_read_committed_transaction<'b, ReturnType, PermanentErrorType>(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Sync,
        maximum_retry_count: u64,
    ) -> Result<ReturnType, PermanentErrorType>
    where
        ReturnType: Send + 'b,
        PermanentErrorType: PermanentTransactionError,
    {
        self.execute_transaction_with_isolation_level(
            transaction,
            maximum_retry_count,
            TransactionIsolationLevel::ReadCommitted,
        )
        .await
    }

    async fn execute_transaction_with_isolation_level<'b, ReturnType, PermanentErrorType>(
        &self,
        transaction: impl for<'r> Fn(
                &'r mut AsyncPgConnection,
            )
                -> ScopedBoxFuture<'b, 'r, Result<ReturnType, TransactionError>>
            + Sync,
        maximum_retry_count: u64,
        isolation_level: TransactionIsolationLevel,
    ) -> Result<ReturnType, PermanentErrorType>
    where
        ReturnType: Send + 'b,
        PermanentErrorType: PermanentTransactionError,
    {
        for _ in 0..maximum_retry_count.saturating_add(1) {
            let mut database_connection =
                self.implementation.get().await.map_err(|error| {
                    PermanentErrorType::permanent_error(Box::new(error))
                })?;

            let result = match isolation_level {
                TransactionIsolationLevel::Serializable => {
                    database_connection
                        .build_transaction()
                        .serializable()
                        .run(|database_connection| transaction(database_connection))
                        .await
                }
                TransactionIsolationLevel::ReadCommitted => {
                    database_connection
                        .build_transaction()
                        .read_committed()
                        .run(|database_connection| transaction(database_connection))
                        .await
                }
            };

            match result {
                Ok(result) => return Ok(result),
                Err(TransactionError::Temporary(error)) => {
                    debug!("temporary transaction error: {error}")
                }
                Err(TransactionError::Permanent(error)) => {
                    return Err(PermanentErrorType::permanent_error(error))
                }
                Err(TransactionError::Diesel(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::SerializationFailure,
                    information,
                ))) => {
                    debug!("transaction serialisation failure: {}", information.message())
                }
                Err(TransactionError::Diesel(error)) => {
                    return Err(PermanentErrorType::permanent_error(Box::new(error)))
                }
            }
        }

        Err(PermanentErrorType::too_many_temporary_errors(
            maximum_retry_count,
        ))
    }
}
