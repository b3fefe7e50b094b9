use diesel::PgConnection;
use tracing::instrument;

use crate::{
    configuration::Configuration,
    error::{TvocError, TvocResult},
};

pub struct TvocSyncDatabaseConnection {
    implementation: PgConnection,
}

impl TvocSyncDatabaseConnection {
    #[instrument(err, skip(configuration))]
    pub(super) fn new(configuration: &Configuration) -> TvocResult<Self> {
        use diesel::Connection;

        // create a new connection with the default config
        let connection =
            PgConnection::establish(configuration.postgres_url.unsecure()).map_err(|error| {
                TvocError::DatabaseConnection {
                    source: Box::new(error),
                }
            })?;
        Ok(Self {
            implementation: connection,
        })
    }

    pub(super) fn get_mut(&mut self) -> &mut PgConnection {
        &mut self.implementation
    }
}
