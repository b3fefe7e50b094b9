use std::sync::{atomic, Arc};

use clap::{Parser, Subcommand};
use tracing::{debug, info, instrument};

use crate::{
    configuration::Configuration,
    database::{
        create_async_database_connection_pool,
        migrations::{has_missing_migrations, run_migrations},
    },
    error::{TvocError, TvocResult},
    integration_tests::run_internal_integration_tests,
    job_queue::{jobs::expire_broken_streaks::expire_broken_streaks, spawn_job_queue_runner},
    tts::TtsClient,
    web::run_web_api,
};

/// CLI of the Thai vocabulary learning backend.
#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Default)]
enum CliCommand {
    /// Run the web API (default).
    #[default]
    Web,

    /// Apply pending database migrations.
    ApplyMigrations,

    /// Reset the streaks of users who have not played since the start of yesterday (UTC).
    /// This is done automatically while the web application runs.
    /// But if required, it can be run manually with this command.
    ExpireBrokenStreaks,

    /// Run integration tests that require a database, but use APIs that are not exposed through the web interface.
    RunInternalIntegrationTests,
}

#[instrument(skip(configuration))]
pub async fn run_cli_command(configuration: &Configuration) -> TvocResult<()> {
    let cli = Cli::parse();
    debug!("Cli arguments: {cli:#?}");

    match cli.command.unwrap_or_default() {
        CliCommand::Web => run_tvoc_backend(configuration).await?,
        CliCommand::ApplyMigrations => apply_pending_database_migrations(configuration).await?,
        CliCommand::ExpireBrokenStreaks => {
            expire_broken_streaks(
                &create_async_database_connection_pool(configuration).await?,
                configuration,
            )
            .await?
        }
        CliCommand::RunInternalIntegrationTests => {
            run_internal_integration_tests(configuration).await?
        }
    }

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn run_tvoc_backend(configuration: &Configuration) -> TvocResult<()> {
    debug!("Running tvoc backend with configuration: {configuration:#?}");

    let database_connection_pool = create_async_database_connection_pool(configuration).await?;
    let tts_client = Arc::new(TtsClient::new(configuration)?);

    // Create shutdown flag.
    let do_shutdown = Arc::new(atomic::AtomicBool::new(false));

    // Start job queue
    let job_queue_join_handle =
        spawn_job_queue_runner(&database_connection_pool, do_shutdown.clone(), configuration)
            .await?;

    // Start web API
    run_web_api(database_connection_pool, tts_client, configuration).await?;

    // Shutdown
    info!("Shutting down...");
    do_shutdown.store(true, atomic::Ordering::Relaxed);

    info!("Waiting for asynchronous tasks to finish...");
    job_queue_join_handle
        .await
        .map_err(|error| TvocError::TokioTaskJoin {
            source: Box::new(error),
        })??;

    Ok(())
}

#[instrument(err, skip(configuration))]
async fn apply_pending_database_migrations(configuration: &Configuration) -> TvocResult<()> {
    if has_missing_migrations(configuration)? {
        info!("Executing missing database migrations");
        run_migrations(configuration)?;
        info!("Success!");
    } else {
        info!("No missing migrations");
    }

    Ok(())
}
