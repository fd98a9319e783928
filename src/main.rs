use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use run_coach::clients::activity_source::StravaSource;
use run_coach::clients::generative::OpenAiClient;
use run_coach::clients::notifier::EmailNotifier;
use run_coach::clients::store::PostgresStore;
use run_coach::config::AppConfig;
use run_coach::services::{
    MetricsService, ReconcileService, ScheduleService, TargetService, TrainingPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let pool = config.database.create_pool().await?;
    let store = Arc::new(PostgresStore::new(pool));
    store.migrate().await.context("running migrations")?;

    let llm = Arc::new(OpenAiClient::new(
        &config.llm.base_url,
        &config.llm.api_key,
        &config.llm.model,
    ));
    let source = Arc::new(StravaSource::new(&config.strava.base_url, store.clone()));
    let notifier = Arc::new(EmailNotifier::new(config.smtp.clone()));

    let metrics = MetricsService::new(source, config.sweep.utc_offset_hours);
    let targets = TargetService::new(llm.clone(), store.clone(), config.convergence.schema_retries);
    let schedule = ScheduleService::new(llm.clone(), config.convergence);
    let reconciler = ReconcileService::new(llm, schedule, config.convergence.schema_retries);

    let pipeline = Arc::new(TrainingPipeline::new(
        store,
        notifier,
        metrics,
        targets,
        reconciler,
        config.sweep.concurrency,
    ));

    let scheduler = JobScheduler::new().await?;
    let cron = config.sweep.cron.clone();
    scheduler
        .add(Job::new_async(cron.as_str(), move |_id, _lock| {
            let pipeline = pipeline.clone();
            Box::pin(async move {
                pipeline.run_sweep(Utc::now()).await;
            })
        })?)
        .await?;
    scheduler.start().await?;

    info!(cron = %config.sweep.cron, "run-coach sweep scheduled");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
