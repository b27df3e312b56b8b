use std::sync::Arc;

use anyhow::{Context, Result};
use sws_flow::{ActivityWorker, Decider, HttpTransport, SwsTransport, WorkerConfig};
use sws_worker::{getnum, getnum_type, sum_type, sum_workflow, Role};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(format!("sws_flow={level},sws_worker={level}"))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let role = Role::from_env()?;
    let config = WorkerConfig::from_env();
    config.validate().context("Invalid worker configuration")?;

    let mut transport =
        HttpTransport::new(&config.region).context("Failed to create SWS transport")?;
    if let Ok(endpoint) = std::env::var("SWS_ENDPOINT") {
        if !endpoint.is_empty() {
            transport = transport.with_endpoint(endpoint);
        }
    }
    let transport: Arc<dyn SwsTransport> = Arc::new(transport);

    tracing::info!(
        role = %role,
        domain = %config.domain,
        task_list = %config.task_list,
        region = %config.region,
        "sws-worker starting"
    );

    let decider = if role.runs_decider() {
        let mut decider = Decider::new(config.clone(), Arc::clone(&transport))
            .context("Failed to create decider")?;
        decider.register(sum_type(), sum_workflow);
        Some(Arc::new(decider))
    } else {
        None
    };

    let activities = if role.runs_activities() {
        let mut worker = ActivityWorker::new(config.clone(), Arc::clone(&transport))
            .context("Failed to create activity worker")?;
        worker.register(getnum_type(), getnum);
        Some(Arc::new(worker))
    } else {
        None
    };

    let mut runtimes = tokio::task::JoinSet::new();
    if let Some(decider) = decider.clone() {
        runtimes.spawn(async move { decider.start().await.map_err(anyhow::Error::from) });
    }
    if let Some(worker) = activities.clone() {
        runtimes.spawn(async move { worker.start().await.map_err(anyhow::Error::from) });
    }

    tokio::select! {
        Some(result) = runtimes.join_next() => {
            let result = match result {
                // A lost acknowledgement is fatal for the whole process
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                result => result.context("Runtime task failed")?,
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "Runtime stopped with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    if let Some(decider) = &decider {
        decider.shutdown();
    }
    if let Some(worker) = &activities {
        worker.shutdown();
    }
    while let Some(result) = runtimes.join_next().await {
        match result {
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => tracing::warn!(error = %e, "Runtime task did not stop cleanly"),
            Ok(_) => {}
        }
    }

    tracing::info!("Worker shutdown complete");
    Ok(())
}
