use article_queue::infrastructure::{AppConfig, AppContainer};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let container = AppContainer::new(config)?;
    container.warm_index().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = container.background_worker.clone();
    let worker_task = tokio::spawn(worker.run(shutdown_rx));

    container
        .http_server()
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    // The worker finishes its current tick before exiting.
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_task.await {
        error!("Background worker panicked: {}", e);
    }

    Ok(())
}
