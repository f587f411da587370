use anyhow::Context;

use paybook_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    paybook_observability::init();

    let config = ApiConfig::from_env();
    let (app, services) = paybook_api::app::build_app(&config);

    if let Some(path) = &config.seed_file {
        let summary = paybook_api::seed::load_file(path, &services.directory)
            .with_context(|| format!("loading seed file {}", path.display()))?;
        tracing::info!(
            tenants = summary.tenants,
            employees = summary.employees,
            employment_events = summary.employment_events,
            "master data seeded"
        );
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
