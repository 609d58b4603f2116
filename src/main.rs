use gym_tracker::{router, AppConfig, AppState, FileWorkbook};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env();
    if let Some(parent) = config.sheet_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let workbook = Arc::new(FileWorkbook::new(config.sheet_path.clone()));
    let state = AppState::connect(workbook, &config).await?;
    info!(
        sheet = %config.sheet_path.display(),
        members_tab = %config.members_tab,
        renewals_tab = %config.renewals_tab,
        "connected to backing store"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
