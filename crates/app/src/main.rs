mod confirm;
mod events;
#[cfg(test)]
mod fake_backend;
mod problem;
mod render;
mod router;
mod telemetry;
mod views;

use std::net::SocketAddr;

use org_admin_api::{ApiClient, DepartmentsApi, PositionsApi};
use org_admin_cache::QueryCache;
use org_admin_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let api = ApiClient::new(config.api_base_url.clone(), reqwest::Client::new());
    info!(stage = "app", base_url = %api.base_url(), "api client ready");
    let cache = QueryCache::new();
    let page = events::PageHub::new();

    let departments = views::DepartmentView::new(
        DepartmentsApi::new(api.clone()),
        cache.clone(),
        page.clone(),
    );
    let positions = views::PositionView::new(
        PositionsApi::new(api.clone()),
        DepartmentsApi::new(api),
        cache,
        page.clone(),
    );
    departments.mount();
    positions.mount();

    let state = router::AppState::new(metrics, page, departments, positions);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
