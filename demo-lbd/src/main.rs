use axum::Router;
use dotenvy::dotenv;

use lbd_auth_axum::{ApiState, LBD_API_PREFIX, lbd_api_router};

mod server;
use server::{init_tracing, port_from_env, spawn_http_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("demo_lbd");

    lbd_auth_axum::init().await?;

    let app = Router::new().nest(LBD_API_PREFIX.as_str(), lbd_api_router(ApiState::default()));

    spawn_http_server(port_from_env(), app).await??;
    Ok(())
}
