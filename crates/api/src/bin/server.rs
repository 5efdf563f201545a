use std::time::Duration;

use anyhow::Result;

use bazaar_api::{app_router, expose_internal_errors, setup_tracing, ApiServerEnv, GlobalState};
use bazaar_common::EnvVars;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let env = ApiServerEnv::load()?;
    expose_internal_errors(env.is_development());
    let state = GlobalState::new(&env).await?;
    let app = app_router(state, Duration::from_secs(env.request_timeout_secs));

    let port = env.port;
    let listener = tokio::net::TcpListener::bind(format!(":::{port}")).await?;

    tracing::info!("LISTENING ON {port} ({})", env.app_env);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
