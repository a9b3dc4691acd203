use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kickoff_bot::config::Config;
use kickoff_bot::dispatch::{HttpSpawner, WorkSpawner};
use kickoff_bot::reconciler;
use kickoff_bot::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kickoff_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let spawner: Option<Arc<dyn WorkSpawner>> = match &config.spawner_url {
        Some(url) => match HttpSpawner::new(url.clone(), config.dispatch_timeout) {
            Ok(spawner) => Some(Arc::new(spawner)),
            Err(e) => {
                tracing::error!(error = %e, "could not build spawner; dispatch disabled");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(config, spawner);
    tokio::spawn(reconciler::run_poll_loop(state.clone()));

    let app = build_router(state);

    let port = std::env::var("KICKOFF_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
