use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use http_body_util::BodyExt;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::{Method, Request};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use daymark::AppState;
use daymark::database::open_database;
use daymark::handlers::handle_request;
use daymark::handlers::http::build_api_router;
use daymark::tower_middle::TimeoutLayer;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Overrides `database.path` from the config file
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = shared::config::load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(path) = args.database {
        config.database.path = path;
    }

    let db = open_database(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    info!("Database ready at {}", config.database.path);

    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.addr()))?;
    let cors_origin = HeaderValue::from_str(&config.server.cors_origin)
        .context("Invalid server.cors_origin")?;
    let timeout = config.server.request_timeout();

    let state = AppState::new(db, config)?;
    spawn_purge_task(&state);

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let router = Arc::new(build_api_router());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let io = TokioIo::new(stream);

        let router = router.clone();
        let state = state.clone();
        let svc = ServiceBuilder::new()
            .layer(cors.clone())
            .layer(TimeoutLayer::new(timeout))
            .service(tower::service_fn(move |req: Request<hyper::body::Incoming>| {
                let router = router.clone();
                let state = state.clone();
                async move {
                    let req = req.map(|body| body.boxed());
                    Ok::<_, Infallible>(handle_request(req, router, state).await)
                }
            }));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, TowerToHyperService::new(svc))
                .await
            {
                error!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}

/// Periodically drop expired refresh-token rows. Disabled when the
/// configured interval is 0.
fn spawn_purge_task(state: &AppState) {
    let Some(period) = state.config.auth.purge_interval() else {
        info!("Refresh token purge disabled");
        return;
    };

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(count) => info!("Purge removed {} expired sessions", count),
                Err(e) => warn!("Refresh token purge failed: {}", e),
            }
        }
    });
}
