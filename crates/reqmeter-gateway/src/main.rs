//! reqmeter gateway
//!
//! - `/metrics`    : Prometheus text snapshot of the request metrics
//! - `/health`     : liveness JSON
//! - `/error`      : always 500, for error-path instrumentation
//! - `/heavy-task` : answers after a fixed artificial delay

use std::net::SocketAddr;
use std::process::ExitCode;

use reqmeter_gateway::{
    app_state::AppState,
    config,
    error::{GatewayError, Result},
    obs, router,
};

#[tokio::main]
async fn main() -> ExitCode {
    obs::logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "reqmeter-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| GatewayError::BadRequest(format!("gateway.listen: {e}")))?;

    let state = AppState::new(cfg)?;
    tracing::info!(sink = %state.log().sink(), job = %state.log().job(), "log sink configured");
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "reqmeter-gateway listening");
    for route in router::ROUTES {
        tracing::info!(%route, "route available");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
