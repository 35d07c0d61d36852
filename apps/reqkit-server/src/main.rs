//! reqkit demo server.
//!
//! Serves one catch-all handler that echoes the normalized parameters of every
//! request inside the standard JSON envelope and stores an optional `upload`
//! file.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:9999 reqkit-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:9999` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `REPLAY_BODY` | `false` | Keep JSON bodies readable after ingestion |
//! | `MAX_MEMORY_SIZE` | `32768` | Multipart in-memory threshold in bytes |
//! | `MAX_BODY_SIZE` | `33554432` | Request body limit in bytes |
//! | `UPLOAD_DIR` | `./uploads` | Where uploads are stored |

mod handler;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use reqkit_core::ServerConfig;
use reqkit_http::{HttpService, HttpServiceConfig, IngestConfig, IngestMode, RequestHandler};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::DemoHandler;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`HttpServiceConfig`] from the process [`ServerConfig`].
fn build_http_config(config: &ServerConfig) -> HttpServiceConfig {
    HttpServiceConfig {
        ingest: IngestConfig {
            max_memory_size: config.max_memory_size,
            max_body_size: config.max_body_size,
        },
        mode: if config.replay_body {
            IngestMode::Touch
        } else {
            IngestMode::Plug
        },
    }
}

/// Run the accept loop until a shutdown signal is received.
async fn serve<H: RequestHandler>(listener: TcpListener, service: HttpService<H>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.with_remote_addr(peer_addr);
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        replay_body = config.replay_body,
        max_memory_size = config.max_memory_size,
        max_body_size = config.max_body_size,
        upload_dir = %config.upload_dir,
        version = VERSION,
        "starting reqkit server",
    );

    let handler = DemoHandler::new(&config.upload_dir);
    let service = HttpService::new(handler, build_http_config(&config));

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_http_config_from_server_config() {
        let config = ServerConfig {
            replay_body: true,
            max_memory_size: 10,
            max_body_size: 20,
            ..ServerConfig::default()
        };
        let http_config = build_http_config(&config);
        assert_eq!(http_config.mode, IngestMode::Touch);
        assert_eq!(http_config.ingest.max_memory_size, 10);
        assert_eq!(http_config.ingest.max_body_size, 20);
    }

    #[test]
    fn test_should_default_to_plug_mode() {
        let http_config = build_http_config(&ServerConfig::default());
        assert_eq!(http_config.mode, IngestMode::Plug);
        assert_eq!(http_config.ingest, IngestConfig::default());
    }
}
