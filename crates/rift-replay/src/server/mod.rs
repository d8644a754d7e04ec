//! Stub HTTP server.
//!
//! One task per accepted connection; every task shares the same
//! `Arc<MatchEngine>`, whose lookup table is frozen before the listener is
//! bound.

mod handler;
mod response;

pub use handler::handle_stub_request;
pub use response::{
    build_response, build_response_with_headers, error_response, ErrorDetail, ErrorResponse,
};

use crate::matcher::MatchEngine;
use crate::metrics::collect_metrics;
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error, info};

/// Pause after a failed accept (e.g. out of file descriptors) before retrying
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Stub server answering requests from the lookup table
pub struct StubServer {
    listener: TcpListener,
    engine: Arc<MatchEngine>,
}

impl StubServer {
    /// Bind the listener. Port 0 picks a free port.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        engine: Arc<MatchEngine>,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.listener.local_addr()?;
        info!(
            "Rift Replay listening on http://{} ({} fixtures)",
            addr,
            self.engine.table().len()
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept error on {}: {}", addr, e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let engine = Arc::clone(&engine);
                    async move { handle_stub_request(req, engine).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}

/// Prometheus text endpoint on its own port
pub struct MetricsServer {
    listener: TcpListener,
}

impl MetricsServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, std::io::Error> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!(
            "Metrics available on http://{}/metrics",
            self.listener.local_addr()?
        );

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                let service = service_fn(|req: Request<Incoming>| async move {
                    let response = if req.uri().path() == "/metrics" {
                        build_response_with_headers(
                            StatusCode::OK,
                            [("content-type", "text/plain; version=0.0.4")],
                            Bytes::from(collect_metrics()),
                        )
                    } else {
                        build_response(StatusCode::NOT_FOUND, "Not Found")
                    };
                    Ok::<_, Infallible>(response)
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Metrics connection error: {}", e);
                }
            });
        }
    }
}
