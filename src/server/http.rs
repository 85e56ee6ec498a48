//! HTTP server implementation
//!
//! Routes:
//! - GET /api/clan_info/{identifier} - parsed clan configuration
//! - GET /health - liveness plus registry state
//! - GET /version - build information
//! - OPTIONS * - CORS preflight

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Args;
use crate::history::ChannelHistory;
use crate::identifiers::IdentifierRegistry;
use crate::routes;
use crate::types::TrackerError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub registry: Arc<IdentifierRegistry>,
    pub history: Arc<dyn ChannelHistory>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        registry: Arc<IdentifierRegistry>,
        history: Arc<dyn ChannelHistory>,
    ) -> Self {
        Self {
            args,
            registry,
            history,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TrackerError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("ClanTracker listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { serve(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn serve<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    debug!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(handle_request(&state, &req).await)
}

/// Route a request. Bodies are never read.
pub async fn handle_request<B>(state: &AppState, req: &Request<B>) -> Response<Full<Bytes>> {
    let path = req.uri().path();

    match (req.method(), path) {
        (&Method::OPTIONS, _) => routes::preflight_response(),

        (&Method::GET, "/health") => routes::health_check(state).await,

        (&Method::GET, "/version") => routes::version_info(),

        (&Method::GET, p) if p.starts_with(routes::CLAN_INFO_PREFIX) => {
            let identifier = &p[routes::CLAN_INFO_PREFIX.len()..];
            if identifier.contains('/') {
                return routes::not_found_response(p);
            }
            routes::handle_clan_info(state, identifier).await
        }

        // Bare prefix without the trailing slash
        (&Method::GET, "/api/clan_info") => routes::handle_clan_info(state, "").await,

        _ => routes::not_found_response(path),
    }
}
