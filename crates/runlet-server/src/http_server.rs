//! HTTP server for the Runlet host.
//!
//! hyper HTTP/1.1, one tokio task per connection. The server accepts
//! JSON-RPC requests over POST and forwards them to the [`HostRouter`];
//! transport-level failures (wrong method, unparsable body) are answered
//! with JSON-RPC error envelopes rather than bare status codes.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;

use runlet_common::protocol::error::RunletError;
use runlet_common::protocol::JsonRpcError;
use runlet_common::transport::{HttpTransport, HyperRequest, HyperResponse};

use crate::host::Host;
use crate::http_router::HostRouter;

/// HTTP server wrapping a [`Host`].
pub struct HttpServer {
    router: Arc<HostRouter>,
}

impl HttpServer {
    pub fn new(host: Arc<Host>) -> Self {
        Self {
            router: Arc::new(HostRouter::new(host)),
        }
    }

    /// Binds to `addr` and serves until the process exits.
    pub async fn run(self, addr: SocketAddr) -> Result<(), RunletError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RunletError::Transport(format!("Failed to bind to {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener. Tests bind port
    /// 0 themselves to learn the address before serving.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RunletError> {
        let local = listener
            .local_addr()
            .map_err(|e| RunletError::Transport(format!("Failed to get local address: {e}")))?;
        tracing::info!("HTTP server listening on {}", local);

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| RunletError::Transport(format!("Failed to accept connection: {e}")))?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Self::handle_request(router, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(
        router: Arc<HostRouter>,
        req: HyperRequest,
    ) -> Result<HyperResponse, RunletError> {
        if req.method() != hyper::Method::POST {
            return Ok(HttpTransport::to_http_error(
                json!(null),
                JsonRpcError::invalid_request(),
            ));
        }

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| RunletError::Transport(format!("Failed to read request body: {e}")))?
            .to_bytes();

        let rpc_req = match HttpTransport::parse_jsonrpc(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Failed to parse JSON-RPC request: {}", e);
                return Ok(HttpTransport::to_http_error(
                    json!(null),
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let rpc_res = router.handle_request(rpc_req).await;
        Ok(HttpTransport::to_http_response(rpc_res))
    }
}
