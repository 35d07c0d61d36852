//! Hyper `Service` adapter.
//!
//! [`HttpService`] runs every request through the same pipeline:
//!
//! 1. Path segments are resolved by the handler
//! 2. The body is collected under the configured size limit
//! 3. The request is ingested into a [`RequestContext`]
//! 4. The context is dispatched to the [`RequestHandler`]
//! 5. Common headers (`x-request-id`, `server`) are added
//!
//! Ingestion errors never reach the handler; they are answered here with a
//! failure envelope.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use hyper::service::Service;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::config::{IngestConfig, IngestMode};
use crate::dispatch::{RequestHandler, dispatch_request};
use crate::request::RequestContext;
use crate::response::error_to_response;

/// Configuration for the HTTP service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpServiceConfig {
    /// Ingestion limits.
    pub ingest: IngestConfig,
    /// Whether JSON bodies stay readable after ingestion.
    pub mode: IngestMode,
}

/// Hyper service wrapping a [`RequestHandler`].
#[derive(Debug)]
pub struct HttpService<H: RequestHandler> {
    handler: Arc<H>,
    config: Arc<HttpServiceConfig>,
    remote_addr: Option<SocketAddr>,
}

impl<H: RequestHandler> HttpService<H> {
    /// Create a service owning `handler`.
    #[must_use]
    pub fn new(handler: H, config: HttpServiceConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a service from a shared handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: HttpServiceConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
            remote_addr: None,
        }
    }

    /// A copy of this service bound to one connection's peer address.
    #[must_use]
    pub fn with_remote_addr(&self, peer: SocketAddr) -> Self {
        Self {
            remote_addr: Some(peer),
            ..self.clone()
        }
    }
}

impl<H: RequestHandler> Clone for HttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
            remote_addr: self.remote_addr,
        }
    }
}

impl<H, B> Service<http::Request<B>> for HttpService<H>
where
    H: RequestHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);
        let peer = self.remote_addr;
        let request_id = Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &config, peer, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &HttpServiceConfig,
    peer: Option<SocketAddr>,
    request_id: &str,
) -> http::Response<ResponseBody>
where
    H: RequestHandler,
    B: http_body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    let segments = handler.segments(&method, uri.path());
    let ctx = match RequestContext::from_request(req, segments, peer, config.mode, &config.ingest)
        .await
    {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to ingest request");
            return error_to_response(&err);
        }
    };

    dispatch_request(handler, ctx).await
}

fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-request-id").or_insert(hv);
    }
    headers.insert(http::header::SERVER, http::HeaderValue::from_static("reqkit"));

    response
}
