//! Handler trait and dispatch.

use std::future::Future;
use std::pin::Pin;

use http::Method;

use crate::body::ResponseBody;
use crate::request::{RequestContext, Segments};
use crate::response::Responder;

/// Boxed future returned by [`RequestHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<ResponseBody>> + Send>>;

/// Application logic behind the HTTP service.
///
/// The service resolves path segments through [`segments`](Self::segments),
/// ingests the request into a [`RequestContext`], and hands it to
/// [`handle`](Self::handle). Handlers answer through a [`Responder`].
pub trait RequestHandler: Send + Sync + 'static {
    /// Named path segments for a request. Routing lives outside reqkit, so
    /// the default resolves none.
    fn segments(&self, _method: &Method, _path: &str) -> Segments {
        Segments::new()
    }

    /// Produce the response for one request.
    fn handle(&self, ctx: RequestContext) -> HandlerFuture;
}

/// Hand an ingested request to the handler.
pub async fn dispatch_request<H: RequestHandler>(
    handler: &H,
    ctx: RequestContext,
) -> http::Response<ResponseBody> {
    tracing::debug!(
        method = %ctx.method(),
        path = ctx.path(),
        params = ctx.params().len(),
        "dispatching request"
    );
    handler.handle(ctx).await
}

/// Handler that answers every request with a 501 failure envelope.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl RequestHandler for NotImplementedHandler {
    fn handle(&self, _ctx: RequestContext) -> HandlerFuture {
        Box::pin(async move {
            let mut responder = Responder::new();
            responder.set_http_status_code(http::StatusCode::NOT_IMPLEMENTED);
            responder.reply_failed("501", "NOT_IMPLEMENTED", "no handler installed")
        })
    }
}
