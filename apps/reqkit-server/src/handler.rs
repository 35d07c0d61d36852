//! Catch-all demo handler.
//!
//! Reports whether the `test` parameter and the `test` header were sent,
//! stores an optional `upload` file, and echoes every parameter back inside a
//! success envelope.

use std::path::{Path, PathBuf};

use http::StatusCode;
use reqkit_http::{HandlerFuture, RequestContext, RequestHandler, Responder};
use tracing::{error, info, warn};

/// Demo handler storing uploads under a fixed directory.
#[derive(Debug, Clone)]
pub struct DemoHandler {
    upload_dir: PathBuf,
}

impl DemoHandler {
    /// Create a handler storing uploads under `upload_dir`.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }
}

impl RequestHandler for DemoHandler {
    fn handle(&self, ctx: RequestContext) -> HandlerFuture {
        let upload_dir = self.upload_dir.clone();
        Box::pin(async move {
            // File stores are blocking.
            match tokio::task::spawn_blocking(move || respond(&ctx, &upload_dir)).await {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "demo handler task failed");
                    let mut responder = Responder::new();
                    responder.set_http_status_code(StatusCode::INTERNAL_SERVER_ERROR);
                    responder.reply_failed("500", "INTERNAL_ERROR", "handler failed")
                }
            }
        })
    }
}

fn respond(ctx: &RequestContext, upload_dir: &Path) -> http::Response<reqkit_http::ResponseBody> {
    let param = if ctx.filled(&["test"]) {
        "filled"
    } else if ctx.has(&["test"]) {
        "detected"
    } else {
        "not detected"
    };
    let header = if ctx.header_filled(&["test"]) {
        "filled"
    } else if ctx.has_header(&["test"]) {
        "detected"
    } else {
        "not detected"
    };
    info!(
        method = %ctx.method(),
        client = ctx.client_ip(),
        param,
        header,
        "demo request"
    );

    let mut stored = None;
    if ctx.has_file(&["upload"]) {
        match ctx.get_file("upload") {
            Ok(mut file) => match file.store(upload_dir, "upload-*") {
                Ok(name) => stored = Some(name),
                Err(err) => {
                    error!(error = %err, "failed to store upload");
                    let mut responder = Responder::new();
                    responder.set_http_status_code(StatusCode::INTERNAL_SERVER_ERROR);
                    return responder.reply_failed("500", "STORE_FAILED", &err.to_string());
                }
            },
            Err(err) => {
                warn!(error = %err, "rejected upload field");
                let mut responder = Responder::new();
                responder.set_http_status_code(StatusCode::BAD_REQUEST);
                return responder.reply_failed("400", "INVALID_UPLOAD", &err.to_string());
            }
        }
    }

    let payload = serde_json::json!({
        "params": ctx.params(),
        "test_param": param,
        "test_header": header,
        "stored": stored,
    });
    Responder::new().reply_success_with("0000000", "SSSSSS", "Success", &payload)
}
