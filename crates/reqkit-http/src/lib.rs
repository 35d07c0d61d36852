//! HTTP layer for reqkit.
//!
//! Turns an inbound request into a [`RequestContext`]: one parameter store
//! fed by the query string and a multipart, URL-encoded or JSON body, plus the
//! uploaded files, path segments and request head. Handlers read it through
//! typed accessors and answer with a [`Responder`] that writes the standard
//! JSON envelope.
//!
//! - **Ingestion**: [`ingest::normalize`] and [`multipart`]
//! - **Access**: [`RequestContext`], [`FileRegistry`], [`UploadedFile`]
//! - **Responses**: [`Responder`], [`ResponseBody`]
//! - **Service**: [`HttpService`] over a [`RequestHandler`]

pub mod body;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod files;
pub mod ingest;
pub mod multipart;
pub mod request;
pub mod response;
pub mod service;

pub use body::ResponseBody;
pub use client::ClientAddr;
pub use config::{IngestConfig, IngestMode};
pub use dispatch::{HandlerFuture, NotImplementedHandler, RequestHandler};
pub use files::{FileRegistry, UploadedFile};
pub use request::{RequestContext, Segments};
pub use response::{Responder, error_to_response};
pub use service::{HttpService, HttpServiceConfig};
