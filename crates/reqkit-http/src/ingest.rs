//! Request ingestion.
//!
//! Builds the parameter store and the file registry from a collected request.
//! The query string is always read. Body decoding depends on the method and
//! on the declared `Content-Type`:
//!
//! | content type | GET | POST / PUT / PATCH / DELETE | other methods |
//! |---|---|---|---|
//! | `multipart/form-data` | ignored | fields scanned, files registered | ignored |
//! | `application/x-www-form-urlencoded` | ignored | fields scanned | ignored |
//! | `application/json` | merged | merged | ignored |
//! | anything else | ignored | ignored | ignored |
//!
//! Body keys overwrite query keys of the same name.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use reqkit_model::{BodyKind, ParamStore, RequestError, scan};
use tracing::{debug, warn};

use crate::config::{IngestConfig, IngestMode};
use crate::files::{FilePart, FileRegistry};
use crate::multipart::{extract_boundary, parse_multipart};

/// Result of ingesting one request.
#[derive(Debug, Default)]
pub struct Ingested {
    /// Unified parameters.
    pub params: ParamStore,
    /// Uploaded files.
    pub files: FileRegistry,
    /// Raw body, when ingestion left it readable.
    pub body: Option<Bytes>,
}

/// Collect a request body into one buffer, refusing bodies over `limit` bytes.
///
/// # Errors
///
/// [`RequestError::BodyTooLarge`] when the limit is exceeded and
/// [`RequestError::BodyRead`] when the transport fails.
pub async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, RequestError>
where
    B: http_body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(RequestError::BodyTooLarge { limit })
        }
        Err(err) => Err(RequestError::BodyRead(err.to_string())),
    }
}

/// Normalize a collected request into parameters, files and the leftover body.
///
/// # Errors
///
/// [`RequestError::Decode`] when the body does not match its content type.
pub fn normalize(
    method: &Method,
    headers: &HeaderMap,
    uri: &Uri,
    body: Bytes,
    mode: IngestMode,
    config: &IngestConfig,
) -> Result<Ingested, RequestError> {
    let mut ingested = Ingested {
        params: parse_query(uri.query().unwrap_or_default()),
        ..Ingested::default()
    };

    if !carries_body(method) {
        debug!(%method, "method does not carry parameters, query only");
        ingested.body = Some(body);
        return Ok(ingested);
    }

    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let is_get = *method == Method::GET;

    if content_type.contains(BodyKind::Multipart.media_type()) {
        if is_get {
            debug!("ignoring multipart body on GET");
            ingested.body = Some(body);
            return Ok(ingested);
        }
        ingest_multipart(&mut ingested, content_type, &body, config)?;
    } else if content_type.contains(BodyKind::Form.media_type()) {
        if is_get {
            debug!("ignoring form body on GET");
            ingested.body = Some(body);
            return Ok(ingested);
        }
        ingested.params.extend(parse_form(&body)?);
    } else if content_type.contains(BodyKind::Json.media_type()) {
        ingested.params.extend(parse_json(&body)?);
        if mode == IngestMode::Touch {
            ingested.body = Some(body);
        }
    } else {
        debug!(content_type, "no decoder for content type, query only");
        ingested.body = Some(body);
    }

    debug!(
        %method,
        params = ingested.params.len(),
        files = ingested.files.len(),
        body_retained = ingested.body.is_some(),
        "ingested request"
    );
    Ok(ingested)
}

fn carries_body(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ]
    .contains(method)
}

/// Group `key=value` pairs per key, keeping arrival order within a key.
fn group_pairs<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in pairs {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    grouped
}

fn scan_grouped(grouped: HashMap<String, Vec<String>>) -> ParamStore {
    grouped
        .into_iter()
        .map(|(key, values)| {
            let value = scan(&values);
            (key, value)
        })
        .collect()
}

fn parse_query(query: &str) -> ParamStore {
    scan_grouped(group_pairs(form_urlencoded::parse(query.as_bytes())))
}

fn parse_form(body: &[u8]) -> Result<ParamStore, RequestError> {
    if std::str::from_utf8(body).is_err() {
        warn!("form body is not valid UTF-8");
        return Err(RequestError::decode(BodyKind::Form, "body is not valid UTF-8"));
    }
    for component in body.split(|b| matches!(b, b'&' | b'=')) {
        check_form_component(component).map_err(|reason| {
            warn!(reason, "rejected form body");
            RequestError::decode(BodyKind::Form, reason)
        })?;
    }
    Ok(scan_grouped(group_pairs(form_urlencoded::parse(body))))
}

/// Every `%` must start a two-digit hex escape and the decoded bytes must be
/// UTF-8. `form_urlencoded` would otherwise pass bad escapes through verbatim
/// and replace invalid sequences with U+FFFD.
fn check_form_component(component: &[u8]) -> Result<(), &'static str> {
    let mut decoded = Vec::with_capacity(component.len());
    let mut i = 0;
    while i < component.len() {
        if component[i] == b'%' {
            let byte = component
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or("invalid percent escape")?;
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(component[i]);
            i += 1;
        }
    }
    std::str::from_utf8(&decoded)
        .map(|_| ())
        .map_err(|_| "escaped bytes are not valid UTF-8")
}

fn parse_json(body: &[u8]) -> Result<ParamStore, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParamStore::new());
    }
    serde_json::from_slice::<ParamStore>(body).map_err(|e| {
        warn!(error = %e, "rejected JSON body");
        RequestError::decode(BodyKind::Json, e.to_string())
    })
}

fn ingest_multipart(
    ingested: &mut Ingested,
    content_type: &str,
    body: &Bytes,
    config: &IngestConfig,
) -> Result<(), RequestError> {
    let boundary = extract_boundary(content_type)?;
    let parts = parse_multipart(body, &boundary).inspect_err(|e| {
        warn!(error = %e, "rejected multipart body");
    })?;

    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut files: HashMap<String, Vec<FilePart>> = HashMap::new();
    for part in parts {
        if part.is_file() {
            let name = part.name.clone();
            let file = FilePart::from_part(part, config.max_memory_size).map_err(|e| {
                RequestError::BodyRead(format!("failed to buffer upload {name}: {e}"))
            })?;
            files.entry(name).or_default().push(file);
        } else {
            let text = String::from_utf8_lossy(&part.data).into_owned();
            fields.entry(part.name).or_default().push(text);
        }
    }

    ingested.params.extend(scan_grouped(fields));
    for (name, group) in files {
        ingested.files.insert(name, group);
    }
    Ok(())
}
