//! Multipart form-data parser.
//!
//! Splits an already-collected `multipart/form-data` body into its parts. Each
//! part keeps its field name, optional file name, optional content type, and a
//! zero-copy slice of the body. Grouping parts into parameters and files is
//! done by the ingestion layer.

use bytes::Bytes;
use reqkit_model::{BodyKind, RequestError};

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    /// Value of the `name` parameter of `Content-Disposition`.
    pub name: String,
    /// Value of the `filename` parameter, present for file parts.
    pub filename: Option<String>,
    /// The part's own `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Part payload.
    pub data: Bytes,
}

impl MultipartPart {
    /// Whether the part is a file upload rather than a plain field.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

fn malformed(message: impl Into<String>) -> RequestError {
    RequestError::decode(BodyKind::Multipart, message)
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
///
/// # Errors
///
/// Returns a decode error if the boundary parameter is missing or empty.
pub fn extract_boundary(content_type: &str) -> Result<String, RequestError> {
    for param in split_params(content_type).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = unquote(value.trim());
            if boundary.is_empty() {
                return Err(malformed("empty boundary in Content-Type"));
            }
            return Ok(boundary);
        }
    }

    Err(malformed("missing boundary in Content-Type"))
}

/// Parse a multipart body into its named parts.
///
/// Parts without a `Content-Disposition` name are skipped.
///
/// # Errors
///
/// Returns a decode error if the opening or closing delimiter is missing or a
/// part has no header terminator.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<Vec<MultipartPart>, RequestError> {
    let delimiter = format!("--{boundary}");
    let raw_parts = split_multipart_parts(body, delimiter.as_bytes())?;

    let mut parts = Vec::with_capacity(raw_parts.len());
    for raw in raw_parts {
        let (headers, data) = split_headers_body(raw)?;
        let disposition = parse_content_disposition(headers);
        let Some(name) = disposition.name else {
            continue;
        };
        parts.push(MultipartPart {
            name,
            filename: disposition.filename,
            content_type: parse_part_content_type(headers),
            data: body.slice_ref(data),
        });
    }

    Ok(parts)
}

/// Split the body into raw parts (headers + payload) between delimiters.
fn split_multipart_parts<'a>(
    body: &'a [u8],
    delimiter: &[u8],
) -> Result<Vec<&'a [u8]>, RequestError> {
    let mut parts = Vec::new();

    // Skip the preamble (everything before the first delimiter).
    let Some(start) = find_bytes(body, delimiter) else {
        return Err(malformed("missing opening boundary"));
    };
    let mut remaining = &body[start + delimiter.len()..];

    // Inner delimiters are always preceded by CRLF.
    let mut inner = Vec::with_capacity(delimiter.len() + 2);
    inner.extend_from_slice(b"\r\n");
    inner.extend_from_slice(delimiter);

    loop {
        if remaining.starts_with(b"--") {
            return Ok(parts);
        }
        remaining = skip_crlf(remaining);

        let Some(pos) = find_bytes(remaining, &inner) else {
            return Err(malformed("missing closing boundary"));
        };
        parts.push(&remaining[..pos]);
        remaining = &remaining[pos + inner.len()..];
    }
}

/// Split a part into headers section and payload at the first blank line.
fn split_headers_body(part: &[u8]) -> Result<(&[u8], &[u8]), RequestError> {
    // A part with no headers starts directly with the blank line.
    if let Some(data) = part.strip_prefix(b"\r\n") {
        let no_headers: &[u8] = &[];
        return Ok((no_headers, data));
    }
    let separator = b"\r\n\r\n";
    find_bytes(part, separator)
        .map(|pos| (&part[..pos], &part[pos + separator.len()..]))
        .ok_or_else(|| malformed("part is missing its header terminator"))
}

/// Parsed Content-Disposition header fields.
struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let mut disposition = ContentDisposition {
        name: None,
        filename: None,
    };

    let Some(value) = header_value(headers, "content-disposition") else {
        return disposition;
    };

    for param in split_params(&value).into_iter().skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            disposition.name = Some(unquote(raw.trim()));
        } else if key.eq_ignore_ascii_case("filename") {
            disposition.filename = Some(unquote(raw.trim()));
        }
    }

    disposition
}

fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    header_value(headers, "content-type").filter(|v| !v.is_empty())
}

/// Find a header by case-insensitive name in a raw headers section.
fn header_value(headers: &[u8], name: &str) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_owned())
    })
}

/// Split a header value on `;`, ignoring separators inside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_owned()
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Skip leading \r\n.
fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}
