//! URL path unescaping and the path-parameter extractor.
//!
//! `Legacy` decodes the whole path before routing, so `%2F` splits segments.
//! Every other mode routes on the raw path and decodes only the captured
//! parameters, keeping the escapes the mode reserves.

use std::borrow::Cow;

use axum::extract::{FromRequestParts, MatchedPath, Request};
use axum::http::request::Parts;
use axum::http::uri::{PathAndQuery, Uri};
use serde::{Deserialize, Serialize};
use tonic::Status;

use crate::runtime::error::GatewayError;

/// RFC 6570 reserved characters.
const RESERVED: &[u8] = b":/?#[]@!$&'()*+,;=";

/// Which percent-encoded characters are decoded, and when.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnescapingMode {
    /// Decode the path before routing; an escaped `/` separates segments.
    #[default]
    Legacy,
    /// Route raw; parameters keep escaped reserved characters.
    AllExceptReserved,
    /// Route raw; parameters keep `%2F`.
    AllExceptSlash,
    /// Route raw; parameters are fully decoded.
    AllCharacters,
}

impl UnescapingMode {
    fn decodes_param(self, byte: u8) -> bool {
        match self {
            UnescapingMode::Legacy | UnescapingMode::AllCharacters => true,
            UnescapingMode::AllExceptReserved => !RESERVED.contains(&byte),
            UnescapingMode::AllExceptSlash => byte != b'/',
        }
    }
}

/// Bytes that may appear unescaped in a URI path.
fn literal(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@/".contains(&byte)
}

fn hex(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

/// Decode the escapes of `input` accepted by `decodes`. Malformed escapes are
/// copied through.
fn decode(input: &str, decodes: impl Fn(u8) -> bool) -> Cow<'_, [u8]> {
    if !input.contains('%') {
        return Cow::Borrowed(input.as_bytes());
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                let decoded = hi << 4 | lo;
                if decodes(decoded) {
                    out.push(decoded);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    Cow::Owned(out)
}

/// The path routing sees under `mode`.
///
/// Only `Legacy` rewrites it. Escapes that cannot appear literally in a path
/// (space, `?`, `#`, `%`, non-ASCII) stay encoded and are decoded later by
/// [`PathParams`].
pub fn unescape_path(path: &str, mode: UnescapingMode) -> Cow<'_, str> {
    if mode != UnescapingMode::Legacy {
        return Cow::Borrowed(path);
    }
    match decode(path, literal) {
        Cow::Borrowed(_) => Cow::Borrowed(path),
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) if decoded != path => Cow::Owned(decoded),
            _ => Cow::Borrowed(path),
        },
    }
}

/// Decode one captured path parameter under `mode`.
pub fn unescape_param(raw: &str, mode: UnescapingMode) -> Result<String, std::string::FromUtf8Error> {
    match decode(raw, |byte| mode.decodes_param(byte)) {
        Cow::Borrowed(_) => Ok(raw.to_string()),
        Cow::Owned(bytes) => String::from_utf8(bytes),
    }
}

/// Tag the request with `mode` and rewrite its path for routing.
pub(crate) fn unescape_request(mut request: Request, mode: UnescapingMode) -> Request {
    request.extensions_mut().insert(mode);

    let decoded = match unescape_path(request.uri().path(), mode) {
        Cow::Owned(decoded) => decoded,
        Cow::Borrowed(_) => return request,
    };

    let path_and_query = match request.uri().query() {
        Some(query) => format!("{decoded}?{query}"),
        None => decoded,
    };
    let mut parts = request.uri().clone().into_parts();
    let Ok(path_and_query) = PathAndQuery::try_from(path_and_query) else {
        return request;
    };
    parts.path_and_query = Some(path_and_query);
    if let Ok(uri) = Uri::from_parts(parts) {
        *request.uri_mut() = uri;
    }
    request
}

/// Captured path parameters, decoded by the mux's [`UnescapingMode`].
///
/// Use this instead of `axum::extract::Path`, which always decodes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Match `path` against a route `template` (`{name}` and `{*rest}` captures).
    pub fn capture(template: &str, path: &str, mode: UnescapingMode) -> Result<Self, GatewayError> {
        let mut params = Vec::new();
        let mut segments = path.trim_start_matches('/').split('/');
        for part in template.trim_start_matches('/').split('/') {
            let capture = part.strip_prefix('{').and_then(|part| part.strip_suffix('}'));
            let (name, raw) = match capture {
                Some(name) if name.starts_with('*') => {
                    let rest: Vec<&str> = segments.by_ref().collect();
                    (&name[1..], rest.join("/"))
                }
                Some(name) => match segments.next() {
                    Some(segment) => (name, segment.to_string()),
                    None => return Err(mismatch(template, path)),
                },
                None => {
                    if segments.next() != Some(part) {
                        return Err(mismatch(template, path));
                    }
                    continue;
                }
            };
            let value = unescape_param(&raw, mode).map_err(|_| {
                GatewayError(Status::invalid_argument(format!("path parameter `{name}` is not valid UTF-8")))
            })?;
            params.push((name.to_string(), value));
        }
        Ok(Self(params))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn mismatch(template: &str, path: &str) -> GatewayError {
    GatewayError(Status::internal(format!("path `{path}` does not match route `{template}`")))
}

impl<S> FromRequestParts<S> for PathParams
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(template) = parts.extensions.get::<MatchedPath>() else {
            return Err(GatewayError(Status::internal("path parameters outside a matched route")));
        };
        let mode = parts.extensions.get::<UnescapingMode>().copied().unwrap_or_default();
        Self::capture(template.as_str(), parts.uri.path(), mode)
    }
}
