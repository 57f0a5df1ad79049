//! The parsed request handed to handlers.

use std::collections::HashMap;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::head::{HttpVersion, Method, parse_head};

/// An inbound HTTP request: method, target, headers and the complete body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters parsed from the target
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a request with an empty body. Query parameters are split out of
    /// `path` eagerly.
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let query_params = path
            .split_once('?')
            .map(|(_, query)| {
                query
                    .split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((k, v)) => (k.to_string(), v.to_string()),
                        None => (pair.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method,
            path,
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Look up a header, ignoring ASCII case in the name.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v))
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The target without its query string.
    pub fn path_only(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(path, _)| path)
    }

    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// The value of the named cookie from the `Cookie` header, with any
    /// surrounding double quotes removed.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.get_header("Cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"').to_string())
    }

    /// The declared body length. A missing header means no body.
    pub fn content_length(&self) -> Result<Option<usize>, Error> {
        if let Some(encoding) = self.get_header("Transfer-Encoding") {
            if !encoding.eq_ignore_ascii_case("identity") {
                return Err(Error::UnsupportedTransferEncoding(encoding.clone()));
            }
        }
        match self.get_header("Content-Length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| Error::InvalidContentLength(value.clone())),
            None => Ok(None),
        }
    }

    /// Whether the body is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// Deserialize the body as JSON. The request must declare
    /// `Content-Type: application/json`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Parse a request that is already completely in memory.
///
/// The body is taken from the bytes after the head, truncated to
/// `Content-Length`.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let Some((mut request, consumed)) = parse_head(input)? else {
        return match input.split(|b| *b == b'\n').next() {
            Some(line) if !line.trim_ascii().is_empty() => Err(Error::MalformedRequestLine(
                String::from_utf8_lossy(line.trim_ascii()).into_owned(),
            )),
            _ => Err(Error::EmptyRequest),
        };
    };

    let rest = &input[consumed..];
    let length = request.content_length()?.unwrap_or(0).min(rest.len());
    request.body = rest[..length].to_vec();
    Ok(request)
}
