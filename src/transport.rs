// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::config::ClientConfig;
use super::error::*;

/// HTTP verbs used by the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Credentials attached to a single request.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Basic {
        user: &'a str,
        password: &'a SecretString,
    },
    /// `Authorization: Session <token>`
    Session(&'a SecretString),
}

impl fmt::Debug for Auth<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Auth::None => write!(f, "None"),
            Auth::Basic { user, .. } => write!(f, "Basic({})", user),
            Auth::Session(_) => write!(f, "Session"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a Url,
    pub auth: Auth<'a>,
    pub body: Option<&'a Value>,
}

/// Reply body, decoded according to its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    pub fn decode(content_type: &str, bytes: Vec<u8>) -> Result<Body> {
        if bytes.is_empty() {
            return Ok(Body::Empty);
        }
        let ctype = content_type.to_lowercase();
        if ctype.contains("json") {
            Ok(Body::Json(serde_json::from_slice(&bytes)?))
        } else if ctype.starts_with("text/") {
            Ok(Body::Text(String::from_utf8(bytes).map_err(|e| {
                ArrayError::TransportSerialization(format!(
                    "Reply is not valid UTF-8 text: {}",
                    e
                ))
            })?))
        } else {
            Ok(Body::Binary(bytes))
        }
    }

    /// Like [`decode`][1], but a body that does not match its content type
    /// is kept as text, or raw bytes, instead of failing.
    ///
    /// [1]: #method.decode
    pub fn decode_lossy(content_type: &str, bytes: Vec<u8>) -> Body {
        if bytes.is_empty() {
            return Body::Empty;
        }
        if content_type.to_lowercase().contains("json") {
            if let Ok(v) = serde_json::from_slice(&bytes) {
                return Body::Json(v);
            }
        }
        match String::from_utf8(bytes) {
            Ok(s) => Body::Text(s),
            Err(e) => Body::Binary(e.into_bytes()),
        }
    }

    /// Body rendered for error messages.
    pub fn to_text(&self) -> String {
        match *self {
            Body::Empty => String::new(),
            Body::Json(ref v) => v.to_string(),
            Body::Text(ref s) => s.clone(),
            Body::Binary(ref b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Body,
}

impl Response {
    pub fn new(status: u16, body: Body) -> Response {
        Response { status, body }
    }

    /// Response from raw reply parts. Only 2xx bodies must match their
    /// content type; error bodies (e.g. a proxy's HTML 503 page labelled
    /// as JSON) are kept as text so the status still drives retries.
    pub fn from_parts(status: u16, content_type: &str, bytes: Vec<u8>) -> Result<Response> {
        let body = if (200..300).contains(&status) {
            Body::decode(content_type, bytes)?
        } else {
            Body::decode_lossy(content_type, bytes)
        };
        Ok(Response { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx reply into the matching [`ArrayError`][1].
    ///
    /// [1]: enum.ArrayError.html
    pub fn error_for_status(self) -> Result<Response> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(From::from(HttpFailure::new(self.status, &self.body.to_text())))
        }
    }

    /// JSON body, `Value::Null` for an empty reply.
    pub fn json(&self) -> Result<&Value> {
        static NULL: Value = Value::Null;
        match self.body {
            Body::Json(ref v) => Ok(v),
            Body::Empty => Ok(&NULL),
            _ => Err(ArrayError::TransportSerialization(format!(
                "Expecting JSON reply, got: {}",
                self.body.to_text()
            ))),
        }
    }
}

/// One HTTP round trip. Implemented over HTTPS by [`HttpTransport`][1];
/// tests drive the crate through their own implementation.
///
/// [1]: struct.HttpTransport.html
pub trait Transport: Send + Sync {
    fn send(&self, req: &Request) -> Result<Response>;
}

/// Blocking HTTPS transport.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<HttpTransport> {
        let http = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(!cfg.verify_tls)
            .timeout(cfg.timeout)
            .build()?;
        Ok(HttpTransport { http })
    }
}

impl Transport for HttpTransport {
    fn send(&self, req: &Request) -> Result<Response> {
        let mut rb = self
            .http
            .request(req.method.into(), req.url.clone())
            .header(ACCEPT, "application/json");
        rb = match req.auth {
            Auth::None => rb,
            Auth::Basic { user, password } => {
                rb.basic_auth(user, Some(password.expose_secret()))
            }
            Auth::Session(token) => rb.header(
                AUTHORIZATION,
                format!("Session {}", token.expose_secret()),
            ),
        };
        if let Some(body) = req.body {
            rb = rb.json(body);
        }

        debug!(method = %req.method, url = %req.url, auth = ?req.auth, "sending request");
        let reply = rb.send()?;
        let status = reply.status().as_u16();
        let ctype = reply
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = reply.bytes()?;
        debug!(method = %req.method, url = %req.url, status, "got reply");
        Response::from_parts(status, &ctype, bytes.to_vec())
    }
}
