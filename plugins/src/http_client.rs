//! `RequestAdapter` over reqwest, with classified transport errors.

use std::{error::Error as StdError, fmt, time::Duration};

use async_trait::async_trait;
use vault_env_core::api::{HttpMethod, HttpRequest, HttpResponse, RequestAdapter};

const BODY_PREVIEW_LIMIT: usize = 512;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl RequestErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct RequestError {
    kind: RequestErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl RequestError {
    pub fn kind(&self) -> RequestErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            RequestErrorKind::Timeout
        } else if err.is_connect() {
            RequestErrorKind::Connect
        } else if err.is_request() {
            RequestErrorKind::Request
        } else if err.is_body() {
            RequestErrorKind::Body
        } else if err.is_decode() {
            RequestErrorKind::Decode
        } else {
            RequestErrorKind::Unknown
        };
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        RequestError {
            kind,
            status,
            url: Some(url),
            message,
            source: Some(anyhow::Error::new(err)),
        }
    }

    /// Error for callers that require a 2xx reply.
    pub fn status_error(status: u16, url: impl Into<String>, body: &str) -> Self {
        RequestError {
            kind: RequestErrorKind::Status,
            status: Some(status),
            url: Some(url.into()),
            message: preview_body(body),
            source: None,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

pub fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= BODY_PREVIEW_LIMIT {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

#[derive(Clone)]
pub struct ReqwestRequestAdapter {
    http: reqwest::Client,
}

impl ReqwestRequestAdapter {
    /// `default_timeout_ms` applies to requests that carry no timeout of their own.
    pub fn new(default_timeout_ms: Option<u64>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(
                default_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            ))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RequestAdapter for ReqwestRequestAdapter {
    async fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let url = request.url.clone();
        tracing::debug!(
            target: "vault_env.http",
            stage = "http.send.in",
            method = ?request.method,
            url = %url
        );

        let mut req = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        };
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|err| RequestError::from_reqwest(err, url.clone()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|err| RequestError::from_reqwest(err, url.clone()))?;

        if !(200..300).contains(&status) {
            tracing::debug!(
                target: "vault_env.http",
                stage = "http.send.status",
                url = %url,
                status = status,
                body = %preview_body(&body)
            );
        }
        tracing::debug!(
            target: "vault_env.http",
            stage = "http.send.out",
            status = status
        );
        Ok(HttpResponse { status, body })
    }
}
