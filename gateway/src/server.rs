//! The route table, request dispatch, and the axum adapter.
//!
//! A request travels: raw request target → `+`-preserving URL decode →
//! parse → route lookup by query path and HTTP method → handler → JSON
//! serialization. Parse failures answer 400, unknown path or method 404,
//! everything else is the handler's choice.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use wql_core::ast::Expr;
use wql_core::Parser;

use crate::error::GatewayError;
use crate::handler::{Context, SourceHandlers};

/// Stand-in that carries literal `+` through percent-decoding.
const PLUS_SENTINEL: char = '\u{1}';

/// Percent-decodes a request target, preserving `+` as-is rather than as a
/// space: `+` → sentinel → unescape → sentinel → `+`.
pub(crate) fn decode_request_target(target: &str) -> Result<String, GatewayError> {
    let masked = target.replace('+', &PLUS_SENTINEL.to_string());
    let decoded = percent_encoding::percent_decode_str(&masked)
        .decode_utf8()
        .map_err(|err| GatewayError::Decode(err.to_string()))?;
    Ok(decoded.replace(PLUS_SENTINEL, "+"))
}

type ErrorHandler = Arc<dyn Fn(StatusCode, &str) -> Vec<u8> + Send + Sync>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// The façade. Routes are registered during setup; once serving begins the
/// table is read-only and shared across request tasks.
#[derive(Default)]
pub struct Server {
    json_result: bool,
    pretty_json: bool,
    error_handler: Option<ErrorHandler>,
    globals: HashMap<String, Expr>,
    sources: HashMap<String, SourceHandlers>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("json_result", &self.json_result)
            .field("pretty_json", &self.pretty_json)
            .field("has_error_handler", &self.error_handler.is_some())
            .field("globals", &self.globals)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Server {
    pub fn new() -> Self {
        Server::default()
    }

    /// Render error bodies as JSON instead of plain text.
    pub fn with_json_result(mut self) -> Self {
        self.json_result = true;
        self
    }

    /// Indent response bodies.
    pub fn with_pretty_json(mut self) -> Self {
        self.pretty_json = true;
        self
    }

    /// Placeholder identifiers substituted by the parser on every request.
    pub fn with_globals(mut self, globals: HashMap<String, Expr>) -> Self {
        self.globals = globals;
        self
    }

    /// Overrides the default error body. The hook receives the status and
    /// the error text and supplies the bytes to send; only consulted when
    /// JSON results are enabled.
    pub fn set_error_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(StatusCode, &str) -> Vec<u8> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Adds a source under a path. The path is matched against the parsed
    /// query path, so `/todos` and `todos` register the same route.
    pub fn route(
        mut self,
        path: &str,
        handlers: SourceHandlers,
    ) -> Result<Self, GatewayError> {
        let path = path.trim_start_matches('/').to_string();
        if self.sources.contains_key(&path) {
            return Err(GatewayError::Register(format!(
                "path {} is already registered",
                path
            )));
        }
        tracing::debug!("registered source at {}", path);
        self.sources.insert(path, handlers);
        Ok(self)
    }

    /// Handles one request. Exposed so the server can be embedded into an
    /// existing router; [`Server::into_router`] wires it up as a fallback.
    pub async fn respond(&self, method: Method, uri: Uri, headers: HeaderMap) -> Response {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        let src = match decode_request_target(target) {
            Ok(src) => src,
            Err(err) => {
                return self.error_response(StatusCode::BAD_REQUEST, &err.to_string());
            }
        };

        let mut parser = Parser::new().with_globals(self.globals.clone());
        let query = match parser.parse(&src) {
            Ok(query) => query,
            Err(err) => {
                tracing::warn!("parse failed for {}: {}", src, err);
                return self.error_response(StatusCode::BAD_REQUEST, &err.to_string());
            }
        };

        let not_found = format!("{} {}", method, query.path());
        let source_handlers = match self.sources.get(query.path()) {
            Some(source_handlers) => source_handlers,
            None => return self.error_response(StatusCode::NOT_FOUND, &not_found),
        };
        let handler = match source_handlers.handlers.get(&method) {
            Some(handler) => handler,
            None => return self.error_response(StatusCode::NOT_FOUND, &not_found),
        };

        let ctx = Context {
            query: query.with_source(Arc::clone(&source_handlers.source)),
            method,
            uri,
            headers,
        };
        match handler(ctx).await {
            Ok((status, data)) => {
                let body = if self.pretty_json {
                    serde_json::to_vec_pretty(&data)
                } else {
                    serde_json::to_vec(&data)
                };
                match body {
                    Ok(buf) => (
                        status,
                        [(header::CONTENT_TYPE, "application/json")],
                        buf,
                    )
                        .into_response(),
                    Err(err) => self.error_response(status, &err.to_string()),
                }
            }
            Err((status, err)) => self.error_response(status, &err.to_string()),
        }
    }

    fn error_response(&self, status: StatusCode, message: &str) -> Response {
        if !self.json_result {
            return (status, message.to_string()).into_response();
        }
        if let Some(hook) = &self.error_handler {
            return (status, hook(status, message)).into_response();
        }
        let body = ErrorBody { error: message };
        let buf = if self.pretty_json {
            serde_json::to_vec_pretty(&body)
        } else {
            serde_json::to_vec(&body)
        };
        let buf = buf.unwrap_or_else(|_| {
            status.canonical_reason().unwrap_or("error").as_bytes().to_vec()
        });
        (status, [(header::CONTENT_TYPE, "application/json")], buf).into_response()
    }

    /// Wraps the server into an axum router: every request falls through to
    /// [`Server::respond`], with request tracing attached.
    pub fn into_router(self) -> Router {
        let server = Arc::new(self);
        Router::new()
            .fallback(
                move |method: Method, uri: Uri, headers: HeaderMap| {
                    let server = Arc::clone(&server);
                    async move { server.respond(method, uri, headers).await }
                },
            )
            .layer(TraceLayer::new_for_http())
    }

    /// Binds `addr` and serves until the task is cancelled.
    pub async fn serve(self, addr: &str) -> Result<(), GatewayError> {
        let router = self.into_router();
        tracing::info!("wql gateway listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }
}
