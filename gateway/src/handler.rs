//! Handler registration and the per-request context.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use wql_core::{Query, Source};

/// What a source handler receives: the parsed query, already bound to the
/// source registered for its path, plus the raw request coordinates.
#[derive(Debug)]
pub struct Context {
    pub query: Query,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// A handler resolves to a status plus a JSON-serializable body, or a
/// status plus an error rendered through the server's error formatting.
pub type HandlerResult =
    Result<(StatusCode, serde_json::Value), (StatusCode, anyhow::Error)>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

pub(crate) type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync>;

/// A routable source and its per-method handlers. Built once during setup,
/// then read-only: the schema is shared via `Arc` across requests.
pub struct SourceHandlers {
    pub(crate) source: Arc<Source>,
    pub(crate) handlers: HashMap<Method, Handler>,
}

impl SourceHandlers {
    pub fn new(source: Arc<Source>) -> Self {
        SourceHandlers {
            source,
            handlers: HashMap::new(),
        }
    }

    fn register<H, F>(mut self, method: Method, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers
            .insert(method, Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    pub fn get<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::GET, handler)
    }

    pub fn head<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::HEAD, handler)
    }

    pub fn post<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::POST, handler)
    }

    pub fn put<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::PUT, handler)
    }

    pub fn patch<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::PATCH, handler)
    }

    pub fn delete<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::DELETE, handler)
    }

    pub fn connect<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::CONNECT, handler)
    }

    pub fn options<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::OPTIONS, handler)
    }

    pub fn trace<H, F>(self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(Method::TRACE, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wql_core::{Cols, Source};

    #[test]
    fn test_registration_is_per_method() {
        let handlers = SourceHandlers::new(Arc::new(Source::new(Cols::new())))
            .get(|_ctx| async { Ok((StatusCode::OK, serde_json::Value::Null)) })
            .delete(|_ctx| async { Ok((StatusCode::NO_CONTENT, serde_json::Value::Null)) });
        assert!(handlers.handlers.contains_key(&Method::GET));
        assert!(handlers.handlers.contains_key(&Method::DELETE));
        assert!(!handlers.handlers.contains_key(&Method::POST));
    }
}
