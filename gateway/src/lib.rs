//! HTTP façade for wql.
//!
//! Registers [`wql_core::Source`] schemas under paths, parses each incoming
//! request target as a wql query, and hands the source-bound query to the
//! handler registered for the request method:
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::http::StatusCode;
//! use serde_json::json;
//! use wql_core::{Col, Cols, Datatype, Source};
//! use wql_gateway::{Context, Server, SourceHandlers};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let todos = Arc::new(Source::new(
//!         Cols::new().with_col(Col::new(Datatype::Bool, "done", "done", false)),
//!     ));
//!     let handlers = SourceHandlers::new(todos).get(|ctx: Context| async move {
//!         let sql = ctx.query.compile("todos")
//!             .map_err(|e| (StatusCode::BAD_REQUEST, e.into()))?;
//!         // …run sql, return rows…
//!         Ok((StatusCode::OK, json!({ "sql": sql })))
//!     });
//!     Server::new()
//!         .with_json_result()
//!         .route("/todos", handlers)?
//!         .serve("0.0.0.0:8080")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handler;
pub mod server;

pub use error::GatewayError;
pub use handler::{Context, HandlerResult, SourceHandlers};
pub use server::Server;
