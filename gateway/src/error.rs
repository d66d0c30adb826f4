//! Gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// A path/source pair the route table refuses.
    #[error("unable to register source: {0}")]
    Register(String),

    /// A request target that does not survive URL decoding.
    #[error("bad request target: {0}")]
    Decode(String),

    /// Listener and serve failures.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
