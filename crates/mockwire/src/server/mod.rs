//! HTTP front end serving mocks.

mod classify;
mod dispatcher;
mod listener;
mod response;

pub use classify::{classify, Classification};
pub use dispatcher::{DispatchSettings, InboundRequest, RequestDispatcher};
pub use listener::{MockServer, ServerError, ServerHandle};

use crate::matching::MatchError;
use thiserror::Error;

/// Errors while answering a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unsupported content type: {0}")]
    Classification(String),
    #[error("Cannot determine SOAP action: {0}")]
    SoapAction(MatchError),
    #[error(transparent)]
    Match(#[from] MatchError),
    /// The connection is closed without a response
    #[error("Response withheld")]
    Withheld,
}
