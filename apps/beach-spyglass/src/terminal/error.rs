use crate::session::SessionError;
use crate::telemetry::logging::InitError;
use crate::transport::TransportError;
use crate::view::ViewError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
    #[error("invalid endpoint configuration: {0}")]
    Endpoint(#[from] TransportError),
    #[error("unable to open terminal surface: {0}")]
    Surface(#[from] ViewError),
    #[error("{0}")]
    Session(#[from] SessionError),
}
