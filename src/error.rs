use std::io;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node answered with HTTP {0}")]
    HttpStatus(StatusCode),

    #[error("rpc error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("batch response has no entry for request id {id}")]
    MissingResponse { id: u64 },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("malformed block number {value:?}")]
    Decode { value: String },
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("cannot prepare chart output: {0}")]
    Io(#[from] io::Error),

    #[error("cannot render chart: {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("cannot write report: {0}")]
    Report(#[from] io::Error),

    #[error("sample loop has already stopped")]
    AlreadyStopped,
}
