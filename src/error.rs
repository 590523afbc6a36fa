use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Raised before anything is sent: the form is not eligible for submission.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("paste mode requires non-empty log text")]
    EmptyLog,
    #[error("file mode requires a selected log file")]
    NoFile,
    #[error("an analysis request is already in flight")]
    InFlight,
    #[error("cannot read log file {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The backend response did not match the analysis result schema.
#[derive(Debug, Error)]
#[error("analysis result does not match schema: {0}")]
pub struct SchemaError(#[from] pub serde_json::Error);

/// Failure of a request against the parser service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure, or a non-2xx response without a structured `detail`.
    #[error("{0}")]
    Transport(String),
    /// Non-2xx response carrying a structured `detail` message.
    #[error("{detail} (status {status})")]
    Api { status: u16, detail: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ClientError {
    /// The single banner string shown for a failed submission.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Transport(message) => message.clone(),
            ClientError::Api { detail, .. } => detail.clone(),
            ClientError::Schema(err) => err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Export failures. Never folded into the analysis error banner.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export request failed: {}", .0.display_message())]
    Request(#[from] ClientError),
    #[error("export form is not valid: {0}")]
    Form(#[from] ValidationError),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
