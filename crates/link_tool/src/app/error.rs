use std::io;
use std::path::PathBuf;

use prefab_link::graph::{GraphError, NodeId};
use prefab_link::sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ToolError {
    #[error("{0}")]
    Usage(String),
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write command output")]
    Output(#[source] io::Error),
    #[error("parse {what} json{}: {message}", at_path(.path))]
    Parse {
        what: &'static str,
        path: String,
        message: String,
    },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
    #[error("invalid scene hierarchy")]
    Graph(#[from] GraphError),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("node {0} does not exist in the scene")]
    UnknownNode(NodeId),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

fn at_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

impl ToolError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Deserializes `raw`, reporting the JSON path of the first failure.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    what: &'static str,
    raw: &str,
) -> Result<T, ToolError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        ToolError::Parse {
            what,
            path,
            message: error.into_inner().to_string(),
        }
    })
}
