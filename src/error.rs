use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskgenError>;

/// Any failure that aborts the translation of a single module.
#[derive(Debug, Error)]
pub enum TaskgenError {
    #[error(transparent)]
    Acquisition(#[from] SchemaAcquisitionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
}

/// The schema document could not be obtained at all.
#[derive(Debug, Error)]
pub enum SchemaAcquisitionError {
    #[error("failed to launch `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read schema file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The schema text was obtained but is not well-formed XML.
#[derive(Debug, Error)]
#[error("failed to parse schema for module `{module}`")]
pub struct ParseError {
    pub module: String,
    /// The (possibly repaired) text that was handed to the parser.
    pub payload: String,
    #[source]
    pub source: xmltree::ParseError,
}

/// The schema parsed but does not describe something we can translate.
#[derive(Debug, Error)]
pub enum SchemaValidationError {
    #[error(
        "parameter `{parameter}` of type '{node_type}' requires a 'channel' field \
         (each element of type 'file', 'directory', 'image', 'geometry', 'transform' or 'table' does)"
    )]
    MissingChannel { parameter: String, node_type: String },
    #[error("parameter `{parameter}` has channel '{channel}', expected one of ['input', 'output']")]
    UnknownChannel { parameter: String, channel: String },
    #[error("unsupported parameter type '{0}'")]
    UnknownType(String),
    #[error("required element <{0}> is missing")]
    MissingElement(&'static str),
    #[error("parameter `{parameter}` has invalid index '{index}'")]
    InvalidIndex { parameter: String, index: String },
}
