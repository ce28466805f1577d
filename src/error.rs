//! Error kinds, matching spec.md §7 one-to-one.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("application root {0} does not exist")]
    RootNotFound(PathBuf),

    #[error("package selector {selector:?} matched no files under {root}")]
    NoFilesMatched { root: PathBuf, selector: String },

    #[error("failed to parse {path}: {source}")]
    ParseFailure {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("cannot find a main method for this application")]
    NoEntrypoint,

    #[error("failed to restore {path} to source text: {reason}")]
    EmitFailure { path: PathBuf, reason: String },

    #[error("failed to write diff to {path}: {source}")]
    SinkFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, InstrumentError>;
