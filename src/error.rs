//! Crate-wide error types.
//!
//! Each codec layer reports through its own error enum; `IgesError`
//! aggregates them at the model boundary so callers deal with one type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::params::ParameterError;
use crate::codec::record::RecordError;

/// Top-level error type for model operations
#[derive(Error, Debug)]
pub enum IgesError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("destination '{0}' exists and overwrite was not requested")]
    DestinationExists(PathBuf),

    #[error("global section: {0}")]
    Global(String),

    #[error("directory entry {sequence}: {message}")]
    Directory { sequence: u32, message: String },

    #[error("entity type {entity_type} does not allow form {form}")]
    InvalidForm { entity_type: u16, form: i16 },

    #[error("entity with parameter block {sequence} is degenerate and refuses typed access")]
    Degenerate { sequence: u32 },

    #[error("expected {expected} but found entity type {found}")]
    WrongVariant { expected: &'static str, found: u16 },

    #[error("no entity for the given id or handle")]
    NoSuchEntity,

    #[error("handle refers to a destroyed entity")]
    StaleHandle,

    #[error("{0}")]
    Usage(String),
}

/// Convenience result alias used throughout the crate
pub type IgesResult<T> = Result<T, IgesError>;
