//! Error types for the engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("codec error: {0}")]
    Codec(#[from] crate::codec::CodecError),

    #[error("apply error: {0}")]
    Apply(#[from] crate::doc::ApplyError),
}
