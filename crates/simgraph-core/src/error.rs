use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid magic bytes: expected SGKGRAPH")]
    InvalidMagic,

    #[error("Unsupported graph format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Corrupt graph: {0}")]
    Corrupt(String),
}
