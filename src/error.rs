// src/error.rs
//! Errors raised while acquiring data. None of them end a run: collectors log
//! them and move on to the next item.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("empty command")]
    EmptyCommand,

    #[error("{command}: failed to spawn: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bus {bus_id}: stats reported for port {port} which has no link status")]
    UnknownPort { bus_id: String, port: u32 },
}

pub type Result<T> = std::result::Result<T, CollectError>;
