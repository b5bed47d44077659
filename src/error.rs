/// Error type for everything that touches the filesystem or parses
/// external content (config, prefs, level files, question bank).
///
/// Simulation code never returns errors: a tick always completes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("level {name}: {reason}")]
    Level { name: String, reason: String },

    #[error("question {index}: {reason}")]
    Question { index: usize, reason: String },
}

pub type GameResult<T> = Result<T, GameError>;
