//! Errors surfaced by the `backdrop` binary and their exit codes.
//!
//! | code | meaning |
//! |------|---------|
//! | 2    | clap rejected the arguments |
//! | 10   | the renderer failed: no backend, shader, scene or frame errors |
//! | 11   | a config file or snapshot could not be read or written |
//! | 12   | the user asked for something invalid: kind, backend, config, size |
//! | 13   | JSON output could not be produced |

use backdrop_core::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Render(RenderError),

    /// The renderer turned down a value that came from the command line.
    #[error(transparent)]
    Rejected(RenderError),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Input(String),

    #[error("cannot encode output: {0}")]
    Serialization(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Render(_) => 10,
            CliError::Io(_) => 11,
            CliError::Rejected(_) | CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

/// Errors a user can fix by changing the kind, `--config`, or surface flags.
fn caused_by_arguments(e: &RenderError) -> bool {
    matches!(
        e,
        RenderError::InvalidConfig { .. }
            | RenderError::InvalidColor(_)
            | RenderError::UnknownBackground(_)
            | RenderError::InvalidDimensions
    )
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Io(msg) => CliError::Io(msg),
            e if caused_by_arguments(&e) => CliError::Rejected(e),
            e => CliError::Render(e),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
