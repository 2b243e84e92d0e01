//! Typed failures for the extraction and conversion pipeline.
//!
//! Every kind is fatal where it occurs; nothing in the pipeline retries.
//! [`MediaError::is_fatal_for_run`] separates failures that poison the whole
//! run (bad disc, missing tools, refused overwrite) from failures that only
//! concern the unit being processed, so callers can pick their own policy.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to read disc image {}: {reason}", .path.display())]
    MediaRead { path: PathBuf, reason: String },

    #[error("failed to read archive entry '{entry}': {reason}")]
    ArchiveRead { entry: String, reason: String },

    #[error("{} already exists, aborting!", .path.display())]
    PathExists { path: PathBuf },

    #[error("{path} not found on disc")]
    MediaNotFound { path: String },

    #[error("no tapes or volumes found on {}", .path.display())]
    EmptyDisc { path: PathBuf },

    #[error("no images extracted for {unit}")]
    NoImagesExtracted { unit: String },

    #[error("{tool} failed ({})", describe_exit(.code))]
    ExternalTool { tool: String, code: Option<i32> },

    #[error("Required commands not found: {}", .tools.join(" "))]
    MissingTool { tools: Vec<String> },

    #[error("{tool} did not finish within {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl MediaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MediaError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure invalidates every remaining unit, not just the current one.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            MediaError::MediaRead { .. }
                | MediaError::MissingTool { .. }
                | MediaError::PathExists { .. }
                | MediaError::EmptyDisc { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
