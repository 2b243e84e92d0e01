//! Run configuration passed explicitly into the pipeline.

use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Compression applied by the converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Zlib,
    Bzip2,
    None,
}

impl Compression {
    /// Flag understood by `dasdcopy`.
    pub fn dasd_flag(self) -> &'static str {
        match self {
            Compression::Zlib => "-z",
            Compression::Bzip2 => "-bz2",
            Compression::None => "-0",
        }
    }

    /// Flag understood by `hetupd`.
    pub fn het_flag(self) -> &'static str {
        match self {
            Compression::Zlib => "-z",
            Compression::Bzip2 => "-b",
            Compression::None => "-d",
        }
    }
}

/// Target DASD image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "UPPER")]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Ckd,
    #[default]
    Cckd,
    Fba,
    Cfba,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Ckd => "CKD",
            OutputFormat::Cckd => "CCKD",
            OutputFormat::Fba => "FBA",
            OutputFormat::Cfba => "CFBA",
        }
    }

    /// File extension of converted images (lower-cased format name).
    pub fn extension(self) -> String {
        self.as_str().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub destination: PathBuf,
    pub overwrite: bool,
    pub compression: Compression,
    pub output_format: OutputFormat,
    /// Upper bound for each external tool invocation; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl ConvertOptions {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            overwrite: false,
            compression: Compression::default(),
            output_format: OutputFormat::default(),
            timeout: None,
        }
    }
}

/// Names (or paths) of the external programs, looked up on `PATH` before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNames {
    pub dasdcopy: String,
    pub hetupd: String,
    pub unzip: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            dasdcopy: "dasdcopy".to_string(),
            hetupd: "hetupd".to_string(),
            unzip: "unzip".to_string(),
        }
    }
}
