//! Conversion of raw images into emulator formats.
//!
//! A [`ConversionJob`] (volumes, `dasdcopy`) or [`TapeConversionJob`] (tapes, `hetupd`)
//! fully determines one converter invocation. The output path is the input's stem with
//! the target extension. On success the input image is deleted, leaving only the output;
//! on failure the input is left for the caller, which owns it.

use crate::assembler::display_name;
use crate::config::{Compression, OutputFormat};
use crate::error::{MediaError, Result};
use crate::notifier::Notifier;
use crate::path_guard::PathGuard;
use crate::tools::{ToolRunner, Toolchain};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of converted tapes.
pub const TAPE_EXTENSION: &str = "het";

/// `dest/V001.img` + `cckd` -> `dest/V001.cckd`
pub fn output_path_for(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub compression: Compression,
    pub output_format: OutputFormat,
    pub overwrite: bool,
}

impl ConversionJob {
    pub fn new(
        input: impl Into<PathBuf>,
        compression: Compression,
        output_format: OutputFormat,
        overwrite: bool,
    ) -> Self {
        let input = input.into();
        let output = output_path_for(&input, &output_format.extension());
        Self {
            input,
            output,
            compression,
            output_format,
            overwrite,
        }
    }

    /// `dasdcopy` arguments; `replace` when the output exists and may be overwritten.
    pub fn arguments(&self, replace: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-q".into()];
        if replace {
            args.push("-r".into());
        }
        args.push(self.compression.dasd_flag().into());
        args.push("-o".into());
        args.push(self.output_format.as_str().into());
        args.push(self.input.clone().into());
        args.push(self.output.clone().into());
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub compression: Compression,
    pub overwrite: bool,
}

impl TapeConversionJob {
    pub fn new(input: impl Into<PathBuf>, compression: Compression, overwrite: bool) -> Self {
        let input = input.into();
        let output = output_path_for(&input, TAPE_EXTENSION);
        Self {
            input,
            output,
            compression,
            overwrite,
        }
    }

    /// `hetupd` arguments.
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            self.compression.het_flag().into(),
            self.input.clone().into(),
            self.output.clone().into(),
        ]
    }
}

pub struct ConversionDriver<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a Toolchain,
    guard: PathGuard<'a>,
    notifier: &'a Notifier,
}

impl<'a> ConversionDriver<'a> {
    pub fn new(runner: &'a dyn ToolRunner, tools: &'a Toolchain, notifier: &'a Notifier) -> Self {
        Self {
            runner,
            tools,
            guard: PathGuard::new(notifier),
            notifier,
        }
    }

    pub fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
        let format = job.output_format.as_str();
        self.notifier.progress(&format!("Converting to {}...", format));
        let replace = self.guard.check(&job.output, job.overwrite)?;

        self.invoke(&self.tools.dasdcopy, &job.arguments(replace), &job.output)?;
        self.finish(&job.input, &job.output)
    }

    pub fn convert_tape(&self, job: &TapeConversionJob) -> Result<PathBuf> {
        self.notifier.progress("Converting to HET...");
        // hetupd has no replace flag, so a permitted overwrite clears the way first
        if self.guard.check(&job.output, job.overwrite)? {
            fs::remove_file(&job.output).map_err(|e| MediaError::io(&job.output, e))?;
        }

        self.invoke(&self.tools.hetupd, &job.arguments(), &job.output)?;
        self.finish(&job.input, &job.output)
    }

    fn invoke(&self, tool: &Path, args: &[OsString], output: &Path) -> Result<()> {
        self.notifier.debug(&format!("{} {:?}", tool.display(), args));
        let spinner = self
            .notifier
            .spinner(&format!("Writing {}", display_name(output)));
        let result = self.runner.run(tool, args);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result
    }

    fn finish(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        fs::remove_file(input).map_err(|e| MediaError::io(input, e))?;
        Ok(output.to_path_buf())
    }
}
