//! End-to-end "disc image → emulator images" orchestrator.
//!
//! [`Pipeline`] composes the components per media unit:
//! - tapes: [`MediaExtractor::extract_tape`] → [`ConversionDriver::convert_tape`]
//! - volumes: [`MediaExtractor::extract_volume`] → [`ImageAssembler::assemble`] →
//!   [`ConversionDriver::convert`]
//!
//! Units run strictly one after another, each to completion (extract, assemble,
//! convert, clean up) before the next starts. The first failure stops the run; outputs
//! of units that already finished stay on disk.
//!
//! Construction helpers:
//! - [`Pipeline::new`]: inject a [`DiscSource`] and a [`Notifier`].

use crate::assembler::{display_name, ImageAssembler};
use crate::config::{ConvertOptions, ToolNames};
use crate::conversion::{ConversionDriver, ConversionJob, TapeConversionJob};
use crate::disc::DiscSource;
use crate::error::{MediaError, Result};
use crate::extractor::MediaExtractor;
use crate::notifier::Notifier;
use crate::tools::{ToolRunner, Toolchain};
use crate::walker::{Catalog, DistributionEntry, UnitKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a successful `convert` run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tapes: Vec<PathBuf>,
    pub volumes: Vec<PathBuf>,
}

impl RunSummary {
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.tapes.iter().chain(self.volumes.iter())
    }
}

/// Orchestrates discovery, extraction, assembly and conversion for one disc.
///
/// The disc is reopened for every logical operation (the walk and each unit), so no
/// reader state is shared between units.
pub struct Pipeline<S: DiscSource> {
    source: S,
    notifier: Notifier,
}

impl<S: DiscSource> Pipeline<S> {
    pub fn new(source: S, notifier: Notifier) -> Self {
        Self { source, notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Walks the disc for tapes and volumes.
    pub fn catalog(&self) -> Result<Catalog> {
        self.notifier.debug(&format!(
            "Walking {}",
            self.source.location().display()
        ));
        Catalog::from_source(&self.source)
    }

    /// Lines for the `dump` command, without touching the filesystem.
    pub fn dump(&self) -> Result<Vec<String>> {
        Ok(self.catalog()?.dump_lines())
    }

    /// Checks for the external tools, then converts every unit on the disc.
    pub fn convert(
        &self,
        options: &ConvertOptions,
        names: &ToolNames,
        runner: &dyn ToolRunner,
    ) -> Result<RunSummary> {
        let tools = Toolchain::resolve(names)?;
        self.convert_with(options, &tools, runner)
    }

    /// Converts every unit on the disc with an already resolved [`Toolchain`].
    pub fn convert_with(
        &self,
        options: &ConvertOptions,
        tools: &Toolchain,
        runner: &dyn ToolRunner,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let catalog = self.catalog()?;

        if catalog.tapes.is_empty() {
            self.notifier.error("No tapes found!");
        }
        if catalog.volumes.is_empty() {
            self.notifier.error("No volumes found!");
        }
        if catalog.is_empty() {
            return Err(MediaError::EmptyDisc {
                path: self.source.location().to_path_buf(),
            });
        }

        let mut summary = RunSummary::default();
        for unit in catalog.entries(UnitKind::Tape) {
            summary.tapes.push(self.convert_tape(&unit, options, tools, runner)?);
        }
        for unit in catalog.entries(UnitKind::Volume) {
            summary
                .volumes
                .push(self.convert_volume(&unit, options, tools, runner)?);
        }

        self.notifier.debug(&format!(
            "Converted {} tape(s) and {} volume(s) in {:.1?}",
            summary.tapes.len(),
            summary.volumes.len(),
            started.elapsed()
        ));
        Ok(summary)
    }

    fn convert_tape(
        &self,
        unit: &DistributionEntry,
        options: &ConvertOptions,
        tools: &Toolchain,
        runner: &dyn ToolRunner,
    ) -> Result<PathBuf> {
        self.notifier.progress(&format!(
            "Extracting {} tape {}...",
            unit.distribution, unit.unit_id
        ));

        let fragment = {
            let disc = self.source.open()?;
            let extractor = MediaExtractor::new(disc.as_ref(), &tools.unzip, &self.notifier);
            extractor.extract_tape(
                &unit.distribution,
                &unit.unit_id,
                &options.destination,
                options.overwrite,
            )?
        };

        let driver = ConversionDriver::new(runner, tools, &self.notifier);
        let job = TapeConversionJob::new(&fragment.path, options.compression, options.overwrite);
        let output = self.owned_input(&fragment.path, driver.convert_tape(&job))?;

        self.notifier.progress(&format!(
            "{} tape {} converted to {}",
            unit.distribution,
            unit.unit_id,
            display_name(&output)
        ));
        Ok(output)
    }

    fn convert_volume(
        &self,
        unit: &DistributionEntry,
        options: &ConvertOptions,
        tools: &Toolchain,
        runner: &dyn ToolRunner,
    ) -> Result<PathBuf> {
        self.notifier.progress(&format!(
            "Extracting {} volume {}...",
            unit.distribution, unit.unit_id
        ));

        let fragments = {
            let disc = self.source.open()?;
            let extractor = MediaExtractor::new(disc.as_ref(), &tools.unzip, &self.notifier);
            extractor.extract_volume(
                &unit.distribution,
                &unit.unit_id,
                &options.destination,
                options.overwrite,
            )?
        };

        let assembler = ImageAssembler::new(runner, &tools.dasdcopy, &self.notifier);
        let image = assembler.assemble(&unit.unit_id, &fragments, options.overwrite)?;

        let driver = ConversionDriver::new(runner, tools, &self.notifier);
        let job = ConversionJob::new(
            &image.path,
            options.compression,
            options.output_format,
            options.overwrite,
        );
        let output = self.owned_input(&image.path, driver.convert(&job))?;

        self.notifier.progress(&format!(
            "{} volume {} converted to {}",
            unit.distribution,
            unit.unit_id,
            display_name(&output)
        ));
        Ok(output)
    }

    /// The pre-conversion image belongs to the pipeline once extraction hands it over;
    /// it is removed when conversion fails.
    fn owned_input(&self, input: &Path, converted: Result<PathBuf>) -> Result<PathBuf> {
        if converted.is_err() && input.exists() {
            self.notifier
                .debug(&format!("Removing {} after failed conversion", input.display()));
            let _ = fs::remove_file(input);
        }
        converted
    }
}
