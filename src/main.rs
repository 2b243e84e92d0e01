use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use adcdutil::{
    Compression, ConvertOptions, IsoSource, Notifier, OutputFormat, Pipeline, SystemRunner,
    ToolNames, VerbosityLevel,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every tape and volume from the disc and convert them
    Convert(ConvertArgs),
    /// List the tapes and volumes of every distribution on the disc
    Dump(DumpArgs),
}

#[derive(Args)]
struct ConvertArgs {
    #[arg(
        short,
        long,
        value_name = "DIR",
        value_parser = existing_dir,
        help = "Directory receiving the converted images [default: current directory]"
    )]
    destination: Option<PathBuf>,

    #[arg(
        short,
        long,
        overrides_with = "no_force",
        help = "Overwrite existing files"
    )]
    force: bool,

    #[arg(long = "no-force", overrides_with = "force", help = "Refuse to overwrite existing files (default)")]
    no_force: bool,

    #[arg(
        short,
        long,
        value_enum,
        default_value = "zlib",
        help = "Compression applied to converted images"
    )]
    compression: Compression,

    #[arg(
        short,
        long,
        overrides_with = "verbose",
        help = "Suppress progress output"
    )]
    quiet: bool,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        overrides_with = "quiet",
        help = "Show progress (-v info, -vv debug, -vvv trace logs)"
    )]
    verbose: u8,

    #[arg(
        short,
        long,
        value_enum,
        ignore_case = true,
        default_value = "CCKD",
        help = "Format of converted volumes"
    )]
    output_format: OutputFormat,

    #[arg(
        long,
        value_name = "SECS",
        help = "Kill an external tool that runs longer than this"
    )]
    timeout: Option<u64>,

    #[command(flatten)]
    tools: ToolArgs,

    #[arg(value_parser = existing_file, help = "Distribution ISO image")]
    iso: PathBuf,
}

#[derive(Args)]
struct ToolArgs {
    #[arg(long, env = "ADCDUTIL_DASDCOPY", default_value = "dasdcopy", hide = true)]
    dasdcopy: String,

    #[arg(long, env = "ADCDUTIL_HETUPD", default_value = "hetupd", hide = true)]
    hetupd: String,

    #[arg(long, env = "ADCDUTIL_UNZIP", default_value = "unzip", hide = true)]
    unzip: String,
}

#[derive(Args)]
struct DumpArgs {
    #[arg(long, help = "Print the catalog as JSON")]
    json: bool,

    #[arg(value_parser = existing_file, help = "Distribution ISO image")]
    iso: PathBuf,
}

fn existing_dir(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory '{}' does not exist", value))
    }
}

fn existing_file(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{}' does not exist", value))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = match &cli.command {
        Command::Convert(args) => VerbosityLevel::from_flags(args.quiet, args.verbose),
        Command::Dump(_) => VerbosityLevel::Normal,
    };

    env_logger::Builder::from_env(Env::default())
        .filter_level(verbosity.to_log_level())
        .init();

    match cli.command {
        Command::Convert(args) => convert(args, verbosity),
        Command::Dump(args) => dump(args, verbosity),
    }
}

fn convert(args: ConvertArgs, verbosity: VerbosityLevel) -> Result<()> {
    let destination = match args.destination {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let options = ConvertOptions {
        destination,
        overwrite: args.force && !args.no_force,
        compression: args.compression,
        output_format: args.output_format,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let names = ToolNames {
        dasdcopy: args.tools.dasdcopy,
        hetupd: args.tools.hetupd,
        unzip: args.tools.unzip,
    };

    info!("Converting media from {}", args.iso.display());
    debug!("Options: {:?}", options);

    let pipeline = Pipeline::new(IsoSource::new(&args.iso), Notifier::new(verbosity));
    let runner = SystemRunner::new(options.timeout);
    let summary = pipeline
        .convert(&options, &names, &runner)
        .with_context(|| format!("Failed to convert media from {}", args.iso.display()))?;

    debug!("Produced {} file(s)", summary.outputs().count());
    Ok(())
}

fn dump(args: DumpArgs, verbosity: VerbosityLevel) -> Result<()> {
    let pipeline = Pipeline::new(IsoSource::new(&args.iso), Notifier::new(verbosity));
    let catalog = pipeline
        .catalog()
        .with_context(|| format!("Failed to read {}", args.iso.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog.listing())?);
    } else {
        for line in catalog.dump_lines() {
            println!("{}", line);
        }
    }
    Ok(())
}
