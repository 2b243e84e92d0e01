pub mod archive;
pub mod assembler;
pub mod config;
pub mod conversion;
pub mod disc;
pub mod error;
pub mod extractor;
pub mod notifier;
pub mod path_guard;
pub mod pipeline;
pub mod tools;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for easy access
pub use config::{Compression, ConvertOptions, OutputFormat, ToolNames};
pub use disc::{DiscImage, DiscSource, IsoDisc, IsoSource};
pub use error::{MediaError, Result};
pub use notifier::{Notifier, VerbosityLevel};
pub use pipeline::{Pipeline, RunSummary};
pub use tools::{SystemRunner, ToolRunner, Toolchain};
pub use walker::{Catalog, DistributionEntry, UnitKind};
