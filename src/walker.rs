//! Discovery of distribution media on a disc.
//!
//! A distribution is a directory on the disc; its media units are the files inside it
//! carrying a recognized extension (`.IPL` for tapes, `.ZIP` for volumes). The walk
//! groups unit ids under the base name of their parent directory. Sets are ordered,
//! so every consumer iterates units (and distributions) lexicographically.

use crate::disc::{DiscImage, DiscSource};
use crate::error::Result;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Distribution name -> sorted, de-duplicated unit ids.
pub type UnitMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Tape,
    Volume,
}

impl UnitKind {
    /// Extension of the unit's file on the disc.
    pub fn extension(self) -> &'static str {
        match self {
            UnitKind::Tape => ".IPL",
            UnitKind::Volume => ".ZIP",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Tape => write!(f, "tape"),
            UnitKind::Volume => write!(f, "volume"),
        }
    }
}

/// One media unit discovered on the disc.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DistributionEntry {
    pub distribution: String,
    pub unit_id: String,
    pub kind: UnitKind,
}

/// Walks `disc` once and records every file whose name contains `extension`
/// (case-insensitively) under its parent directory's name.
pub fn enumerate(disc: &dyn DiscImage, extension: &str) -> Result<UnitMap> {
    let needle = extension.to_lowercase();
    let mut units = UnitMap::new();

    for file in disc.files()? {
        if !file.name.to_lowercase().contains(&needle) {
            continue;
        }
        let Some(distribution) = file.parent_name() else {
            debug!("Skipping {} in the disc root", file.name);
            continue;
        };
        let unit_id = Path::new(&file.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.name.clone());

        units
            .entry(distribution.to_string())
            .or_default()
            .insert(unit_id);
    }

    Ok(units)
}

/// Tapes and volumes found on one disc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub tapes: UnitMap,
    pub volumes: UnitMap,
}

#[derive(Debug, Serialize)]
pub struct DistributionListing<'a> {
    pub tapes: Vec<&'a str>,
    pub volumes: Vec<&'a str>,
}

impl Catalog {
    /// Opens the disc, walks it for both unit kinds and closes it again.
    pub fn from_source<S: DiscSource + ?Sized>(source: &S) -> Result<Self> {
        let disc = source.open()?;
        Self::from_disc(disc.as_ref())
    }

    pub fn from_disc(disc: &dyn DiscImage) -> Result<Self> {
        Ok(Self {
            tapes: enumerate(disc, UnitKind::Tape.extension())?,
            volumes: enumerate(disc, UnitKind::Volume.extension())?,
        })
    }

    pub fn units_of(&self, kind: UnitKind) -> &UnitMap {
        match kind {
            UnitKind::Tape => &self.tapes,
            UnitKind::Volume => &self.volumes,
        }
    }

    /// Every unit of `kind`, distributions and unit ids in lexicographic order.
    pub fn entries(&self, kind: UnitKind) -> Vec<DistributionEntry> {
        self.units_of(kind)
            .iter()
            .flat_map(|(distribution, units)| {
                units.iter().map(move |unit_id| DistributionEntry {
                    distribution: distribution.clone(),
                    unit_id: unit_id.clone(),
                    kind,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tapes.is_empty() && self.volumes.is_empty()
    }

    pub fn distributions(&self) -> BTreeSet<&str> {
        self.tapes
            .keys()
            .chain(self.volumes.keys())
            .map(String::as_str)
            .collect()
    }

    /// Human-readable listing: `<dist> tapes: ...` and `<dist> volumes: ...` lines.
    pub fn dump_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for distribution in self.distributions() {
            for kind in [UnitKind::Tape, UnitKind::Volume] {
                if let Some(units) = self.units_of(kind).get(distribution) {
                    let ids: Vec<&str> = units.iter().map(String::as_str).collect();
                    lines.push(format!("{} {}s: {}", distribution, kind, ids.join(" ")));
                }
            }
        }
        lines
    }

    /// Structured listing for JSON output.
    pub fn listing(&self) -> BTreeMap<&str, DistributionListing<'_>> {
        self.distributions()
            .into_iter()
            .map(|distribution| {
                (
                    distribution,
                    DistributionListing {
                        tapes: unit_ids(&self.tapes, distribution),
                        volumes: unit_ids(&self.volumes, distribution),
                    },
                )
            })
            .collect()
    }
}

fn unit_ids<'a>(map: &'a UnitMap, distribution: &str) -> Vec<&'a str> {
    map.get(distribution)
        .map(|units| units.iter().map(String::as_str).collect())
        .unwrap_or_default()
}
