//! Read-only access to the source disc image.
//!
//! [`DiscImage`] is the seam between the pipeline and the ISO9660 reader: it lists every
//! file with its directory and opens files by absolute path. [`DiscSource`] opens a fresh,
//! independent handle per logical operation, so a walk and each extraction never share
//! reader state. [`IsoDisc`] implements both on top of the `cdfs` crate.

use crate::error::{MediaError, Result};
use cdfs::{DirectoryEntry, ISODirectory, ISO9660};
use log::{debug, trace};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A file found while walking a disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscFile {
    /// Absolute directory path, `/` for the root.
    pub dir: String,
    /// File identifier without the `;N` version suffix.
    pub name: String,
}

impl DiscFile {
    /// Base name of the containing directory, `None` for files in the root.
    pub fn parent_name(&self) -> Option<&str> {
        self.dir.rsplit('/').find(|part| !part.is_empty())
    }
}

/// Why a path lookup on a disc failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No file with that name.
    NotFound,
    /// The disc format rejected the path as written (e.g. a missing `;1` version).
    Invalid(String),
    /// The disc itself could not be read.
    Unreadable(String),
}

pub trait DiscImage {
    /// Every file on the disc, in walk order.
    fn files(&self) -> Result<Vec<DiscFile>>;

    /// Opens the file at an absolute `path` such as `/DIST1/V001.ZIP`.
    fn open_file(&self, path: &str) -> std::result::Result<Box<dyn Read + '_>, LookupError>;

    /// Location of the disc, for messages.
    fn location(&self) -> &Path;
}

/// Something that can open [`DiscImage`] handles on demand.
pub trait DiscSource {
    fn open(&self) -> Result<Box<dyn DiscImage>>;

    fn location(&self) -> &Path;
}

/// Path of a unit file inside a distribution directory.
pub fn unit_path(distribution: &str, unit: &str, extension: &str) -> String {
    format!("/{}/{}{}", distribution, unit, extension)
}

/// Opens `/distribution/unit<ext>`, retrying with the `;1` version alias when the
/// unversioned form is rejected as invalid.
pub fn locate<'d>(
    disc: &'d dyn DiscImage,
    distribution: &str,
    unit: &str,
    extension: &str,
) -> Result<Box<dyn Read + 'd>> {
    let path = unit_path(distribution, unit, extension);

    let lookup = match disc.open_file(&path) {
        Err(LookupError::Invalid(reason)) => {
            debug!("{} rejected ({}), trying version alias", path, reason);
            disc.open_file(&format!("{};1", path))
        }
        other => other,
    };

    lookup.map_err(|e| match e {
        LookupError::NotFound | LookupError::Invalid(_) => MediaError::MediaNotFound { path },
        LookupError::Unreadable(reason) => MediaError::MediaRead {
            path: disc.location().to_path_buf(),
            reason,
        },
    })
}

/// An ISO9660 image file.
pub struct IsoSource {
    path: PathBuf,
}

impl IsoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiscSource for IsoSource {
    fn open(&self) -> Result<Box<dyn DiscImage>> {
        Ok(Box::new(IsoDisc::open(&self.path)?))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// An opened ISO9660 image. Closed when dropped.
pub struct IsoDisc {
    path: PathBuf,
    iso: ISO9660<File>,
}

impl IsoDisc {
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening disc image {}", path.display());
        let file = File::open(path).map_err(|e| MediaError::MediaRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let iso = ISO9660::new(file).map_err(|e| MediaError::MediaRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            iso,
        })
    }

    fn unreadable(&self, reason: impl ToString) -> MediaError {
        MediaError::MediaRead {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn collect(
        &self,
        dir: &ISODirectory<File>,
        dir_path: &str,
        out: &mut Vec<DiscFile>,
    ) -> Result<()> {
        for entry in dir.contents() {
            match entry.map_err(|e| self.unreadable(e))? {
                DirectoryEntry::Directory(sub) => {
                    if is_self_or_parent(&sub.identifier) {
                        continue;
                    }
                    let sub_path = format!("{}/{}", dir_path.trim_end_matches('/'), sub.identifier);
                    trace!("Walking {}", sub_path);
                    self.collect(&sub, &sub_path, out)?;
                }
                DirectoryEntry::File(file) => out.push(DiscFile {
                    dir: dir_path.to_string(),
                    name: strip_version(&file.identifier).to_string(),
                }),
                _ => {}
            }
        }
        Ok(())
    }
}

fn is_self_or_parent(identifier: &str) -> bool {
    matches!(identifier, "." | ".." | "\u{0}" | "\u{1}")
}

/// `V001.ZIP;1` -> `V001.ZIP`
pub fn strip_version(identifier: &str) -> &str {
    match identifier.rsplit_once(';') {
        Some((name, version)) if version.chars().all(|c| c.is_ascii_digit()) => name,
        _ => identifier,
    }
}

impl DiscImage for IsoDisc {
    fn files(&self) -> Result<Vec<DiscFile>> {
        let mut files = Vec::new();
        self.collect(self.iso.root(), "/", &mut files)?;
        debug!("{} files on {}", files.len(), self.path.display());
        Ok(files)
    }

    fn open_file(&self, path: &str) -> std::result::Result<Box<dyn Read + '_>, LookupError> {
        let mut parts = path.split('/').filter(|part| !part.is_empty()).peekable();
        let mut current: Option<ISODirectory<File>> = None;

        while let Some(part) = parts.next() {
            let wanted = strip_version(part);
            let dir = current.as_ref().unwrap_or_else(|| self.iso.root());

            let mut found = None;
            for entry in dir.contents() {
                let entry = entry.map_err(|e| LookupError::Unreadable(e.to_string()))?;
                let matches = match &entry {
                    DirectoryEntry::Directory(sub) => sub.identifier.eq_ignore_ascii_case(wanted),
                    DirectoryEntry::File(file) => {
                        strip_version(&file.identifier).eq_ignore_ascii_case(wanted)
                    }
                    _ => false,
                };
                if matches {
                    found = Some(entry);
                    break;
                }
            }

            let is_last = parts.peek().is_none();
            match (found, is_last) {
                (Some(DirectoryEntry::File(file)), true) => return Ok(Box::new(file.read())),
                (Some(DirectoryEntry::Directory(sub)), false) => current = Some(sub),
                _ => return Err(LookupError::NotFound),
            }
        }

        Err(LookupError::NotFound)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
