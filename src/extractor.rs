//! Pulling media units off the disc into raw image fragments.
//!
//! Tapes are single files copied byte-for-byte. Volumes are ZIP archives: the archive is
//! copied next to the destination as an anonymous temporary file, unpacked entry by entry,
//! and the copy disappears when the temporary file is dropped, on success and failure alike.
//!
//! Fragments this module writes are its own until it returns them; if extraction fails
//! part-way, the fragments already written for that unit are removed again.

use crate::archive::open_archive;
use crate::disc::{locate, DiscImage};
use crate::error::{MediaError, Result};
use crate::notifier::Notifier;
use crate::path_guard::PathGuard;
use crate::walker::UnitKind;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where a fragment's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOrigin {
    /// A file copied straight off the disc.
    Disc(String),
    /// A member of a volume archive.
    ArchiveEntry(String),
}

/// A raw image file written by extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFragment {
    pub path: PathBuf,
    pub origin: FragmentOrigin,
}

pub struct MediaExtractor<'a> {
    disc: &'a dyn DiscImage,
    unzip: &'a Path,
    guard: PathGuard<'a>,
    notifier: &'a Notifier,
}

impl<'a> MediaExtractor<'a> {
    pub fn new(disc: &'a dyn DiscImage, unzip: &'a Path, notifier: &'a Notifier) -> Self {
        Self {
            disc,
            unzip,
            guard: PathGuard::new(notifier),
            notifier,
        }
    }

    /// Copies `/distribution/unit.IPL` to `dest/unit.IPL`.
    pub fn extract_tape(
        &self,
        distribution: &str,
        unit: &str,
        dest: &Path,
        overwrite: bool,
    ) -> Result<ExtractedFragment> {
        let extension = UnitKind::Tape.extension();
        let mut source = locate(self.disc, distribution, unit, extension)?;

        let target = dest.join(format!("{}{}", unit, extension));
        self.guard.check(&target, overwrite)?;
        write_stream(&mut source, &target, &format!("{}{}", unit, extension))?;

        self.notifier.debug(&format!("Extracted tape {} to {}", unit, target.display()));
        Ok(ExtractedFragment {
            path: target,
            origin: FragmentOrigin::Disc(format!("/{}/{}{}", distribution, unit, extension)),
        })
    }

    /// Unpacks every member of `/distribution/unit.ZIP` into `dest`, returning the
    /// fragments sorted by path.
    pub fn extract_volume(
        &self,
        distribution: &str,
        unit: &str,
        dest: &Path,
        overwrite: bool,
    ) -> Result<Vec<ExtractedFragment>> {
        let mut source = locate(self.disc, distribution, unit, UnitKind::Volume.extension())?;

        // Random name in `dest`, removed on drop.
        let mut archive_copy = NamedTempFile::new_in(dest).map_err(|e| MediaError::io(dest, e))?;
        io::copy(&mut source, archive_copy.as_file_mut()).map_err(|e| MediaError::MediaRead {
            path: self.disc.location().to_path_buf(),
            reason: format!("copying {}.ZIP: {}", unit, e),
        })?;
        drop(source);
        archive_copy
            .as_file_mut()
            .flush()
            .map_err(|e| MediaError::io(archive_copy.path(), e))?;

        let mut fragments = Vec::new();
        if let Err(e) = self.unpack(archive_copy.path(), dest, overwrite, &mut fragments) {
            for fragment in &fragments {
                let _ = fs::remove_file(&fragment.path);
            }
            return Err(e);
        }

        fragments.sort_by(|a, b| a.path.cmp(&b.path));
        self.notifier.debug(&format!(
            "Extracted {} fragment(s) from {}.ZIP",
            fragments.len(),
            unit
        ));
        Ok(fragments)
    }

    fn unpack(
        &self,
        archive_path: &Path,
        dest: &Path,
        overwrite: bool,
        fragments: &mut Vec<ExtractedFragment>,
    ) -> Result<()> {
        let mut reader = open_archive(archive_path, self.unzip)?;
        let entries = reader.entries().to_vec();

        for (index, entry) in entries.iter().enumerate() {
            if entry.is_dir {
                continue;
            }
            let Some(file_name) = Path::new(&entry.name).file_name() else {
                self.notifier.debug(&format!("Skipping nameless entry {}", entry.name));
                continue;
            };

            let target = dest.join(file_name);
            // Entries from different archive directories may share a base name
            if fragments.iter().any(|fragment| fragment.path == target) {
                return Err(MediaError::PathExists { path: target });
            }
            self.guard.check(&target, overwrite)?;

            let mut stream = reader.open_entry(index)?;
            write_stream(&mut stream, &target, &entry.name)?;
            fragments.push(ExtractedFragment {
                path: target,
                origin: FragmentOrigin::ArchiveEntry(entry.name.clone()),
            });
        }
        Ok(())
    }
}

/// Copies `source` into a new file at `target`. Read failures are reported against
/// `entry`; a partially written target is removed.
fn write_stream(source: &mut dyn Read, target: &Path, entry: &str) -> Result<()> {
    let mut out = File::create(target).map_err(|e| MediaError::io(target, e))?;
    let mut buf = vec![0u8; 64 * 1024];

    let result = loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break out.flush().map_err(|e| MediaError::io(target, e)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                break Err(MediaError::ArchiveRead {
                    entry: entry.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        if let Err(e) = out.write_all(&buf[..n]) {
            break Err(MediaError::io(target, e));
        }
    };

    if result.is_err() {
        drop(out);
        let _ = fs::remove_file(target);
    }
    result
}
