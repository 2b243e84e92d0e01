//! Reading volume archives.
//!
//! A ZIP archive is opened once and one [`ArchiveEntryReader`] strategy is chosen for all
//! of its entries:
//! - [`NativeZipReader`] decodes entries in-process with the `zip` crate.
//! - [`SubprocessZipReader`] streams each entry from `unzip -p <archive> <entry>`, used
//!   when any entry's compression method cannot be decoded in-process (for example the
//!   Deflate64 streams found on distribution media).
//!
//! The choice is made by probing every entry without reading it. Entry names and their
//! stored order always come from the central directory, whichever strategy is used.

use crate::error::{MediaError, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use zip::result::ZipError;
use zip::ZipArchive;

/// Central-directory record of one archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Sequential access to archive members. Each stream is read once.
pub trait ArchiveEntryReader {
    /// Members in stored order.
    fn entries(&self) -> &[ArchiveEntry];

    /// Opens the member at `index` for reading.
    fn open_entry(&mut self, index: usize) -> Result<Box<dyn Read + '_>>;

    /// Short label of the strategy, for logs.
    fn strategy(&self) -> &'static str;
}

/// Opens `archive_path` with the in-process reader, or with `unzip` if that reader
/// reports an unsupported compression method.
pub fn open_archive(archive_path: &Path, unzip: &Path) -> Result<Box<dyn ArchiveEntryReader>> {
    let file = File::open(archive_path).map_err(|e| MediaError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| MediaError::ArchiveRead {
        entry: archive_path.display().to_string(),
        reason: e.to_string(),
    })?;

    let entries = list_entries(&mut archive)?;
    let reader: Box<dyn ArchiveEntryReader> = if probe_supported(&mut archive, &entries)? {
        Box::new(NativeZipReader { archive, entries })
    } else {
        Box::new(SubprocessZipReader::new(archive_path, unzip, entries))
    };

    debug!(
        "Reading {} ({} entries) with the {} reader",
        archive_path.display(),
        reader.entries().len(),
        reader.strategy()
    );
    Ok(reader)
}

fn list_entries(archive: &mut ZipArchive<File>) -> Result<Vec<ArchiveEntry>> {
    (0..archive.len())
        .map(|index| {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| MediaError::ArchiveRead {
                    entry: format!("#{}", index),
                    reason: e.to_string(),
                })?;
            Ok(ArchiveEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
            })
        })
        .collect()
}

/// Opens every entry without reading it; `false` as soon as one is undecodable here.
fn probe_supported(archive: &mut ZipArchive<File>, entries: &[ArchiveEntry]) -> Result<bool> {
    for (index, entry) in entries.iter().enumerate() {
        match archive.by_index(index) {
            Ok(_) => {}
            Err(ZipError::UnsupportedArchive(reason)) => {
                warn!(
                    "{} cannot be decoded in-process ({}), falling back to unzip",
                    entry.name, reason
                );
                return Ok(false);
            }
            Err(e) => {
                return Err(MediaError::ArchiveRead {
                    entry: entry.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok(true)
}

pub struct NativeZipReader {
    archive: ZipArchive<File>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveEntryReader for NativeZipReader {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn open_entry(&mut self, index: usize) -> Result<Box<dyn Read + '_>> {
        let name = self
            .entries
            .get(index)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| format!("#{}", index));
        let file = self
            .archive
            .by_index(index)
            .map_err(|e| MediaError::ArchiveRead {
                entry: name,
                reason: e.to_string(),
            })?;
        Ok(Box::new(file))
    }

    fn strategy(&self) -> &'static str {
        "native"
    }
}

pub struct SubprocessZipReader {
    archive_path: PathBuf,
    unzip: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl SubprocessZipReader {
    pub fn new(archive_path: &Path, unzip: &Path, entries: Vec<ArchiveEntry>) -> Self {
        Self {
            archive_path: archive_path.to_path_buf(),
            unzip: unzip.to_path_buf(),
            entries,
        }
    }
}

impl ArchiveEntryReader for SubprocessZipReader {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn open_entry(&mut self, index: usize) -> Result<Box<dyn Read + '_>> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| MediaError::ArchiveRead {
                entry: format!("#{}", index),
                reason: "no such entry".to_string(),
            })?;

        let mut child = Command::new(&self.unzip)
            .arg("-p")
            .arg(&self.archive_path)
            .arg(&entry.name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::ArchiveRead {
                entry: entry.name.clone(),
                reason: format!("failed to run {}: {}", self.unzip.display(), e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| MediaError::ArchiveRead {
            entry: entry.name.clone(),
            reason: "unzip produced no output stream".to_string(),
        })?;

        Ok(Box::new(ChildStream {
            child,
            stdout,
            finished: false,
        }))
    }

    fn strategy(&self) -> &'static str {
        "subprocess"
    }
}

/// Standard output of a running `unzip -p`; the exit status is checked at end of stream.
struct ChildStream {
    child: Child,
    stdout: ChildStdout,
    finished: bool,
}

impl Read for ChildStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finished = true;
            let status = self.child.wait()?;
            if !status.success() {
                return Err(io::Error::other(format!("unzip exited with {}", status)));
            }
        }
        Ok(n)
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
