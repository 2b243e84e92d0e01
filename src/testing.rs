//! In-memory fakes shared by the unit tests.

use crate::disc::{strip_version, DiscFile, DiscImage, DiscSource, LookupError};
use crate::error::{MediaError, Result};
use crate::tools::{tool_name, ToolRunner};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Disc image held in memory, keyed by absolute unversioned path.
#[derive(Clone, Default)]
pub struct MemoryDisc {
    files: BTreeMap<String, Vec<u8>>,
    require_versions: bool,
    location: PathBuf,
}

impl MemoryDisc {
    pub fn new() -> Self {
        Self {
            location: PathBuf::from("memory.iso"),
            ..Default::default()
        }
    }

    pub fn with_file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.insert(path.to_string(), data.to_vec());
        self
    }

    /// Rejects lookups without a `;1` suffix, like strict ISO9660 readers.
    pub fn require_versions(mut self) -> Self {
        self.require_versions = true;
        self
    }
}

impl DiscImage for MemoryDisc {
    fn files(&self) -> Result<Vec<DiscFile>> {
        Ok(self
            .files
            .keys()
            .map(|path| {
                let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
                DiscFile {
                    dir: if dir.is_empty() { "/".to_string() } else { dir.to_string() },
                    name: name.to_string(),
                }
            })
            .collect())
    }

    fn open_file(&self, path: &str) -> std::result::Result<Box<dyn Read + '_>, LookupError> {
        if self.require_versions && strip_version(path) == path {
            return Err(LookupError::Invalid(format!("{} has no version", path)));
        }
        self.files
            .get(strip_version(path))
            .map(|data| Box::new(Cursor::new(data.as_slice())) as Box<dyn Read + '_>)
            .ok_or(LookupError::NotFound)
    }

    fn location(&self) -> &Path {
        &self.location
    }
}

impl DiscSource for MemoryDisc {
    fn open(&self) -> Result<Box<dyn DiscImage>> {
        Ok(Box::new(self.clone()))
    }

    fn location(&self) -> &Path {
        &self.location
    }
}

/// Records every invocation and writes the last argument as the tool's output file.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<(String, Vec<String>)>>,
    fail_tool: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(tool: &str) -> Self {
        Self {
            fail_tool: Some(tool.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, tool: &Path, args: &[OsString]) -> Result<()> {
        let name = tool_name(tool);
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        self.calls.borrow_mut().push((name.clone(), args.clone()));

        if self.fail_tool.as_deref() == Some(name.as_str()) {
            return Err(MediaError::ExternalTool { tool: name, code: Some(2) });
        }
        if let Some(output) = args.last() {
            fs::write(output, b"converted").map_err(|e| MediaError::io(output, e))?;
        }
        Ok(())
    }
}

/// Builds a stored (uncompressed) ZIP archive in memory.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Rewrites every entry's compression method to one this build cannot decode.
pub fn mark_unsupported(mut archive: Vec<u8>, method: u16) -> Vec<u8> {
    let method = method.to_le_bytes();
    let mut i = 0;
    while i + 4 <= archive.len() {
        match &archive[i..i + 4] {
            b"PK\x03\x04" => archive[i + 8..i + 10].copy_from_slice(&method),
            b"PK\x01\x02" => archive[i + 10..i + 12].copy_from_slice(&method),
            _ => {}
        }
        i += 1;
    }
    archive
}

pub fn write_file(path: &Path, data: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(data).unwrap();
}
