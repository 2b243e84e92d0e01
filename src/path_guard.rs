use crate::error::{MediaError, Result};
use crate::notifier::Notifier;
use std::fs;
use std::path::Path;

/// Destination collision policy: existing files are never replaced silently.
///
/// Every destination write (fragments, join targets, converted images) is checked
/// immediately before it happens.
#[derive(Clone, Copy)]
pub struct PathGuard<'a> {
    notifier: &'a Notifier,
}

impl<'a> PathGuard<'a> {
    pub fn new(notifier: &'a Notifier) -> Self {
        Self { notifier }
    }

    /// Returns `true` when `path` exists and is about to be overwritten as requested,
    /// `false` when it does not exist. An existing path without `overwrite` is an error.
    pub fn check(&self, path: &Path, overwrite: bool) -> Result<bool> {
        // symlink_metadata so a dangling symlink still counts as occupied
        if fs::symlink_metadata(path).is_err() {
            self.notifier.trace(&format!("{} is free", path.display()));
            return Ok(false);
        }

        if overwrite {
            self.notifier.warn(&format!(
                "{} already exists, overwriting as requested",
                path.display()
            ));
            Ok(true)
        } else {
            // Reported once, by whoever prints the returned error
            Err(MediaError::PathExists {
                path: path.to_path_buf(),
            })
        }
    }
}
