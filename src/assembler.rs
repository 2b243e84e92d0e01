use crate::error::{MediaError, Result};
use crate::extractor::ExtractedFragment;
use crate::notifier::Notifier;
use crate::path_guard::PathGuard;
use crate::tools::ToolRunner;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of a joined multi-file image.
pub const JOINED_EXTENSION: &str = "img";

/// The single pre-conversion image of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledImage {
    pub path: PathBuf,
    /// Number of fragments joined into `path`; 1 when the fragment was used as-is.
    pub fragments: usize,
}

/// Joins multi-part volumes with `dasdcopy -lfs`.
pub struct ImageAssembler<'a> {
    runner: &'a dyn ToolRunner,
    dasdcopy: &'a Path,
    guard: PathGuard<'a>,
    notifier: &'a Notifier,
}

/// `dest/V001_1` -> `dest/V001.img`
pub fn join_target(first_fragment: &Path) -> PathBuf {
    let name = first_fragment
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('_').next().unwrap_or_default();
    first_fragment.with_file_name(format!("{}.{}", stem, JOINED_EXTENSION))
}

impl<'a> ImageAssembler<'a> {
    pub fn new(runner: &'a dyn ToolRunner, dasdcopy: &'a Path, notifier: &'a Notifier) -> Self {
        Self {
            runner,
            dasdcopy,
            guard: PathGuard::new(notifier),
            notifier,
        }
    }

    /// Turns the sorted fragments of `unit` into one image.
    ///
    /// A single fragment is returned untouched. Several fragments are joined into
    /// [`join_target`] of the first one, which `dasdcopy` uses to find its siblings;
    /// the fragments are deleted once the join succeeds or is refused by the path guard,
    /// and left in place when `dasdcopy` itself fails.
    pub fn assemble(
        &self,
        unit: &str,
        fragments: &[ExtractedFragment],
        overwrite: bool,
    ) -> Result<AssembledImage> {
        let first = match fragments {
            [] => {
                return Err(MediaError::NoImagesExtracted {
                    unit: unit.to_string(),
                })
            }
            [only] => {
                self.notifier.progress(&format!(
                    "Found single-file image: {}",
                    display_name(&only.path)
                ));
                return Ok(AssembledImage {
                    path: only.path.clone(),
                    fragments: 1,
                });
            }
            [first, ..] => &first.path,
        };

        let target = join_target(first);
        self.notifier.progress(&format!(
            "Found multi-file image, converting to single-file: {}",
            display_name(&target)
        ));

        let replace = match self.guard.check(&target, overwrite) {
            Ok(replace) => replace,
            Err(e) => {
                // Nothing was joined; the fragments are of no further use.
                remove_fragments(fragments);
                return Err(e);
            }
        };

        let mut args: Vec<OsString> = vec!["-q".into()];
        if replace {
            args.push("-r".into());
        }
        args.push("-lfs".into());
        args.push(first.into());
        args.push(target.clone().into());

        let spinner = self.notifier.spinner(&format!("Joining {}", display_name(&target)));
        let joined = self.runner.run(self.dasdcopy, &args);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        if let Err(e) = joined {
            self.notifier.warn(&format!(
                "Join failed, leaving {} fragment(s) of {} for recovery",
                fragments.len(),
                unit
            ));
            return Err(e);
        }

        for fragment in fragments {
            fs::remove_file(&fragment.path).map_err(|e| MediaError::io(&fragment.path, e))?;
        }

        Ok(AssembledImage {
            path: target,
            fragments: fragments.len(),
        })
    }
}

fn remove_fragments(fragments: &[ExtractedFragment]) {
    for fragment in fragments {
        let _ = fs::remove_file(&fragment.path);
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
