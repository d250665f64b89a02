//! Output naming, conflict handling and atomic publication
//!
//! Every output is first written to a hidden, owner-only staging file in the
//! target directory and then published under its final name. Publishing with
//! `Abort` or `RenameWithTimestamp` uses a hard link, which fails if the
//! target appeared in the meantime, so a concurrent run is never clobbered.

use crate::models::{OutputConflictPolicy, PemArtifactSet};
use crate::utils::{DecomposeError, ExportError};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix candidates tried per timestamp before giving up
const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Second-resolution local timestamp used for renamed outputs
pub fn timestamp_suffix() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// `<stem>-<suffix>.<ext>` next to `path`
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };
    path.with_file_name(name)
}

/// `ts`, `ts-1`, `ts-2`, ...
fn rename_suffixes(ts: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(ts.to_string())
        .chain((1..MAX_RENAME_ATTEMPTS).map(move |n| format!("{}-{}", ts, n)))
}

/// Apply `policy` to a PFX destination
pub fn resolve_pfx_destination(
    dest: &Path,
    policy: OutputConflictPolicy,
) -> Result<PathBuf, ExportError> {
    if !dest.exists() {
        return Ok(dest.to_path_buf());
    }

    match policy {
        OutputConflictPolicy::Abort => Err(ExportError::Conflict {
            path: dest.to_path_buf(),
        }),
        OutputConflictPolicy::Overwrite => Ok(dest.to_path_buf()),
        OutputConflictPolicy::RenameWithTimestamp => {
            let ts = timestamp_suffix();
            let resolved = rename_suffixes(&ts)
                .map(|suffix| with_suffix(dest, &suffix))
                .find(|candidate| !candidate.exists())
                .ok_or_else(|| ExportError::Conflict {
                    path: dest.to_path_buf(),
                });
            resolved
        }
    }
}

/// Apply `policy` to all four PEM outputs for `base` at once
pub fn resolve_pem_set(
    output_dir: &Path,
    base: &str,
    policy: OutputConflictPolicy,
) -> Result<PemArtifactSet, DecomposeError> {
    let set = PemArtifactSet::for_base(output_dir, base);
    let existing = first_existing(&set);

    let Some(existing) = existing else {
        return Ok(set);
    };

    match policy {
        OutputConflictPolicy::Abort => Err(DecomposeError::Conflict { path: existing }),
        OutputConflictPolicy::Overwrite => Ok(set),
        OutputConflictPolicy::RenameWithTimestamp => {
            let ts = timestamp_suffix();
            let resolved = rename_suffixes(&ts)
                .map(|suffix| PemArtifactSet::for_base(output_dir, &format!("{}-{}", base, suffix)))
                .find(|candidate| first_existing(candidate).is_none())
                .ok_or(DecomposeError::Conflict { path: existing });
            resolved
        }
    }
}

fn first_existing(set: &PemArtifactSet) -> Option<PathBuf> {
    set.paths()
        .into_iter()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// A staging file that becomes `target` on [`StagedFile::publish`].
///
/// Removed on drop if never published.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    temp: PathBuf,
    /// `target` currently holds this file's content
    placed: bool,
    published: bool,
}

impl StagedFile {
    /// Create an empty owner-only staging file next to `target`
    pub fn create(target: &Path) -> io::Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(&temp)?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            placed: false,
            published: false,
        })
    }

    /// Path of the staging file (handed to the toolchain as `-out`)
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Point the staging file at a different final name
    pub fn retarget(&mut self, target: PathBuf) {
        self.target = target;
    }

    /// Replace the staging file's contents
    pub fn write_all(&self, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.temp)?;
        file.write_all(data)?;
        file.sync_all()
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.temp)
    }

    /// Make the file world-readable (certificates, not keys)
    pub fn set_public(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.temp, std::fs::Permissions::from_mode(0o644))?;
        }
        Ok(())
    }

    /// Move the staging file to its target.
    ///
    /// Fails with `ErrorKind::AlreadyExists` when the target exists and the
    /// policy does not allow overwriting.
    pub fn publish(&mut self, policy: OutputConflictPolicy) -> io::Result<()> {
        self.place(policy)?;
        self.commit();
        Ok(())
    }

    /// Put the content at `target`, keeping the staging file for a retry
    /// unless the policy is `Overwrite`.
    fn place(&mut self, policy: OutputConflictPolicy) -> io::Result<()> {
        match policy {
            OutputConflictPolicy::Overwrite => {
                std::fs::rename(&self.temp, &self.target)?;
            }
            OutputConflictPolicy::Abort | OutputConflictPolicy::RenameWithTimestamp => {
                match std::fs::hard_link(&self.temp, &self.target) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(e),
                    Err(e) => {
                        tracing::debug!(
                            "Hard link unavailable for {} ({}), copying with exclusive create",
                            self.target.display(),
                            e
                        );
                        self.copy_exclusive()?;
                    }
                }
            }
        }
        self.placed = true;
        Ok(())
    }

    /// Remove the target again after a successful [`StagedFile::place`]
    fn unplace(&mut self) {
        if !self.placed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.target) {
            tracing::warn!("Failed to remove {}: {}", self.target.display(), e);
        }
        self.placed = false;
    }

    /// Drop the staging file once the target is final
    fn commit(&mut self) {
        match std::fs::remove_file(&self.temp) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove staging file {}: {}", self.temp.display(), e)
            }
        }
        self.published = true;
    }

    fn copy_exclusive(&self) -> io::Result<()> {
        let data = std::fs::read(&self.temp)?;
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mode = std::fs::metadata(&self.temp)?.permissions().mode();
            options.mode(mode & 0o777);
        }
        let mut file = options.open(&self.target)?;
        let written = file.write_all(&data).and_then(|()| file.sync_all());
        if written.is_err() {
            let _ = std::fs::remove_file(&self.target);
        }
        written
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.published {
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}

/// A target that could not be published
#[derive(Debug)]
pub struct PublishFailure {
    pub target: PathBuf,
    pub error: io::Error,
}

/// Publish `files` as one unit.
///
/// If any target cannot be placed, the ones already placed by this call are
/// removed and every staging file is kept, so the caller may retarget and
/// retry. Under `Overwrite` the staging files of placed targets are consumed.
pub fn publish_set(
    files: &mut [StagedFile],
    policy: OutputConflictPolicy,
) -> Result<(), PublishFailure> {
    for i in 0..files.len() {
        if let Err(error) = files[i].place(policy) {
            let target = files[i].target.clone();
            for placed in files[..i].iter_mut() {
                placed.unplace();
            }
            return Err(PublishFailure { target, error });
        }
    }
    for file in files.iter_mut() {
        file.commit();
    }
    Ok(())
}
