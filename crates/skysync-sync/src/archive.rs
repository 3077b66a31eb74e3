//! Zip archive assembly for compressed folders
//!
//! A folder configured with `compress: true` uploads one deflate-compressed
//! zip per cycle instead of its individual files. The archive name is
//! deterministic (`<folder-name>.zip`), so consecutive cycles overwrite the
//! same remote file in place and the change detector's checksum comparison
//! decides whether an upload happens at all.
//!
//! Member names are the collected files' root-relative paths with `/`
//! separators; directories are implied by member paths and never written
//! as entries of their own.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use skysync_core::domain::{DomainError, LocalFileEntry};

/// Failures while assembling an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading a source file or writing the archive failed
    #[error("Archive I/O failure: {0}")]
    Io(#[from] io::Error),

    /// The zip writer rejected an entry
    #[error("Archive write failure: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive path could not be turned into an upload entry
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Builds `<folder_name>.zip` under `out_dir` from the collected files
///
/// Returns an upload entry for the finished archive. Blocking; async
/// callers should run this through `spawn_blocking`.
///
/// # Errors
/// Fails if any source file cannot be read or the archive cannot be
/// written. A partially written archive is removed before returning.
pub fn build_archive(
    folder_name: &str,
    files: &[LocalFileEntry],
    out_dir: &Path,
) -> Result<LocalFileEntry, ArchiveError> {
    let archive_path = out_dir.join(format!("{folder_name}.zip"));

    match write_archive(&archive_path, files) {
        Ok(()) => {
            debug!(
                archive = %archive_path.display(),
                members = files.len(),
                "Archive assembled"
            );
            Ok(LocalFileEntry::single_file(&archive_path)?)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&archive_path);
            Err(e)
        }
    }
}

fn write_archive(archive_path: &PathBuf, files: &[LocalFileEntry]) -> Result<(), ArchiveError> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let out = BufWriter::new(File::create(archive_path)?);
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        writer.start_file(member_name(&file.relative), options)?;
        let mut src = File::open(&file.absolute)?;
        io::copy(&mut src, &mut writer)?;
    }

    writer.finish()?.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}

/// Renders a relative path as a zip member name with `/` separators
fn member_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Unit tests
// ============================================================================
