//! SHA-256 verification of build artifacts.
//!
//! A compute unit points at a pre-built package: either a single archive or a
//! directory. Composition never touches the filesystem, so the package is
//! first checked here, when an engine provisions the graph.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use hookstack_common::error::{HookstackError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Code digest of a verified artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDigest {
    hex: String,
    files: usize,
}

impl ArtifactDigest {
    /// Returns the hex-encoded digest.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Returns how many files went into the digest.
    #[must_use]
    pub const fn files(&self) -> usize {
        self.files
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.hex)
    }
}

/// Verifies that `path` exists and computes its code digest.
///
/// A file is hashed as is. A directory is hashed over every regular file
/// below it in sorted relative-path order, each path feeding the hash ahead
/// of its contents, so renaming a file changes the digest.
///
/// # Errors
///
/// Returns an error if the path does not exist, cannot be read, or is a
/// directory without any files.
pub fn verify(path: &Path) -> Result<ArtifactDigest> {
    tracing::debug!(path = %path.display(), "verifying artifact");
    let metadata = fs::metadata(path).map_err(|e| io_error(path, e))?;

    let mut hasher = Sha256::new();
    let files = if metadata.is_dir() {
        let mut entries = Vec::new();
        collect_files(path, &mut entries)?;
        if entries.is_empty() {
            return Err(HookstackError::Config {
                message: format!("artifact directory {} contains no files", path.display()),
            });
        }
        entries.sort();
        for entry in &entries {
            let relative = entry.strip_prefix(path).unwrap_or(entry);
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(fs::read(entry).map_err(|e| io_error(entry, e))?);
        }
        entries.len()
    } else {
        hasher.update(fs::read(path).map_err(|e| io_error(path, e))?);
        1
    };

    let digest = ArtifactDigest {
        hex: format!("{:x}", hasher.finalize()),
        files,
    };
    tracing::debug!(path = %path.display(), %digest, files, "artifact verified");
    Ok(digest)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
            collect_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> HookstackError {
    HookstackError::Io {
        path: path.to_path_buf(),
        source,
    }
}
