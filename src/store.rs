//! Artifact store: filesystem roots and per-invocation scratch space.
//!
//! The store owns three directory roots — uploads, converted output, and
//! temp scratch — and is the only component that names files inside them.
//! Every temp directory and every output filename embeds a uniqueness
//! token (millisecond timestamp plus a random alphanumeric tag), which is
//! what makes concurrent requests race-free without any locking.

use crate::error::ConvertError;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Length of the random part of a uniqueness token.
const TOKEN_TAG_LEN: usize = 6;

/// Owns the upload, output, and temp directory roots.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_root: PathBuf,
    output_root: PathBuf,
    temp_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(
        upload_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_root: upload_root.into(),
            output_root: output_root.into(),
            temp_root: temp_root.into(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Create the three roots if they do not exist yet.
    ///
    /// Idempotent; called once before the engine accepts requests, and
    /// safe to call again at any time.
    pub fn ensure_directories(&self) -> Result<(), ConvertError> {
        for root in [&self.upload_root, &self.output_root, &self.temp_root] {
            std::fs::create_dir_all(root).map_err(|source| ConvertError::OutputWriteFailed {
                path: root.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Millisecond timestamp plus a short random tag.
    ///
    /// Two invocations in the same millisecond still diverge on the tag.
    fn unique_token() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let tag: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_TAG_LEN)
            .map(char::from)
            .collect();
        format!("{millis}-{tag}")
    }

    /// Create a scratch directory exclusive to one engine invocation.
    pub fn create_temp_dir(&self) -> Result<PathBuf, ConvertError> {
        let dir = self.temp_root.join(Self::unique_token());
        std::fs::create_dir_all(&dir).map_err(|source| ConvertError::OutputWriteFailed {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "created scratch directory");
        Ok(dir)
    }

    /// Reserve a collision-free output path for a converted artifact.
    ///
    /// Returns `(path, file_name)` shaped as
    /// `{base}_{token}_converted.{ext}` inside the output root.
    pub fn allocate_output(&self, base_name: &str, extension: &str) -> (PathBuf, String) {
        let file_name = format!("{base_name}_{}_converted.{extension}", Self::unique_token());
        let path = self.output_root.join(&file_name);
        (path, file_name)
    }

    /// Like [`allocate_output`](Self::allocate_output) but for one page of
    /// a multi-page conversion; all pages of one invocation share `token`.
    pub fn allocate_page_output(
        &self,
        base_name: &str,
        token: &str,
        page: u32,
        extension: &str,
    ) -> (PathBuf, String) {
        let file_name = format!("{base_name}_{token}_page_{page}.{extension}");
        let path = self.output_root.join(&file_name);
        (path, file_name)
    }

    /// A fresh token for callers that name several outputs themselves.
    pub fn new_token(&self) -> String {
        Self::unique_token()
    }

    /// Move a finished file from scratch space into the output root.
    ///
    /// Rename first; if the roots sit on different filesystems, fall back
    /// to copy-then-remove.
    pub fn move_into_output(&self, src: &Path, dest: &Path) -> Result<(), ConvertError> {
        if std::fs::rename(src, dest).is_ok() {
            return Ok(());
        }
        std::fs::copy(src, dest).map_err(|source| ConvertError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source,
        })?;
        if let Err(e) = std::fs::remove_file(src) {
            warn!(src = %src.display(), error = %e, "could not remove moved source file");
        }
        Ok(())
    }

    /// Remove an invocation's scratch directory.
    ///
    /// Best-effort: a cleanup failure is logged and swallowed so it can
    /// never mask the conversion's own outcome.
    pub fn remove_temp_dir(&self, dir: &Path) {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), error = %e, "failed to remove scratch directory");
            }
        }
    }

    /// Delete a consumed input artifact from the upload root.
    ///
    /// Best-effort for the same reason as [`remove_temp_dir`](Self::remove_temp_dir).
    pub fn delete_input(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to delete input artifact");
            }
        }
    }
}
