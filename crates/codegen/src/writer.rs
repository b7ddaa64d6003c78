use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crudforge_core::{ForgeError, ForgeResult};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::format::without_timestamp;
use crate::validate::{validate, OutputKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub dry_run: bool,
    pub skip_validation: bool,
}

impl WriteOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteStatus::Created => "created",
            WriteStatus::Updated => "updated",
            WriteStatus::Unchanged => "unchanged",
            WriteStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Outcome of one file write. `success` is only set once the rename onto the
/// target has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub path: PathBuf,
    pub success: bool,
    pub status: WriteStatus,
    pub bytes: usize,
    pub error: Option<String>,
    pub dry_run: bool,
}

impl WriteResult {
    fn done(path: &Path, status: WriteStatus, bytes: usize, dry_run: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            success: true,
            status,
            bytes,
            error: None,
            dry_run,
        }
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            success: true,
            status: WriteStatus::Skipped,
            bytes: 0,
            error: Some(reason.into()),
            dry_run: false,
        }
    }

    fn failed(path: &Path, error: &ForgeError) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            status: WriteStatus::Skipped,
            bytes: 0,
            error: Some(error.to_string()),
            dry_run: false,
        }
    }
}

/// A rendered file waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub content: String,
    pub kind: OutputKind,
}

impl PendingFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let kind = OutputKind::for_path(&path);
        Self {
            path,
            content: content.into(),
            kind,
        }
    }
}

/// Content written to a temporary sibling of its target. Dropping it without
/// [`StagedFile::commit`] removes the temporary file and leaves the target
/// untouched.
pub struct StagedFile {
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedFile {
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Rename the staged file over its target
    pub fn commit(self) -> ForgeResult<()> {
        let target = self.target;
        self.file
            .persist(&target)
            .map_err(|e| ForgeError::filesystem(&target, e.error))?;
        Ok(())
    }
}

/// Validating writer that replaces targets by rename, never in place
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicWriter;

impl AtomicWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, path: &Path, text: &str, options: WriteOptions) -> ForgeResult<WriteResult> {
        let kind = OutputKind::for_path(path);
        if !options.skip_validation {
            check(path, text, kind)?;
        }

        let status = match read_existing(path)? {
            None => WriteStatus::Created,
            Some(existing) if without_timestamp(&existing) == without_timestamp(text) => {
                tracing::debug!("{} unchanged", path.display());
                return Ok(WriteResult::done(
                    path,
                    WriteStatus::Unchanged,
                    text.len(),
                    options.dry_run,
                ));
            }
            Some(_) => WriteStatus::Updated,
        };

        if options.dry_run {
            return Ok(WriteResult::done(path, status, text.len(), true));
        }

        self.stage(path, text)?.commit()?;
        tracing::info!("{} {}", status, path.display());
        Ok(WriteResult::done(path, status, text.len(), false))
    }

    /// Write `text` to a temporary file next to `path`, flushed and synced
    pub fn stage(&self, path: &Path, text: &str) -> ForgeResult<StagedFile> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| ForgeError::filesystem(&parent, e))?;

        let mut file =
            NamedTempFile::new_in(&parent).map_err(|e| ForgeError::filesystem(&parent, e))?;
        fill(&mut file, text).map_err(|e| ForgeError::filesystem(path, e))?;

        Ok(StagedFile {
            target: path.to_path_buf(),
            file,
        })
    }

    /// Validate every file before writing any of them. A validation failure
    /// aborts with nothing written; filesystem failures after that point are
    /// reported on the affected file and the rest still proceed.
    pub fn write_batch(
        &self,
        files: &[PendingFile],
        options: WriteOptions,
    ) -> ForgeResult<Vec<WriteResult>> {
        if !options.skip_validation {
            for file in files {
                check(&file.path, &file.content, file.kind)?;
            }
        }

        let per_file = WriteOptions {
            skip_validation: true,
            ..options
        };
        let results = files
            .iter()
            .map(|file| match self.write(&file.path, &file.content, per_file) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("failed to write {}: {}", file.path.display(), e);
                    WriteResult::failed(&file.path, &e)
                }
            })
            .collect();
        Ok(results)
    }
}

fn fill(file: &mut NamedTempFile, text: &str) -> std::io::Result<()> {
    file.write_all(text.as_bytes())?;
    file.flush()?;
    file.as_file().sync_all()
}

fn check(path: &Path, text: &str, kind: OutputKind) -> ForgeResult<()> {
    let validation = validate(text, kind);
    for warning in &validation.warnings {
        tracing::warn!("{}: {}", path.display(), warning);
    }
    if validation.valid {
        Ok(())
    } else {
        Err(ForgeError::validation(path, validation.diagnostics))
    }
}

fn read_existing(path: &Path) -> ForgeResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ForgeError::filesystem(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = "pub fn ok() {}\n";

    #[test]
    fn test_creates_parents_and_reports_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/ok.rs");
        let result = AtomicWriter::new()
            .write(&path, GOOD, WriteOptions::default())
            .unwrap();
        assert_eq!(result.status, WriteStatus::Created);
        assert!(result.success);
        assert_eq!(result.bytes, GOOD.len());
        assert_eq!(fs::read_to_string(&path).unwrap(), GOOD);
    }

    #[test]
    fn test_second_write_is_unchanged_then_updated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.rs");
        let writer = AtomicWriter::new();
        writer.write(&path, GOOD, WriteOptions::default()).unwrap();

        let again = writer.write(&path, GOOD, WriteOptions::default()).unwrap();
        assert_eq!(again.status, WriteStatus::Unchanged);

        let changed = writer
            .write(&path, "pub fn other() {}\n", WriteOptions::default())
            .unwrap();
        assert_eq!(changed.status, WriteStatus::Updated);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/ok.rs");
        let result = AtomicWriter::new()
            .write(&path, GOOD, WriteOptions::dry_run())
            .unwrap();
        assert!(result.dry_run);
        assert_eq!(result.status, WriteStatus::Created);
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn test_invalid_text_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.rs");
        let err = AtomicWriter::new()
            .write(&path, "pub fn bad() {\n", WriteOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(!path.exists());
    }

    #[test]
    fn test_abandoned_stage_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.rs");
        let writer = AtomicWriter::new();
        writer.write(&path, GOOD, WriteOptions::default()).unwrap();

        let staged = writer.stage(&path, "pub fn replaced() {}\n").unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), GOOD);
    }

    #[test]
    fn test_batch_validates_everything_first() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            PendingFile::new(dir.path().join("a.rs"), GOOD),
            PendingFile::new(dir.path().join("b.rs"), "fn broken( {}\n"),
        ];
        let err = AtomicWriter::new()
            .write_batch(&files, WriteOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
