use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing source roots.
///
/// Walks a directory for `.rs` files, skipping `target` and hidden
/// directories (those starting with `.`). Files come back sorted so that
/// every run visits them in the same order.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::scanner::FileScanner;
///
/// let result = FileScanner::new("./my-api/src").scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
#[derive(Debug)]
pub struct ScanResult {
    /// Paths to all discovered `.rs` files, sorted
    pub rust_files: Vec<PathBuf>,
    /// Entries that could not be read (e.g. permission denied)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Collect every `.rs` file below the root.
    ///
    /// Unreadable entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root itself is not a readable directory.
    pub fn scan(&self) -> Result<ScanResult> {
        let meta = std::fs::metadata(&self.root_path)
            .with_context(|| format!("Failed to access source root: {}", self.root_path.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("Source root is not a directory: {}", self.root_path.display());
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some("rs")
                    {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!(
            "Found {} Rust files under {}",
            rust_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

/// `file` relative to `root`, or unchanged when it lies elsewhere.
pub fn relative_path(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.to_path_buf())
}
