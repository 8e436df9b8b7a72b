//! Output directory safety checks and guarded file writes.
//!
//! All filesystem writes of the pipeline go through this module. It rejects
//! well-known system directories as destinations, keeps every write lexically
//! inside the chosen output directory, and refuses to replace an entry of the
//! wrong kind (a file where a directory is needed, or the reverse).

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// System directories that may never be used as an output directory
/// (nor anything below them).
pub const DEFAULT_RESTRICTED_DIRS: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/lib", "/proc", "/sbin", "/sys", "/usr",
];

/// Kind of filesystem entry a path is required to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Errors raised while validating or writing into the output tree.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output directory is, or lies inside, a restricted system directory.
    #[error("refusing to write into restricted directory {path}")]
    RestrictedDirectory {
        /// The rejected output directory.
        path: PathBuf,
    },

    /// An entry of the wrong kind already exists at the target path.
    #[error("path conflict at {path}: expected a {expected} or nothing")]
    PathConflict {
        /// The conflicting path.
        path: PathBuf,
        /// What the pipeline needed at this path.
        expected: EntryKind,
    },

    /// A candidate path escapes the output directory.
    #[error("path {path} escapes output directory {root}")]
    OutsideOutputDir {
        /// The offending candidate path.
        path: PathBuf,
        /// The directory every write must stay within.
        root: PathBuf,
    },

    /// Filesystem error while inspecting, creating or writing a path.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a path conflict error.
    pub fn conflict(path: impl Into<PathBuf>, expected: EntryKind) -> Self {
        Self::PathConflict {
            path: path.into(),
            expected,
        }
    }
}

/// Validates and prepares the destination directory tree.
#[derive(Debug, Clone)]
pub struct OutputGuard {
    restricted: Vec<PathBuf>,
}

impl Default for OutputGuard {
    fn default() -> Self {
        Self::new(DEFAULT_RESTRICTED_DIRS.iter().map(PathBuf::from))
    }
}

impl OutputGuard {
    /// Creates a guard with a custom restricted-directory denylist.
    pub fn new<I, P>(restricted: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            restricted: restricted
                .into_iter()
                .map(|p| normalize_lexically(&p.into()))
                .collect(),
        }
    }

    /// Returns the configured denylist.
    #[must_use]
    pub fn restricted_dirs(&self) -> &[PathBuf] {
        &self.restricted
    }

    /// Resolves `dir` to a normalized absolute path and rejects restricted
    /// destinations.
    ///
    /// # Errors
    ///
    /// [`OutputError::RestrictedDirectory`] for denylisted directories,
    /// [`OutputError::Io`] if the current directory cannot be determined.
    pub fn check_output_dir(&self, dir: &Path) -> Result<PathBuf, OutputError> {
        let absolute = absolutize(dir)?;
        if self
            .restricted
            .iter()
            .any(|restricted| absolute.starts_with(restricted))
        {
            return Err(OutputError::RestrictedDirectory { path: absolute });
        }
        Ok(absolute)
    }

    /// Checks containment and entry kinds, then creates the output and
    /// assets directories.
    ///
    /// Existing directories are fine; an existing file where a directory is
    /// needed (or a directory where the page file goes) is a
    /// [`OutputError::PathConflict`]. Nothing is created unless every check
    /// passes.
    ///
    /// # Errors
    ///
    /// Any [`OutputError`] variant.
    #[instrument(skip_all, fields(output_dir = %output_dir.display()))]
    pub async fn prepare_output(
        &self,
        output_dir: &Path,
        page_file_path: &Path,
        assets_dir_path: &Path,
    ) -> Result<(), OutputError> {
        let root = self.check_output_dir(output_dir)?;
        let page_file_path = ensure_within(&root, page_file_path)?;
        let assets_dir_path = ensure_within(&root, assets_dir_path)?;

        expect_kind(&root, EntryKind::Directory).await?;
        expect_kind(&assets_dir_path, EntryKind::Directory).await?;
        expect_kind(&page_file_path, EntryKind::File).await?;

        tokio::fs::create_dir_all(&assets_dir_path)
            .await
            .map_err(|e| OutputError::io(&assets_dir_path, e))?;

        debug!(assets_dir = %assets_dir_path.display(), "output tree ready");
        Ok(())
    }
}

/// Joins `relative` onto `root` and verifies the result stays inside `root`.
///
/// # Errors
///
/// [`OutputError::OutsideOutputDir`] when the normalized path escapes.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, OutputError> {
    ensure_within(root, &root.join(relative))
}

/// Writes `bytes` to `root/file_name` after the same safety checks used when
/// preparing the output tree.
///
/// # Errors
///
/// [`OutputError::OutsideOutputDir`] for escaping names,
/// [`OutputError::PathConflict`] if a directory occupies the target,
/// [`OutputError::Io`] for write failures.
#[instrument(skip(root, bytes), fields(root = %root.display(), len = bytes.len()))]
pub async fn write_file(
    root: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, OutputError> {
    let path = resolve_within(root, file_name)?;
    if path == normalize_lexically(root) {
        return Err(OutputError::conflict(path, EntryKind::File));
    }
    expect_kind(&path, EntryKind::File).await?;

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| OutputError::io(&path, e))?;

    debug!(path = %path.display(), "file written");
    Ok(path)
}

fn ensure_within(root: &Path, candidate: &Path) -> Result<PathBuf, OutputError> {
    let root = normalize_lexically(root);
    let candidate = normalize_lexically(candidate);
    if candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(OutputError::OutsideOutputDir {
            path: candidate,
            root,
        })
    }
}

async fn expect_kind(path: &Path, expected: EntryKind) -> Result<(), OutputError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let matches = match expected {
                EntryKind::Directory => meta.is_dir(),
                EntryKind::File => meta.is_file(),
            };
            if matches {
                Ok(())
            } else {
                Err(OutputError::conflict(path, expected))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OutputError::io(path, e)),
    }
}

pub(crate) fn absolutize(path: &Path) -> Result<PathBuf, OutputError> {
    if path.is_absolute() {
        return Ok(normalize_lexically(path));
    }
    let cwd = std::env::current_dir().map_err(|e| OutputError::io(path, e))?;
    Ok(normalize_lexically(&cwd.join(path)))
}

/// Resolves `.` and `..` components without touching the filesystem.
/// `..` never climbs above the root.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_output_dir_rejects_restricted() {
        let guard = OutputGuard::default();
        for dir in ["/etc", "/sys", "/usr", "/usr/local/share", "/tmp/../etc"] {
            let result = guard.check_output_dir(Path::new(dir));
            assert!(
                matches!(result, Err(OutputError::RestrictedDirectory { .. })),
                "{dir} should be restricted, got {result:?}"
            );
        }
    }

    #[test]
    fn test_check_output_dir_accepts_regular_dir() {
        let temp = TempDir::new().unwrap();
        let guard = OutputGuard::default();
        let resolved = guard.check_output_dir(temp.path()).unwrap();
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_check_output_dir_custom_denylist() {
        let temp = TempDir::new().unwrap();
        let guard = OutputGuard::new([temp.path()]);
        let nested = temp.path().join("pages");
        assert!(matches!(
            guard.check_output_dir(&nested),
            Err(OutputError::RestrictedDirectory { .. })
        ));
        assert!(guard.check_output_dir(Path::new("/etc")).is_ok());
    }

    #[test]
    fn test_check_output_dir_relative_is_absolutized() {
        let guard = OutputGuard::new(Vec::<PathBuf>::new());
        let resolved = guard.check_output_dir(Path::new("some/./dir/..")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some"));
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(
            normalize_lexically(Path::new("/../../etc")),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn test_resolve_within_blocks_traversal() {
        let root = Path::new("/srv/out");
        for crafted in ["../secret", "a/../../secret", "../../../../etc/passwd"] {
            let result = resolve_within(root, crafted);
            assert!(
                matches!(result, Err(OutputError::OutsideOutputDir { .. })),
                "{crafted} escaped: {result:?}"
            );
        }
        assert_eq!(
            resolve_within(root, "a/../b.png").unwrap(),
            PathBuf::from("/srv/out/b.png")
        );
    }

    #[tokio::test]
    async fn test_prepare_output_creates_directories_idempotently() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let page = out.join("example.com.html");
        let assets = out.join("example.com_files");
        let guard = OutputGuard::new(Vec::<PathBuf>::new());

        guard.prepare_output(&out, &page, &assets).await.unwrap();
        assert!(assets.is_dir());
        guard.prepare_output(&out, &page, &assets).await.unwrap();
        assert!(assets.is_dir());
    }

    #[tokio::test]
    async fn test_prepare_output_file_where_dir_required() {
        let temp = TempDir::new().unwrap();
        let page = temp.path().join("example.com.html");
        let assets = temp.path().join("example.com_files");
        std::fs::write(&assets, b"not a directory").unwrap();
        let guard = OutputGuard::new(Vec::<PathBuf>::new());

        let result = guard.prepare_output(temp.path(), &page, &assets).await;
        assert!(matches!(
            result,
            Err(OutputError::PathConflict {
                expected: EntryKind::Directory,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_prepare_output_dir_where_page_file_goes() {
        let temp = TempDir::new().unwrap();
        let page = temp.path().join("example.com.html");
        let assets = temp.path().join("example.com_files");
        std::fs::create_dir(&page).unwrap();
        let guard = OutputGuard::new(Vec::<PathBuf>::new());

        let result = guard.prepare_output(temp.path(), &page, &assets).await;
        assert!(matches!(
            result,
            Err(OutputError::PathConflict {
                expected: EntryKind::File,
                ..
            })
        ));
        assert!(!assets.exists(), "nothing should be created on conflict");
    }

    #[tokio::test]
    async fn test_prepare_output_rejects_escaping_layout() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let page = out.join("page.html");
        let assets = out.join("../elsewhere_files");
        let guard = OutputGuard::new(Vec::<PathBuf>::new());

        let result = guard.prepare_output(&out, &page, &assets).await;
        assert!(matches!(result, Err(OutputError::OutsideOutputDir { .. })));
    }

    #[tokio::test]
    async fn test_write_file_writes_exact_bytes() {
        let temp = TempDir::new().unwrap();
        let bytes = [0u8, 159, 146, 150, 255];
        let path = write_file(temp.path(), "blob.bin", &bytes).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_write_file_rejects_directory_at_target() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("taken.png")).unwrap();
        let result = write_file(temp.path(), "taken.png", b"x").await;
        assert!(matches!(result, Err(OutputError::PathConflict { .. })));
    }

    #[tokio::test]
    async fn test_write_file_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("assets");
        std::fs::create_dir(&root).unwrap();
        let result = write_file(&root, "../escape.txt", b"x").await;
        assert!(matches!(result, Err(OutputError::OutsideOutputDir { .. })));
        assert!(!temp.path().join("escape.txt").exists());
    }
}
