//! Find and remove Python bytecode caches (`__pycache__` directories) from a
//! directory tree.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

pub use crate::removal::{Removal, rm_rf};

mod removal;

/// The directory name CPython uses for bytecode caches.
pub const CACHE_DIR_NAME: &str = "__pycache__";

/// An error raised while sweeping a directory tree.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The tree could not be read, e.g., because the root is missing or a
    /// directory lacks read permissions.
    #[error("Failed to read `{}`", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    /// A matched cache directory could not be removed.
    #[error("Failed to remove `{}`", path.display())]
    Removal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Observes a sweep in progress.
pub trait SweepReporter: Send + Sync {
    /// Called with the path of a cache directory immediately before it is removed.
    fn on_remove(&self, path: &Path);
}

/// Removes every [`CACHE_DIR_NAME`] directory beneath a root directory.
#[derive(Debug, Clone)]
pub struct Sweeper {
    /// The directory at which the traversal starts.
    root: PathBuf,
}

impl Sweeper {
    /// Create a sweeper rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the root of the sweep.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree rooted at [`Self::root`], removing every cache directory
    /// along with all of its contents.
    ///
    /// The traversal is top-down: a matched directory is removed as soon as it
    /// is yielded, and its subtree is dropped from the walk first, so the
    /// walker never descends into paths that no longer exist. A cache directory
    /// nested inside another cache directory is removed with its parent and not
    /// reported separately. The root itself is never a candidate, even when it
    /// is named [`CACHE_DIR_NAME`]; only directories beneath it are matched.
    ///
    /// The first traversal or removal failure aborts the sweep.
    pub fn sweep(&self, reporter: Option<&dyn SweepReporter>) -> Result<Removal, SweepError> {
        let mut summary = Removal::default();
        let mut walker = WalkDir::new(&self.root).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|err| SweepError::Traversal {
                path: err
                    .path()
                    .map_or_else(|| self.root.clone(), Path::to_path_buf),
                source: err,
            })?;

            if entry.depth() == 0 || !entry.file_type().is_dir() {
                continue;
            }
            if entry.file_name() != CACHE_DIR_NAME {
                continue;
            }

            // Drop the subtree from the walk before deleting it; the walker
            // must not descend into a directory that is about to disappear.
            walker.skip_current_dir();

            if let Some(reporter) = reporter {
                reporter.on_remove(entry.path());
            }

            debug!("Removing cache directory: {}", entry.path().display());
            summary += rm_rf(entry.path()).map_err(|source| SweepError::Removal {
                path: entry.path().to_path_buf(),
                source,
            })?;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use anyhow::Result;

    use super::*;

    /// Records the path of every reported removal.
    #[derive(Default)]
    struct CollectingReporter(Mutex<Vec<PathBuf>>);

    impl CollectingReporter {
        fn paths(&self) -> Vec<PathBuf> {
            self.0.lock().unwrap().clone()
        }
    }

    impl SweepReporter for CollectingReporter {
        fn on_remove(&self, path: &Path) {
            self.0.lock().unwrap().push(path.to_path_buf());
        }
    }

    fn write(path: &Path, contents: &str) -> Result<()> {
        fs_err::create_dir_all(path.parent().unwrap())?;
        fs_err::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn removes_all_cache_directories() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        write(&root.join("a/__pycache__/mod.cpython-312.pyc"), "bytecode")?;
        write(&root.join("a/b/__pycache__/util.cpython-312.pyc"), "bytecode")?;
        write(&root.join("c/file.txt"), "content")?;

        let reporter = CollectingReporter::default();
        let summary = Sweeper::new(root).sweep(Some(&reporter))?;

        assert!(!root.join("a/__pycache__").exists());
        assert!(!root.join("a/b/__pycache__").exists());
        assert!(root.join("a/b").exists());
        assert_eq!(fs_err::read_to_string(root.join("c/file.txt"))?, "content");

        let mut reported = reporter.paths();
        reported.sort();
        assert_eq!(
            reported,
            vec![root.join("a/__pycache__"), root.join("a/b/__pycache__")]
        );
        assert_eq!(summary.num_dirs, 2);
        assert_eq!(summary.num_files, 2);

        Ok(())
    }

    #[test]
    fn nested_contents_removed_in_one_call() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        write(&root.join("pkg/__pycache__/x.pyc"), "x")?;
        write(&root.join("pkg/__pycache__/sub/deep/y.pyc"), "y")?;

        let reporter = CollectingReporter::default();
        let summary = Sweeper::new(root).sweep(Some(&reporter))?;

        assert!(!root.join("pkg/__pycache__").exists());
        assert_eq!(reporter.paths(), vec![root.join("pkg/__pycache__")]);
        assert_eq!(summary.num_dirs, 3);
        assert_eq!(summary.num_files, 2);

        Ok(())
    }

    #[test]
    fn cache_inside_cache_reported_once() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        write(&root.join("pkg/__pycache__/__pycache__/x.pyc"), "x")?;

        let reporter = CollectingReporter::default();
        Sweeper::new(root).sweep(Some(&reporter))?;

        assert!(!root.join("pkg/__pycache__").exists());
        assert_eq!(reporter.paths(), vec![root.join("pkg/__pycache__")]);

        Ok(())
    }

    #[test]
    fn no_matches_reports_nothing() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        write(&root.join("a/module.py"), "pass")?;
        write(&root.join("b/data.json"), "{}")?;

        let reporter = CollectingReporter::default();
        let summary = Sweeper::new(root).sweep(Some(&reporter))?;

        assert!(reporter.paths().is_empty());
        assert_eq!(summary.num_dirs, 0);
        assert_eq!(summary.num_files, 0);
        assert!(root.join("a/module.py").exists());
        assert!(root.join("b/data.json").exists());

        Ok(())
    }

    #[test]
    fn sweep_twice_is_idempotent() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path();
        write(&root.join("a/__pycache__/mod.pyc"), "bytecode")?;

        let sweeper = Sweeper::new(root);
        sweeper.sweep(None)?;

        let reporter = CollectingReporter::default();
        let summary = sweeper.sweep(Some(&reporter))?;

        assert!(reporter.paths().is_empty());
        assert_eq!(summary.num_dirs, 0);
        assert_eq!(summary.num_files, 0);

        Ok(())
    }

    #[test]
    fn missing_root_is_a_traversal_error() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("nonexistent");

        let reporter = CollectingReporter::default();
        let err = Sweeper::new(&root)
            .sweep(Some(&reporter))
            .expect_err("sweeping a missing root should fail");

        assert!(matches!(err, SweepError::Traversal { .. }));
        assert!(reporter.paths().is_empty(), "nothing should be removed");

        Ok(())
    }

    #[test]
    fn root_is_never_a_candidate() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("__pycache__");
        write(&root.join("pkg/__pycache__/x.pyc"), "x")?;

        let reporter = CollectingReporter::default();
        Sweeper::new(&root).sweep(Some(&reporter))?;

        assert!(root.exists(), "the root itself must not be removed");
        assert!(!root.join("pkg/__pycache__").exists());
        assert_eq!(reporter.paths(), vec![root.join("pkg/__pycache__")]);

        Ok(())
    }
}
