//! Utility functions for path resolution and file handling

use crate::config::DirectoryLayout;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Suffix of the temporary file a media body is streamed into
pub const PARTIAL_SUFFIX: &str = ".part";

/// Check that a username can be used as a single directory name
///
/// Returns the trimmed username, or `None` if it is empty, contains a path
/// separator, or is `.`/`..`.
pub fn validate_username(username: &str) -> Option<&str> {
    let username = username.trim();
    if username.is_empty()
        || username == "."
        || username == ".."
        || username.contains('/')
        || username.contains('\\')
    {
        return None;
    }
    Some(username)
}

/// Date folder name for a run, `YYYY-MM-DD`
pub fn date_stamp(run_date: NaiveDate) -> String {
    run_date.format("%Y-%m-%d").to_string()
}

/// Destination directory for one username in one run
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use std::path::Path;
/// use story_dl::config::DirectoryLayout;
/// use story_dl::utils::user_directory;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// let dir = user_directory(Path::new("Downloads"), "alice", date, DirectoryLayout::UserAndDate);
/// assert_eq!(dir, Path::new("Downloads/alice/2024-03-09"));
/// ```
pub fn user_directory(
    base: &Path,
    username: &str,
    run_date: NaiveDate,
    layout: DirectoryLayout,
) -> PathBuf {
    let user_dir = base.join(username);
    match layout {
        DirectoryLayout::UserAndDate => user_dir.join(date_stamp(run_date)),
        DirectoryLayout::UserOnly => user_dir,
    }
}

/// Path of the temporary file used while `target` is being written
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Scoped ownership of a file that is still being written
///
/// The file is removed when the guard is dropped unless [`PartialFile::persist`]
/// moved it to its final path first. This covers early returns, errors and
/// cancellation alike.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    /// Take ownership of `path` for cleanup
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Path of the partial file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the finished file to `target` and disarm cleanup
    pub async fn persist(mut self, target: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, target).await?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Could not remove partial file")
                }
            }
        }
    }
}
