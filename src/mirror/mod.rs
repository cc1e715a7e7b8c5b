//! Local mirror of the remote wallpaper collection
//!
//! This module handles:
//! - Deciding whether the mirror has been synchronized before
//! - First-run full fetch and later incremental updates
//! - The git-backed remote source (git.rs)

pub mod git;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use self::git::GitRemote;

/// Default collection mirrored when no remote is configured
pub const DEFAULT_REMOTE: &str = "https://github.com/catppuccin/wallpapers.git";

/// Boxed error returned by a remote source
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while synchronizing the mirror
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The first fetch into an absent mirror could not complete
    #[error("Failed to fetch {url} into {path}: {source}")]
    FetchFailed {
        url: String,
        path: PathBuf,
        #[source]
        source: SourceError,
    },
    /// Updating an existing mirror failed
    #[error("Failed to update mirror at {path}: {source}")]
    UpdateFailed {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
}

/// Whether the local directory already holds a synchronized mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Never synchronized: missing, or an empty directory left by an interrupted fetch
    Absent,
    /// Synchronized at least once, possibly stale
    Present,
}

impl MirrorState {
    pub fn detect(path: &Path) -> Self {
        if !path.exists() {
            return MirrorState::Absent;
        }
        match fs::read_dir(path) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    MirrorState::Absent
                } else {
                    MirrorState::Present
                }
            }
            // Unreadable: let the update report the real error
            Err(_) => MirrorState::Present,
        }
    }
}

/// Result of an incremental update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The remote had nothing new
    UpToDate,
    /// The local branch moved forward to the remote head
    FastForwarded { from: String, to: String },
}

/// Result of a successful synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned,
    Updated(UpdateOutcome),
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Cloned => write!(f, "cloned"),
            SyncOutcome::Updated(UpdateOutcome::UpToDate) => write!(f, "already up to date"),
            SyncOutcome::Updated(UpdateOutcome::FastForwarded { from, to }) => {
                write!(f, "fast-forwarded {} -> {}", short(from), short(to))
            }
        }
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// The remote-fetch capability the synchronizer drives
pub trait RemoteSource {
    /// Identifier of the remote, used in logs and errors
    fn url(&self) -> &str;

    /// Full fetch into an existing, empty directory
    fn fetch_into(&self, path: &Path) -> Result<(), SourceError>;

    /// Incremental update of a mirror previously created by `fetch_into`
    fn update(&self, path: &Path) -> Result<UpdateOutcome, SourceError>;
}

/// Make sure `path` holds an up-to-date copy of `source`.
///
/// An absent mirror is created and fully fetched; a present one is updated
/// in place. "Already up to date" is a success. Nothing outside `path` is
/// written.
pub fn synchronize<S: RemoteSource + ?Sized>(
    source: &S,
    path: &Path,
) -> Result<SyncOutcome, SyncError> {
    let outcome = match MirrorState::detect(path) {
        MirrorState::Absent => {
            let fetch_failed = |err: SourceError| SyncError::FetchFailed {
                url: source.url().to_string(),
                path: path.to_path_buf(),
                source: err,
            };
            fs::create_dir_all(path).map_err(|err| fetch_failed(err.into()))?;
            tracing::info!(
                url = source.url(),
                path = %path.display(),
                "Initializing cache, subsequent runs should be faster..."
            );
            source.fetch_into(path).map_err(fetch_failed)?;
            SyncOutcome::Cloned
        }
        MirrorState::Present => {
            tracing::debug!(url = source.url(), path = %path.display(), "Updating mirror");
            let update = source.update(path).map_err(|err| SyncError::UpdateFailed {
                path: path.to_path_buf(),
                source: err,
            })?;
            SyncOutcome::Updated(update)
        }
    };

    tracing::info!(path = %path.display(), outcome = %outcome, "Mirror synchronized");
    Ok(outcome)
}
