//! Git-backed remote source
//!
//! Clones the collection on first run and fast-forwards the checked-out
//! branch on later runs. Diverged local history is reported as an error
//! rather than merged.

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, RemoteCallbacks, Repository};
use std::path::Path;

use super::{RemoteSource, SourceError, UpdateOutcome};

/// Name of the remote created by the first clone
const ORIGIN: &str = "origin";

/// Log fetch progress every this many received objects
const PROGRESS_STEP: usize = 500;

/// A git repository reachable by URL (https, ssh, or a local path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    url: String,
}

impl GitRemote {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RemoteSource for GitRemote {
    fn url(&self) -> &str {
        &self.url
    }

    fn fetch_into(&self, path: &Path) -> Result<(), SourceError> {
        let repo = RepoBuilder::new()
            .fetch_options(fetch_options())
            .clone(&self.url, path)?;
        let head = repo.head()?;
        tracing::info!(
            branch = head.shorthand().unwrap_or("HEAD"),
            commit = %head.target().map(|id| id.to_string()).unwrap_or_default(),
            "Cloned mirror"
        );
        Ok(())
    }

    fn update(&self, path: &Path) -> Result<UpdateOutcome, SourceError> {
        let repo = Repository::open(path)?;

        // Only a checked-out branch can be fast-forwarded
        let head = repo.head()?;
        if !head.is_branch() {
            return Err("mirror HEAD is detached; cannot update".into());
        }
        let refname = head.name().ok_or("mirror branch name is not UTF-8")?.to_string();
        let branch = head.shorthand().ok_or("mirror branch name is not UTF-8")?.to_string();
        drop(head);

        // Fetch just the tracked branch into FETCH_HEAD
        let mut remote = repo.find_remote(ORIGIN)?;
        remote.fetch(&[branch.as_str()], Some(&mut fetch_options()), None)?;

        // Compare what arrived against the local branch
        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetched = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&fetched])?;

        if analysis.is_up_to_date() {
            return Ok(UpdateOutcome::UpToDate);
        }
        if !analysis.is_fast_forward() {
            return Err(format!("local branch {} has diverged from {}", branch, ORIGIN).into());
        }

        // Move the branch, then make the working tree match it
        let mut reference = repo.find_reference(&refname)?;
        let from = reference
            .target()
            .map(|id| id.to_string())
            .unwrap_or_default();
        let to = fetched.id();
        reference.set_target(to, "catpaper: fast-forward")?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;

        Ok(UpdateOutcome::FastForwarded {
            from,
            to: to.to_string(),
        })
    }
}

fn fetch_options() -> FetchOptions<'static> {
    // Large collections take a while; report progress at debug level
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|progress| {
        let received = progress.received_objects();
        if received > 0 && received % PROGRESS_STEP == 0 {
            tracing::debug!(
                received,
                total = progress.total_objects(),
                bytes = progress.received_bytes(),
                "Fetching objects"
            );
        }
        true
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{Oid, Signature};
    use std::fs;
    use tempfile::TempDir;

    /// Commit `files` on top of HEAD in a working (non-bare) repository
    pub(crate) fn commit_files(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (name, contents) in files {
            let path = workdir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Wallpaper Bot", "bot@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    pub(crate) fn origin_with(files: &[(&str, &[u8])]) -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_files(&repo, files, "initial");
        (dir, repo)
    }

    pub(crate) fn remote_for(dir: &TempDir) -> GitRemote {
        GitRemote::new(dir.path().to_string_lossy())
    }

    #[test]
    fn test_clone_then_up_to_date() {
        let (origin_dir, _origin) = origin_with(&[("mocha/cat.png", b"one")]);
        let remote = remote_for(&origin_dir);
        let local = TempDir::new().unwrap();

        remote.fetch_into(local.path()).unwrap();
        assert_eq!(fs::read(local.path().join("mocha/cat.png")).unwrap(), b"one");

        assert_eq!(remote.update(local.path()).unwrap(), UpdateOutcome::UpToDate);
    }

    #[test]
    fn test_update_fast_forwards() {
        let (origin_dir, origin) = origin_with(&[("mocha/cat.png", b"one")]);
        let remote = remote_for(&origin_dir);
        let local = TempDir::new().unwrap();
        remote.fetch_into(local.path()).unwrap();

        let before = origin.head().unwrap().target().unwrap();
        let after = commit_files(&origin, &[("latte/dog.png", b"two")], "add latte");

        let outcome = remote.update(local.path()).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::FastForwarded {
                from: before.to_string(),
                to: after.to_string(),
            }
        );
        assert_eq!(fs::read(local.path().join("latte/dog.png")).unwrap(), b"two");
    }

    #[test]
    fn test_diverged_history_is_rejected() {
        let (origin_dir, origin) = origin_with(&[("a.png", b"one")]);
        let remote = remote_for(&origin_dir);
        let local = TempDir::new().unwrap();
        remote.fetch_into(local.path()).unwrap();

        commit_files(&origin, &[("b.png", b"remote")], "remote change");
        let local_repo = Repository::open(local.path()).unwrap();
        commit_files(&local_repo, &[("c.png", b"local")], "local change");

        let err = remote.update(local.path()).unwrap_err();
        assert!(err.to_string().contains("diverged"));
        assert!(!local.path().join("b.png").exists());
    }

    #[test]
    fn test_update_outside_repository_fails() {
        let local = TempDir::new().unwrap();
        fs::write(local.path().join("stray.txt"), "not a checkout").unwrap();
        assert!(GitRemote::new("/does/not/matter").update(local.path()).is_err());
    }
}
