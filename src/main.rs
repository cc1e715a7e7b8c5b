use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::task;

use catpaper::catalog::{Catalog, CatalogBuilder, ScanError};
use catpaper::config::{Cli, Config, ConfigError};
use catpaper::logging;
use catpaper::mirror::{self, GitRemote};
use catpaper::server::{self, AppState, ServerError};

/// Anything that stops the process from serving
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No catalog can be published
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Background task failed: {0}")]
    Join(#[from] task::JoinError),
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("⚠️  Logging unavailable: {}", err);
    }

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "catpaper could not start");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), StartupError> {
    let config = Config::load(cli)?;
    let mirror_dir = config.mirror_dir()?;
    tracing::info!(mirror = %mirror_dir.display(), remote = %config.remote_url, "Starting catpaper");

    let builder = CatalogBuilder::new(config.registry()?);
    let remote = GitRemote::new(config.remote_url.clone());
    let catalog = prepare_catalog(remote, builder, mirror_dir.clone()).await?;

    let listener = server::bind(config.port).await?;
    let app = server::router(AppState::new(catalog, mirror_dir));

    if config.open_browser {
        let url = format!("http://localhost:{}", config.port);
        task::spawn_blocking(move || {
            if let Err(err) = open::that(&url) {
                tracing::error!(error = %err, %url, "Could not open browser");
            }
        });
    }

    server::run(listener, app, shutdown_signal()).await?;
    tracing::info!("Shut down");
    Ok(())
}

/// Synchronize the mirror, then scan it.
///
/// Runs on a blocking thread because both steps do disk and network I/O.
/// A failed synchronization only logs; whatever is on disk is still scanned.
async fn prepare_catalog(
    remote: GitRemote,
    builder: CatalogBuilder,
    mirror_dir: PathBuf,
) -> Result<Catalog, StartupError> {
    let catalog = task::spawn_blocking(move || {
        if let Err(err) = mirror::synchronize(&remote, &mirror_dir) {
            tracing::error!(error = %err, "Mirror synchronization failed; serving local copy");
        }
        builder.build(&mirror_dir)
    })
    .await??;
    Ok(catalog)
}

/// Resolve on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_failed_sync_still_scans_local_copy() {
        let cache = TempDir::new().unwrap();
        let mirror_dir = cache.path().join("catpaper");
        fs::create_dir_all(mirror_dir.join("beach")).unwrap();
        image::RgbImage::new(600, 600)
            .save(mirror_dir.join("beach/dune.png"))
            .unwrap();

        // Not a git checkout, so the update fails
        let remote = GitRemote::new(cache.path().join("missing").to_string_lossy());
        let catalog = prepare_catalog(remote, CatalogBuilder::default(), mirror_dir)
            .await
            .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.group("beach").unwrap()[0].display_width(), 300);
    }

    #[tokio::test]
    async fn test_failed_first_fetch_serves_empty_catalog() {
        let cache = TempDir::new().unwrap();
        let remote = GitRemote::new(cache.path().join("missing").to_string_lossy());
        let mirror_dir = cache.path().join("catpaper");

        let catalog = prepare_catalog(remote, CatalogBuilder::default(), mirror_dir)
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }
}
