//! Directory scanner that turns a mirror checkout into a [`Catalog`]

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::data::{Catalog, ImageRecord};
use super::formats::{FormatRegistry, HeaderError, SNIFF_LEN};

/// Errors raised while scanning the mirror
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// No registered decoder accepts the file. Recovered inside the scan.
    #[error("Unsupported image format at {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
    /// Reading the tree or a file failed. Aborts the scan.
    #[error("Failed to read {path}: {source}")]
    IoFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ScanError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ScanError::IoFailure {
            path: path.to_path_buf(),
            source,
        }
    }

    fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        ScanError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// What the walk does with an entry below the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Process the file, or walk into the directory
    Descend,
    /// Skip a directory together with everything under it
    SkipSubtree,
    /// Skip this entry only
    SkipEntry,
}

/// Hidden entries (leading `.`) are excluded; hidden directories take their subtree with them
pub fn classify(name: &str, is_dir: bool) -> Visit {
    match (name.starts_with('.'), is_dir) {
        (false, _) => Visit::Descend,
        (true, true) => Visit::SkipSubtree,
        (true, false) => Visit::SkipEntry,
    }
}

/// Builds catalogs with a fixed set of formats
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    registry: FormatRegistry,
}

impl CatalogBuilder {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Walk `root` and decode every visible file.
    ///
    /// Files no decoder accepts are logged and skipped. Any other read error
    /// aborts the walk and no catalog is returned.
    pub fn build(&self, root: &Path) -> Result<Catalog, ScanError> {
        let mut catalog = Catalog::new();
        let mut skipped = 0usize;

        tracing::info!(root = %root.display(), formats = ?self.registry.names(), "Scanning mirror");

        // Sorted so the catalog comes out in the same order every run
        let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            // A walk error (unreadable directory, missing root) aborts the scan
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(root).to_path_buf();
                ScanError::IoFailure {
                    path,
                    source: err.into(),
                }
            })?;

            // The root is never classified, even if its own name is hidden
            if entry.depth() == 0 {
                if !entry.path().is_dir() {
                    return Err(ScanError::io(root, std::io::Error::other("not a directory")));
                }
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            match classify(&entry.file_name().to_string_lossy(), is_dir) {
                Visit::SkipSubtree => {
                    tracing::debug!(path = %entry.path().display(), "Skipping hidden directory");
                    walker.skip_current_dir();
                    continue;
                }
                Visit::SkipEntry => continue,
                // Directories only contribute their files
                Visit::Descend if is_dir => continue,
                Visit::Descend => {}
            }

            // Decode the header; unsupported files are not fatal
            match self.record_for(root, &entry) {
                Ok(record) => catalog.push(record),
                Err(ScanError::UnsupportedFormat { path, reason }) => {
                    tracing::warn!(path = %path.display(), %reason, "Format not registered, skipping");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            groups = catalog.group_count(),
            images = catalog.len(),
            skipped,
            "Scan complete"
        );

        Ok(catalog)
    }

    fn record_for(&self, root: &Path, entry: &DirEntry) -> Result<ImageRecord, ScanError> {
        let (width, height) = decode_dimensions(&self.registry, entry.path())?;
        Ok(ImageRecord::new(
            group_key(root, entry.path()),
            entry.file_name().to_string_lossy(),
            width,
            height,
        ))
    }
}

/// Scan `root` with the default formats (JPEG and PNG)
pub fn build_catalog(root: &Path) -> Result<Catalog, ScanError> {
    CatalogBuilder::default().build(root)
}

/// Read just enough of a file to learn its pixel dimensions
pub fn decode_dimensions(registry: &FormatRegistry, path: &Path) -> Result<(u32, u32), ScanError> {
    let file = File::open(path).map_err(|err| ScanError::io(path, err))?;
    let mut reader = BufReader::new(file);

    // Peek at the magic bytes, then rewind for the decoder
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut reader)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|err| ScanError::io(path, err))?;
    reader.rewind().map_err(|err| ScanError::io(path, err))?;

    let format = registry
        .sniff(&head)
        .ok_or_else(|| ScanError::unsupported(path, "unknown signature"))?;

    let (width, height) = format.dimensions(reader).map_err(|err| match err {
        HeaderError::Format(err) => ScanError::unsupported(path, format!("{}: {}", format.name, err)),
        HeaderError::Io(err) => ScanError::io(path, err),
    })?;

    // Zero-sized images have no usable geometry
    if width == 0 || height == 0 {
        return Err(ScanError::unsupported(path, format!("{}: empty image", format.name)));
    }

    Ok((width, height))
}

/// Directory of `path` relative to `root`, `/`-joined ("" for files in the root)
fn group_key(root: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
