//! Catalog of the local mirror
//!
//! This module handles:
//! - The image record and catalog data model (data.rs)
//! - The registry of decodable formats (formats.rs)
//! - Walking the mirror and decoding image headers (scanner.rs)

pub mod data;
pub mod formats;
pub mod scanner;

pub use data::{Catalog, ImageRecord};
pub use formats::{Format, FormatRegistry};
pub use scanner::{build_catalog, CatalogBuilder, ScanError};
