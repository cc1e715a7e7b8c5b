//! Mirror a wallpaper repository locally and browse it in the browser
//!
//! Module overview:
//! - `mirror` keeps the local git checkout current
//! - `catalog` scans the checkout into groups of images with display sizes
//! - `server` serves the browsing page over HTTP
//! - `config` and `logging` carry the runtime settings and tracing setup

pub mod catalog;
pub mod config;
pub mod logging;
pub mod mirror;
pub mod server;
