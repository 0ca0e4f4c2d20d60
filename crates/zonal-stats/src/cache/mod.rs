//! Caching for parsed watershed layers.

mod watershed_cache;

pub use watershed_cache::{content_key, WatershedCache};
