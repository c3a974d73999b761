pub mod catalog;
pub mod classify;
pub mod config;
pub mod cover;
pub mod covers;
pub mod epub;
pub mod error;
pub mod metadata;
pub mod placeholder;
pub mod progress;
pub mod scan;
pub mod security;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::catalog::{generate_catalog, Book, Catalog, CatalogOptions, Collection};
    pub use crate::covers::{extract_all_covers, CoverOptions, CoverOutcome, CoverReport};
    pub use crate::error::*;
    pub use crate::progress::{ProgressEvent, ProgressHandler, Stage};
}
