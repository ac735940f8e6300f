//! Content-addressed fetch cache
//!
//! Predicts where the store will put an artifact and only downloads when
//! that path does not exist yet. Store paths are never overwritten; a path
//! that exists is complete.
//!
//! # Fetch States
//!
//! | State | Loader | Import |
//! |-------|--------|--------|
//! | Hit | not called | none |
//! | Miss | called | `nix-store --add-fixed` |
//! | Miss (raced) | called | skipped, path appeared meanwhile |

pub mod checksum;
pub mod fetch;
pub mod handle;
pub mod locator;

pub use checksum::Checksum;
pub use fetch::{
    derivation_name, CacheOutcome, FetchCache, FetchReport, FetchRequest, FetchResult,
};
pub use handle::ArchiveHandle;
pub use locator::Locator;
