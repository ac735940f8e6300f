//! Store path prediction and import
//!
//! Paths in a content-addressed store are a pure function of a name and a
//! content hash, which is what lets the fetch cache check for an artifact
//! before downloading it.
//!
//! # Path derivation
//!
//! | Step | Value |
//! |------|-------|
//! | inner | `sha256("fixed:out:<algo>:<hex>:")` |
//! | outer | `sha256("output:out:sha256:<hex(inner)>:<store>:<name>")` |
//! | id | `base32(compress(outer, 20))` |
//! | path | `<store>/<id>-<name>` |

pub mod base32;
pub mod import;
pub mod path;

pub use import::StoreImporter;
pub use path::{
    compute_fixed_output_store_path, sanitize_derivation_name, strip_namespace, HashAlgorithm,
    StorePath, CHECKSUM_NAMESPACE,
};
