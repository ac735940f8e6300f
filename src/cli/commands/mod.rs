//! CLI command implementations

pub mod config;
pub mod fetch;
pub mod path;
pub mod sanitize;

pub use config::execute as config;
pub use fetch::execute as fetch;
pub use path::execute as path;
pub use sanitize::execute as sanitize;
