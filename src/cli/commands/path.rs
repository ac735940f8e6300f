//! Path command - print a predicted store path

use crate::cli::args::PathArgs;
use crate::config::Config;
use crate::error::FodResult;
use crate::store::compute_fixed_output_store_path;

/// Execute the path command
pub async fn execute(args: PathArgs, config: &Config) -> FodResult<()> {
    let algorithm = args.algorithm.unwrap_or(config.store.hash_algorithm);
    let store_root = args.store_root.as_deref().unwrap_or(&config.store.root);

    let path = compute_fixed_output_store_path(&args.name, &args.checksum, algorithm, store_root);
    println!("{}", path);
    Ok(())
}
