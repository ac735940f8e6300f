//! Sanitize command - print a derivation name

use crate::cli::args::SanitizeArgs;
use crate::error::FodResult;
use crate::store::sanitize_derivation_name;

/// Execute the sanitize command
pub async fn execute(args: SanitizeArgs) -> FodResult<()> {
    println!("{}", sanitize_derivation_name(&args.raw));
    Ok(())
}
