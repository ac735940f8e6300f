//! Fetch command - fetch package archives through the cache

use crate::cache::{CacheOutcome, Checksum, FetchCache, FetchRequest, FetchResult, Locator};
use crate::cli::args::{FetchArgs, OutputFormat};
use crate::config::Config;
use crate::error::{FodError, FodResult};
use console::style;
use tracing::debug;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> FodResult<()> {
    let requests = build_requests(&args, config)?;
    let total = requests.len();
    debug!("Fetching {} package(s)", total);

    let cache = FetchCache::from_config(config);
    let report = cache.fetch_all(requests).await;

    match args.format {
        OutputFormat::Plain => print_plain(&report.fetched),
        OutputFormat::Json => print_json(&report.fetched)?,
    }

    for (locator, err) in &report.failed {
        eprintln!("{} {}: {}", style("✗").red(), locator, err);
        if let Some(hint) = err.hint() {
            eprintln!("  {}", style(hint).dim());
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(FodError::FetchFailed {
            failed: report.failed.len(),
            total,
        })
    }
}

fn build_requests(args: &FetchArgs, config: &Config) -> FodResult<Vec<FetchRequest>> {
    if args.checksum.is_some() && args.locators.len() != 1 {
        return Err(FodError::InvalidChecksum {
            value: args.checksum.clone().unwrap_or_default(),
            reason: "--checksum needs exactly one locator".to_string(),
        });
    }

    let checksum = args
        .checksum
        .as_deref()
        .map(|c| Checksum::parse(c, config.store.hash_algorithm))
        .transpose()?;

    args.locators
        .iter()
        .map(|raw| {
            Ok(FetchRequest {
                locator: Locator::parse(raw)?,
                checksum: checksum.clone(),
            })
        })
        .collect()
}

fn print_plain(results: &[FetchResult]) {
    for result in results {
        let outcome = match result.outcome {
            CacheOutcome::Hit => style("hit ").green().to_string(),
            CacheOutcome::Miss => style("miss").yellow().to_string(),
        };
        println!(
            "{} {} {} {}",
            outcome, result.locator, result.checksum, result.store_path
        );
    }
}

fn print_json(results: &[FetchResult]) -> FodResult<()> {
    #[derive(serde::Serialize)]
    struct FetchJson {
        locator: String,
        outcome: CacheOutcome,
        checksum: String,
        store_path: String,
        entries: usize,
    }

    let items: Vec<FetchJson> = results
        .iter()
        .map(|r| FetchJson {
            locator: r.locator.to_string(),
            outcome: r.outcome,
            checksum: r.checksum.to_string(),
            store_path: r.store_path.to_string(),
            entries: r.archive.len(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(locators: &[&str], checksum: Option<&str>) -> FetchArgs {
        FetchArgs {
            locators: locators.iter().map(|l| l.to_string()).collect(),
            checksum: checksum.map(str::to_string),
            format: OutputFormat::Plain,
        }
    }

    #[test]
    fn checksum_applies_to_single_locator() {
        let digest = "ab".repeat(64);
        let requests = build_requests(
            &args(&["left-pad@npm:1.3.0"], Some(&format!("nix.1/{}", digest))),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].checksum.as_ref().unwrap().is_namespaced());
    }

    #[test]
    fn checksum_with_many_locators_is_rejected() {
        let digest = "ab".repeat(64);
        let result = build_requests(
            &args(&["a@npm:1.0.0", "b@npm:1.0.0"], Some(&digest)),
            &Config::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn bad_locator_is_rejected() {
        let result = build_requests(&args(&["no-reference"], None), &Config::default());
        assert!(matches!(result, Err(FodError::InvalidLocator(_))));
    }
}
