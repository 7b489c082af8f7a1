//! CLI front end for the reference image matcher

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use refimage::acquire::Acquirer;
use refimage::catalog::reference_name;
use refimage::config::{
    MetricKind, Settings, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_IMAGE_DIR, DEFAULT_INDEX_FILE,
};
use refimage::distance::DEFAULT_TOLERANCE;
use refimage::extractor::DEFAULT_CANONICAL_SIZE;
use refimage::matcher::DEFAULT_THRESHOLD;
use refimage::{
    Catalog, FeatureExtractor, FileStorage, ImageBytes, MatchResult, Matcher, Operation,
    Outcome, ReferenceIndex,
};

#[derive(Parser)]
#[command(name = "refimage", version)]
#[command(about = "Match images against a catalog of reference PNGs", long_about = None)]
struct Cli {
    /// Index file (.json for JSON, any other extension for the binary format)
    #[arg(long, global = true, default_value = DEFAULT_INDEX_FILE)]
    index: PathBuf,

    /// Directory of reference images used by `rebuild`
    #[arg(long, global = true, default_value = DEFAULT_IMAGE_DIR)]
    images: PathBuf,

    /// Minimum confidence (0-100) for a match
    #[arg(long, global = true, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Per-channel tolerance for the pixel-agreement metric
    #[arg(long, global = true, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: u8,

    #[arg(long, global = true, value_enum, default_value = "pixel-agreement")]
    metric: MetricArg,

    /// Side of the canonical grid; changing it requires a rebuild
    #[arg(long, global = true, default_value_t = DEFAULT_CANONICAL_SIZE)]
    canonical_size: u32,

    /// Download timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum MetricArg {
    PixelAgreement,
    MeanAbsolute,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::PixelAgreement => MetricKind::PixelAgreement,
            MetricArg::MeanAbsolute => MetricKind::MeanAbsolute,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Re-index every PNG in the image directory, replacing the whole index
    Rebuild {
        /// Write an empty index when the directory has no usable images
        #[arg(long)]
        allow_empty: bool,
    },
    /// Index a single image file
    Add {
        path: PathBuf,
        /// Entry name (defaults to the file name without extension)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Remove an entry by name
    Remove { name: String },
    /// Match a local file or a direct image URL against the index
    Match {
        location: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List indexed names
    List,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            index_path: self.index.clone(),
            image_dir: self.images.clone(),
            canonical_size: self.canonical_size,
            tolerance: self.tolerance,
            threshold: self.threshold,
            metric: self.metric.into(),
            download_timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn print_match(result: &MatchResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    match result {
        MatchResult::Matched { name, score } => {
            println!("The best match is '{}' with a strong confidence of {:.2}%.", name, score);
        }
        MatchResult::NoMatch { best: Some(best) } => {
            println!(
                "No strong match found. Best result: '{}' ({:.2}%).",
                best.name, best.score
            );
        }
        MatchResult::NoMatch { best: None } => {
            println!("No strong match found (index is empty).");
        }
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Rebuilt { index, report } => {
            println!("Indexed {} files into {} entries.", report.indexed.len(), index.len());
            for skipped in &report.skipped {
                println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
            }
        }
        Outcome::Upserted { name, replaced, .. } => {
            let verb = if *replaced { "Updated" } else { "Added" };
            println!("{} '{}'.", verb, name);
        }
        Outcome::Removed { name, .. } => {
            println!("Removed '{}'.", name);
        }
        Outcome::Matched(_) => {}
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = cli.settings();
    settings.validate()?;

    let catalog = Catalog::new(
        FileStorage::new(&settings.index_path),
        FeatureExtractor::new(settings.extractor_config())?,
        Matcher::new(settings.matcher_config()),
    );

    // A rebuild must work even when the stored index is unusable.
    let index = match cli.command {
        Commands::Rebuild { .. } => ReferenceIndex::new(catalog.extractor().scheme()),
        _ => catalog
            .load()
            .with_context(|| format!("loading {}", settings.index_path.display()))?,
    };

    let operation = match cli.command {
        Commands::Rebuild { allow_empty } => Operation::Rebuild {
            directory: settings.image_dir.clone(),
            allow_empty,
        },
        Commands::Add { path, name } => {
            let name = match name.or_else(|| reference_name(&path)) {
                Some(name) => name,
                None => bail!("cannot derive an entry name from {}", path.display()),
            };
            Operation::Upsert {
                name,
                image: ImageBytes::read(&path)?,
            }
        }
        Commands::Remove { name } => Operation::Remove { name },
        Commands::Match { location, json } => {
            if index.is_empty() {
                warn!("index is empty; run 'refimage rebuild' first");
            }
            let candidate = Acquirer::new(settings.download_timeout).fetch(&location)?;
            let outcome = catalog.execute(&index, Operation::Match { candidate })?;
            if let Outcome::Matched(result) = &outcome {
                print_match(result, json)?;
            }
            return Ok(());
        }
        Commands::List => {
            if index.is_empty() {
                println!("No entries in index");
            } else {
                println!("Entries ({} total):", index.len());
                for name in index.names() {
                    println!("  - {}", name);
                }
            }
            return Ok(());
        }
    };

    let outcome = catalog.execute(&index, operation)?;
    print_outcome(&outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_match_settings() {
        let cli = Cli::try_parse_from(["refimage", "list"]).unwrap();
        let settings = cli.settings();
        let defaults = Settings::default();
        assert_eq!(settings.download_timeout, defaults.download_timeout);
        assert_eq!(settings.index_path, defaults.index_path);
        assert_eq!(settings.image_dir, defaults.image_dir);
        assert_eq!(settings.canonical_size, defaults.canonical_size);
        assert_eq!(settings.tolerance, defaults.tolerance);
        assert_eq!(settings.threshold, defaults.threshold);
        assert_eq!(settings.metric, defaults.metric);
    }

    #[test]
    fn test_timeout_flag() {
        let cli = Cli::try_parse_from(["refimage", "--timeout", "5", "list"]).unwrap();
        assert_eq!(cli.settings().download_timeout, Duration::from_secs(5));
    }
}
