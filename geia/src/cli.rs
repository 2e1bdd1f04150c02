use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geia_config::Config;
use geia_text::{AbbreviationCatalog, Batch, PipelineContext, Step, TechnicalDocument};

use crate::records::{self, RecordTable};
use crate::setup;

/// Normalizes free-text maintenance records.
#[derive(Debug, Parser)]
#[command(version, about, max_term_width = 79)]
struct Cli {
    /// The path to the config file.
    #[arg(long, short, global = true, env = "GEIA_CONFIG", default_value = "geia.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize the text columns of a CSV file.
    ///
    /// Every configured text column is normalized as an independent batch. All other columns are
    /// written unchanged.
    Run {
        /// Path to the records CSV file.
        #[arg(long, short)]
        input: PathBuf,

        /// Path to write the normalized CSV file to (defaults to stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Validate the config and the abbreviation table.
    Check,

    /// Normalize a single text and print the result.
    Tag {
        /// The full facility name used when the text names no facility.
        #[arg(long, short)]
        facility: Option<String>,

        /// The text to normalize.
        text: String,
    },
}

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_path(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    setup::init_logging(&config);

    let catalog = config
        .load_catalog()
        .context("failed to load abbreviations")?;

    match cli.command {
        Command::Run { input, output } => run(&config, catalog.as_ref(), input, output),
        Command::Check => check(&config, catalog.as_ref()),
        Command::Tag { facility, text } => tag(&config, catalog.as_ref(), facility, text),
    }
}

fn run(
    config: &Config,
    catalog: Option<&AbbreviationCatalog>,
    input: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let file = fs::File::open(&input)
        .with_context(|| format!("failed to open records from {}", input.display()))?;
    let mut table = RecordTable::read(io::BufReader::new(file))?;
    geia_log::info!(records = table.len(), "loaded records");

    let facilities = if config.pipeline().contains(&Step::Location) {
        let column = table.column(config.facility_column())?;
        Some(records::facilities(&table, column))
    } else {
        None
    };

    let context = PipelineContext {
        catalog,
        directory: config.facilities(),
        facilities: facilities.as_ref(),
    };

    for name in config.text_columns() {
        let column = table.column(name)?;
        let mut document = TechnicalDocument::new(table.batch(column));

        document
            .run(config.pipeline(), &context)
            .with_context(|| format!("failed to normalize column '{name}'"))?;

        geia_log::debug!(column = %name, "normalized column");
        table.replace(column, document.data());
    }

    match output {
        Some(path) => {
            let file = fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            table.write(io::BufWriter::new(file))
        }
        None => table.write(io::stdout().lock()),
    }
}

fn check(config: &Config, catalog: Option<&AbbreviationCatalog>) -> Result<()> {
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "config: {}", config.path().display())?;
    writeln!(stdout, "  facilities: {}", config.facilities().len())?;
    writeln!(stdout, "  text columns: {}", config.text_columns().join(", "))?;

    let steps: Vec<_> = config.pipeline().iter().map(Step::name).collect();
    writeln!(stdout, "  pipeline: {}", steps.join(", "))?;

    match catalog {
        Some(catalog) => {
            writeln!(stdout, "abbreviations: {} records", catalog.len())?;
            for (category, records) in catalog.iter() {
                writeln!(stdout, "  {category}: {}", records.len())?;
            }
        }
        None => writeln!(stdout, "abbreviations: -")?,
    }

    Ok(())
}

fn tag(
    config: &Config,
    catalog: Option<&AbbreviationCatalog>,
    facility: Option<String>,
    text: String,
) -> Result<()> {
    let facilities = facility.map(|facility| BTreeMap::from([(0, facility)]));
    let context = PipelineContext {
        catalog,
        directory: config.facilities(),
        facilities: facilities.as_ref(),
    };

    let mut document = TechnicalDocument::new(Batch::from([(0, text)]));
    document
        .run(config.pipeline(), &context)
        .context("failed to normalize text")?;

    let result = document.into_data().remove(&0).unwrap_or_default();
    writeln!(io::stdout().lock(), "{result}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["geia", "run", "-i", "records.csv", "-c", "other.yml"])
            .unwrap();

        assert_eq!(cli.config, PathBuf::from("other.yml"));
        assert!(matches!(
            cli.command,
            Command::Run { ref input, output: None } if input == &PathBuf::from("records.csv")
        ));
    }

    #[test]
    fn test_parse_tag() {
        let cli = Cli::try_parse_from(["geia", "tag", "--facility", "Palas", "well 7"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tag { ref facility, ref text }
                if facility.as_deref() == Some("Palas") && text == "well 7"
        ));
    }
}
