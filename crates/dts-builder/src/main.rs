use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser};
use dts_builder::{
    BundleDescriptor, BundleError, BundleStatus, Bundler, Config, Options,
    config::DEFAULT_CONFIG_FILE,
    logging::{init_logger, level_filter},
};
use log::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "dts-builder", version)]
#[command(about = "Bundle TypeScript declaration files into a single namespaced .d.ts")]
struct Cli {
    /// Configuration file listing the bundles to build
    #[arg(short, long, conflicts_with = "name")]
    config: Option<PathBuf>,

    #[command(flatten)]
    bundle: BundleArgs,

    /// Print rendered bundles instead of writing them
    #[arg(long)]
    stdout: bool,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Describe a single bundle on the command line instead of a config file
#[derive(Debug, Args)]
struct BundleArgs {
    /// Bundle name, used for the file name and the namespace
    #[arg(long, requires_all = ["source", "dest"])]
    name: Option<String>,

    /// Directory searched for declaration files
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Additional name bound to the bundle namespace
    #[arg(long)]
    alias: Option<String>,

    /// External declaration file to copy and reference (repeatable)
    #[arg(long = "external")]
    externals: Vec<PathBuf>,

    /// Do not wrap the declarations in a namespace
    #[arg(long)]
    no_wrap: bool,

    /// Regular expression selecting declaration files
    #[arg(long)]
    pattern: Option<String>,
}

impl BundleArgs {
    fn descriptor(&self) -> Option<BundleDescriptor> {
        let name = self.name.clone()?;
        Some(BundleDescriptor {
            externals: self.externals.clone(),
            wrap: !self.no_wrap,
            alias: self.alias.clone(),
            file_pattern: self.pattern.clone(),
            ..BundleDescriptor::new(
                name,
                self.source.clone().unwrap_or_default(),
                self.dest.clone().unwrap_or_default(),
            )
        })
    }
}

fn load_bundles(cli: &Cli) -> Result<(Vec<BundleDescriptor>, Options)> {
    let defaults = Options {
        verbose: !cli.quiet,
    };
    if let Some(bundle) = cli.bundle.descriptor() {
        return Ok((vec![bundle], defaults));
    }

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if !path.is_file() {
        bail!(
            "no bundle given: pass --name/--source/--dest or create {}",
            path.display()
        );
    }
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    let options = config.options(defaults);
    Ok((config.bundles, options))
}

fn print_bundles(
    bundler: &Bundler,
    bundles: &[BundleDescriptor],
    out: &mut impl Write,
) -> Result<bool> {
    let mut success = true;
    for bundle in bundles {
        match bundler.render(bundle) {
            Ok(output) => {
                writeln!(out, "// {}", output.dest_file.display())?;
                writeln!(out, "{}", output.text)?;
            }
            Err(BundleError::EmptySource { .. }) => {
                warn!("Skipped '{}': no declaration files", bundle.name);
            }
            Err(err) => {
                error!("Bundle '{}' failed: {err}", bundle.name);
                success = false;
            }
        }
    }
    Ok(success)
}

fn write_bundles(bundler: &Bundler, bundles: &[BundleDescriptor]) -> Result<bool> {
    let report = bundler
        .generate(bundles)
        .context("Failed to generate bundles")?;
    for outcome in &report.outcomes {
        match &outcome.status {
            BundleStatus::Written { path } => {
                info!("Wrote '{}' to {}", outcome.name, path.display());
            }
            BundleStatus::Skipped => warn!("Skipped '{}': no declaration files", outcome.name),
            BundleStatus::Failed(err) => error!("'{}': {err}", outcome.name),
        }
    }
    Ok(report.is_success())
}

fn run(cli: &Cli) -> Result<bool> {
    let (bundles, options) = load_bundles(cli)?;
    let bundler = Bundler::local(options);
    if cli.stdout {
        print_bundles(&bundler, &bundles, &mut io::stdout().lock())
    } else {
        write_bundles(&bundler, &bundles)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(level_filter(cli.verbose, cli.quiet));

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
