//! vocoder: apply the offline voice effects chain to an audio file

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocoder_services::Vocoder;

#[derive(Debug, Parser)]
#[command(
    name = "vocoder",
    version,
    about = "Offline voice effects: pitch, ring mod, bandpass, flanger, phaser"
)]
struct Cli {
    /// Source audio (WAV, MP3, FLAC, OGG, ...)
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Destination WAV file
    #[arg(required_unless_present = "print_config")]
    output: Option<PathBuf>,

    /// Effect configuration (TOML); defaults to <config dir>/vocoder/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "vocoder=debug" } else { "vocoder=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = config::load_config(cli.config.as_deref())?;
    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let (Some(input), Some(output)) = (cli.input, cli.output) else {
        anyhow::bail!("INPUT and OUTPUT are required");
    };

    let vocoder = Vocoder::new(config).context("invalid effect configuration")?;
    let report = vocoder
        .process(&input, &output)
        .with_context(|| format!("failed to process {}", input.display()))?;

    println!(
        "{} -> {}: {} samples @ {} Hz ({:.2}s), stages: {}",
        input.display(),
        output.display(),
        report.output_samples,
        report.sample_rate,
        report.output_seconds(),
        if report.stages.is_empty() { "none".to_string() } else { report.stages.join(", ") },
    );
    Ok(())
}
