#![warn(missing_docs)]
//! # calorie-counter binary
//!
//! Command-line shell over the analysis and transform controllers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use calorie_counter_app::{
    AnalysisController, AppConfig, TransformController, app_version, init_logging,
};
use calorie_counter_contract::TransformDirection;
use calorie_counter_preview::{InMemoryPreviewStore, SelectedFile};
use calorie_counter_transport::{ServiceEndpoints, ServiceTransport};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "calorie-counter", version, about = "Analyze meal photos and encrypt notes")]
struct Cli {
    /// Service base URL (https, or http on loopback)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log filter directive, e.g. "debug" or "calorie_counter_app=trace"
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image and print its nutrition values
    Analyze {
        /// Image file to analyze
        path: PathBuf,
    },
    /// Encrypt text with a passphrase
    Encrypt(TransformArgs),
    /// Decrypt a token produced by `encrypt`
    Decrypt(TransformArgs),
    /// Encrypt, feed the result back as input, then decrypt
    Roundtrip(TransformArgs),
}

#[derive(Args)]
struct TransformArgs {
    /// Input text
    #[arg(long)]
    text: String,

    /// Passphrase used by the service for key derivation
    #[arg(long, env = "CALORIE_COUNTER_PASSPHRASE", hide_env_values = true)]
    passphrase: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env()?.with_overrides(
        cli.api_base,
        cli.timeout_secs,
        cli.log_filter,
    )?;
    init_logging(&config.log_filter)?;
    tracing::info!(
        stage = "startup",
        action = "config",
        version = app_version(),
        api_base = %config.api_base,
        timeout_secs = config.request_timeout.as_secs()
    );

    let endpoints = config.endpoints()?;
    let transport = config.build_transport()?;

    match cli.command {
        Command::Analyze { path } => run_analyze(endpoints, transport, path),
        Command::Encrypt(args) => {
            run_transform(endpoints, transport, args, &[TransformDirection::Forward])
        }
        Command::Decrypt(args) => {
            run_transform(endpoints, transport, args, &[TransformDirection::Inverse])
        }
        Command::Roundtrip(args) => run_transform(
            endpoints,
            transport,
            args,
            &[TransformDirection::Forward, TransformDirection::Inverse],
        ),
    }
}

fn run_analyze(
    endpoints: ServiceEndpoints,
    transport: Arc<dyn ServiceTransport>,
    path: PathBuf,
) -> Result<()> {
    let file = SelectedFile::from_path(&path)
        .with_context(|| format!("cannot load {}", path.display()))?;
    let mut controller =
        AnalysisController::new(endpoints, transport, Arc::new(InMemoryPreviewStore::new()));
    controller.select_file(file)?;
    controller.submit()?;

    let panel = controller.panel();
    print!("{panel}");
    if let Some(error) = panel.error {
        bail!(error);
    }
    Ok(())
}

fn run_transform(
    endpoints: ServiceEndpoints,
    transport: Arc<dyn ServiceTransport>,
    args: TransformArgs,
    directions: &[TransformDirection],
) -> Result<()> {
    let mut controller = TransformController::new(endpoints, transport);
    controller.set_text(args.text)?;
    controller.set_passphrase(args.passphrase)?;

    for (step, direction) in directions.iter().enumerate() {
        if step > 0 && !controller.promote_result_to_input() {
            break;
        }
        controller.submit(*direction)?;

        let panel = controller.panel();
        println!("[{}]", direction.as_str());
        print!("{panel}");
        if let Some(error) = panel.error {
            bail!(error);
        }
    }
    Ok(())
}
