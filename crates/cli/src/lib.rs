pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use proposey_core::config::{AppConfig, LogFormat};
use proposey_core::domain::acceptance::AcceptanceMethod;

use crate::commands::accept::AcceptArgs;
use crate::commands::create::CreateArgs;
use crate::commands::GlobalOptions;

#[derive(Debug, Parser)]
#[command(
    name = "proposey",
    about = "Proposey operator CLI",
    long_about = "Create, share and record acceptance of branded proposal PDFs.",
    after_help = "Examples:\n  proposey create --input proposal.json --share\n  proposey accept 3f9a0c1d2e4b --name \"Dana Client\"\n  proposey pdf 3f9a0c1d2e4b --out proposal.pdf"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a proposey.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override storage.data_dir")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price, render and store a new proposal from a JSON payload")]
    Create {
        #[arg(long, help = "JSON file with client, project, line items and terms")]
        input: PathBuf,
        #[arg(long, help = "JPEG or PNG placed as Exhibit A")]
        image: Option<PathBuf>,
        #[arg(long, help = "Caption for the exhibit image")]
        caption: Option<String>,
        #[arg(long, help = "Create the proposal already shared")]
        share: bool,
    },
    #[command(about = "Mark a proposal as shared and print its client links")]
    Share { id: String },
    #[command(about = "Record a client acceptance and re-render the signature page")]
    Accept {
        id: String,
        #[arg(long = "name", help = "Signer name")]
        signer_name: String,
        #[arg(long = "title", help = "Signer title")]
        signer_title: Option<String>,
        #[arg(long, default_value = "typed", help = "typed | drawn | click")]
        method: AcceptanceMethod,
        #[arg(long = "option", help = "Selected payment option")]
        selected_option: Option<u8>,
        #[arg(long = "date", help = "Date as reported by the client, kept for display")]
        client_reported_date: Option<String>,
    },
    #[command(about = "Print the JSON snapshot of a proposal")]
    Show { id: String },
    #[command(about = "List proposals, newest first")]
    List,
    #[command(about = "Write the current proposal PDF to a file")]
    Pdf {
        id: String,
        #[arg(long, help = "Output path (default proposal-<id>.pdf)")]
        out: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Look up the base sales tax rate of a US state")]
    TaxRate { state: String },
}

/// Installs the tracing subscriber. Logs go to stderr so stdout stays JSON.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let globals = GlobalOptions { config_path: cli.config, data_dir: cli.data_dir };

    if let Ok(config) = AppConfig::load(globals.load_options()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Create { input, image, caption, share } => {
            commands::create::run(&globals, CreateArgs { input, image, caption, share })
        }
        Command::Share { id } => commands::share::run(&globals, &id),
        Command::Accept {
            id,
            signer_name,
            signer_title,
            method,
            selected_option,
            client_reported_date,
        } => commands::accept::run(
            &globals,
            AcceptArgs { id, signer_name, signer_title, method, selected_option, client_reported_date },
        ),
        Command::Show { id } => commands::show::run(&globals, &id),
        Command::List => commands::list::run(&globals),
        Command::Pdf { id, out } => commands::pdf::run(&globals, &id, out),
        Command::Config => commands::config::run(&globals),
        Command::TaxRate { state } => commands::tax_rate::run(&state),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
