pub mod accept;
pub mod config;
pub mod create;
pub mod list;
pub mod pdf;
pub mod share;
pub mod show;
pub mod tax_rate;

use std::future::Future;
use std::path::PathBuf;

use proposey_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use proposey_core::errors::{ApplicationError, ErrorKind};
use proposey_store::ProposalStore;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::emit(command, message, Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: ApplicationError) -> Self {
        let kind = error.kind();
        Self::failure(command, kind.as_str(), error.to_string(), exit_code_for(kind))
    }

    fn emit(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

pub fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Configuration => 2,
        ErrorKind::InvalidInput => 4,
        ErrorKind::NotFound => 5,
        ErrorKind::InvalidState => 6,
        ErrorKind::AlreadyAccepted => 7,
        ErrorKind::LayoutOverflow => 8,
        ErrorKind::Storage => 9,
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides { data_dir: self.data_dir.clone(), ..ConfigOverrides::default() },
        }
    }

    pub fn load_config(&self, command: &str) -> Result<AppConfig, CommandResult> {
        AppConfig::load(self.load_options()).map_err(|error| {
            CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
        })
    }
}

/// Loads config, opens the store on a current-thread runtime and runs `operation`.
pub fn with_store<F, Fut>(command: &str, globals: &GlobalOptions, operation: F) -> CommandResult
where
    F: FnOnce(ProposalStore) -> Fut,
    Fut: Future<Output = Result<CommandResult, ApplicationError>>,
{
    let config = match globals.load_config(command) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let store = ProposalStore::open(&config).await?;
        operation(store).await
    });

    match result {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(event_name = "cli.command_failed", command, error = %error, "command failed");
            CommandResult::from_error(command, error)
        }
    }
}

pub(crate) fn io_failure(command: &str, path: &std::path::Path, error: std::io::Error) -> CommandResult {
    CommandResult::failure(command, "io", format!("{}: {error}", path.display()), 10)
}

pub(crate) fn parse_id(
    command: &str,
    raw: &str,
) -> Result<proposey_core::domain::proposal::ProposalId, CommandResult> {
    proposey_core::domain::proposal::ProposalId::parse(raw)
        .map_err(|error| CommandResult::from_error(command, error.into()))
}
