use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::Value;

use crate::commands::{CommandResult, GlobalOptions};

const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(globals: &GlobalOptions) -> CommandResult {
    let config = match globals.load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path(globals.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &str, env_key: &str| {
        field_source(key, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let data_dir_source = if globals.data_dir.is_some() {
        "override (--data-dir)".to_string()
    } else {
        source("storage.data_dir", "PROPOSEY_STORAGE_DATA_DIR")
    };

    let entries = vec![
        ConfigEntry {
            key: "storage.backend",
            value: format!("{:?}", config.storage.backend).to_ascii_lowercase(),
            source: source("storage.backend", "PROPOSEY_STORAGE_BACKEND"),
        },
        ConfigEntry {
            key: "storage.data_dir",
            value: config.storage.data_dir.display().to_string(),
            source: data_dir_source,
        },
        ConfigEntry {
            key: "brand.company_name",
            value: config.brand.company_name.clone(),
            source: source("brand.company_name", "PROPOSEY_BRAND_COMPANY_NAME"),
        },
        ConfigEntry {
            key: "brand.footer_text",
            value: config.brand.footer_text.clone(),
            source: source("brand.footer_text", "PROPOSEY_BRAND_FOOTER_TEXT"),
        },
        ConfigEntry {
            key: "brand.logo_path",
            value: config
                .brand
                .logo_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            source: source("brand.logo_path", "PROPOSEY_BRAND_LOGO_PATH"),
        },
        ConfigEntry {
            key: "document.page_size",
            value: format!("{:?}", config.document.page_size).to_ascii_lowercase(),
            source: source("document.page_size", "PROPOSEY_DOCUMENT_PAGE_SIZE"),
        },
        ConfigEntry {
            key: "document.margin_pt",
            value: config.document.margin_pt.to_string(),
            source: source("document.margin_pt", "PROPOSEY_DOCUMENT_MARGIN_PT"),
        },
        ConfigEntry {
            key: "document.valid_days",
            value: config.document.valid_days.to_string(),
            source: source("document.valid_days", "PROPOSEY_DOCUMENT_VALID_DAYS"),
        },
        ConfigEntry {
            key: "pricing.default_tax_rate",
            value: config.pricing.default_tax_rate.to_string(),
            source: source("pricing.default_tax_rate", "PROPOSEY_PRICING_DEFAULT_TAX_RATE"),
        },
        ConfigEntry {
            key: "pricing.currency_symbol",
            value: config.pricing.currency_symbol.clone(),
            source: source("pricing.currency_symbol", "PROPOSEY_PRICING_CURRENCY_SYMBOL"),
        },
        ConfigEntry {
            key: "links.base_url",
            value: config.links.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            source: source("links.base_url", "PROPOSEY_LINKS_BASE_URL"),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source("logging.level", "PROPOSEY_LOGGING_LEVEL"),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source: source("logging.format", "PROPOSEY_LOGGING_FORMAT"),
        },
    ];

    CommandResult::success_with_data(
        COMMAND,
        "effective config (source precedence: override > env > file > default)",
        &entries,
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("proposey.toml"), PathBuf::from("config/proposey.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
