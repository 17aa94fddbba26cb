use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Brand, ImageRef};
use crate::domain::proposal::MAX_VALID_DAYS;
use crate::layout::engine::{PageGeometry, PageSize};

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub brand: BrandConfig,
    pub document: DocumentConfig,
    pub pricing: PricingConfig,
    pub links: LinksConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrandConfig {
    pub company_name: String,
    pub contact_lines: Vec<String>,
    pub footer_text: String,
    pub logo_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentConfig {
    pub page_size: PageSize,
    pub margin_pt: f32,
    pub header_pt: f32,
    pub footer_pt: f32,
    pub valid_days: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub default_tax_rate: Decimal,
    pub currency_symbol: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinksConfig {
    pub base_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub storage_backend: Option<StorageBackend>,
    pub data_dir: Option<PathBuf>,
    pub company_name: Option<String>,
    pub logo_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("could not load brand logo `{path}`: {message}")]
    Logo { path: PathBuf, message: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                data_dir: PathBuf::from(".proposey"),
            },
            brand: BrandConfig {
                company_name: "Proposey".to_string(),
                contact_lines: Vec::new(),
                footer_text: "Confidential and Proprietary".to_string(),
                logo_path: None,
            },
            document: DocumentConfig {
                page_size: PageSize::Letter,
                margin_pt: 54.0,
                header_pt: 30.0,
                footer_pt: 24.0,
                valid_days: 30,
            },
            pricing: PricingConfig {
                default_tax_rate: Decimal::ZERO,
                currency_symbol: "$".to_string(),
            },
            links: LinksConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected memory|file)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("proposey.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(brand) = patch.brand {
            if let Some(company_name) = brand.company_name {
                self.brand.company_name = company_name;
            }
            if let Some(contact_lines) = brand.contact_lines {
                self.brand.contact_lines = contact_lines;
            }
            if let Some(footer_text) = brand.footer_text {
                self.brand.footer_text = footer_text;
            }
            if let Some(logo_path) = brand.logo_path {
                self.brand.logo_path = Some(logo_path);
            }
        }

        if let Some(document) = patch.document {
            if let Some(page_size) = document.page_size {
                self.document.page_size = page_size;
            }
            if let Some(margin_pt) = document.margin_pt {
                self.document.margin_pt = margin_pt;
            }
            if let Some(header_pt) = document.header_pt {
                self.document.header_pt = header_pt;
            }
            if let Some(footer_pt) = document.footer_pt {
                self.document.footer_pt = footer_pt;
            }
            if let Some(valid_days) = document.valid_days {
                self.document.valid_days = valid_days;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(default_tax_rate) = pricing.default_tax_rate {
                self.pricing.default_tax_rate = default_tax_rate;
            }
            if let Some(currency_symbol) = pricing.currency_symbol {
                self.pricing.currency_symbol = currency_symbol;
            }
        }

        if let Some(links) = patch.links {
            if let Some(base_url) = links.base_url {
                self.links.base_url = Some(base_url);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROPOSEY_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("PROPOSEY_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("PROPOSEY_BRAND_COMPANY_NAME") {
            self.brand.company_name = value;
        }
        if let Some(value) = read_env("PROPOSEY_BRAND_FOOTER_TEXT") {
            self.brand.footer_text = value;
        }
        if let Some(value) = read_env("PROPOSEY_BRAND_LOGO_PATH") {
            self.brand.logo_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("PROPOSEY_DOCUMENT_PAGE_SIZE") {
            self.document.page_size = parse_page_size("PROPOSEY_DOCUMENT_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("PROPOSEY_DOCUMENT_MARGIN_PT") {
            self.document.margin_pt = parse_f32("PROPOSEY_DOCUMENT_MARGIN_PT", &value)?;
        }
        if let Some(value) = read_env("PROPOSEY_DOCUMENT_VALID_DAYS") {
            self.document.valid_days = parse_u32("PROPOSEY_DOCUMENT_VALID_DAYS", &value)?;
        }

        if let Some(value) = read_env("PROPOSEY_PRICING_DEFAULT_TAX_RATE") {
            self.pricing.default_tax_rate =
                parse_decimal("PROPOSEY_PRICING_DEFAULT_TAX_RATE", &value)?;
        }
        if let Some(value) = read_env("PROPOSEY_PRICING_CURRENCY_SYMBOL") {
            self.pricing.currency_symbol = value;
        }

        if let Some(value) = read_env("PROPOSEY_LINKS_BASE_URL") {
            self.links.base_url = Some(value);
        }

        let log_level =
            read_env("PROPOSEY_LOGGING_LEVEL").or_else(|| read_env("PROPOSEY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROPOSEY_LOGGING_FORMAT").or_else(|| read_env("PROPOSEY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.storage_backend {
            self.storage.backend = backend;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(company_name) = overrides.company_name {
            self.brand.company_name = company_name;
        }
        if let Some(logo_path) = overrides.logo_path {
            self.brand.logo_path = Some(logo_path);
        }
        if let Some(base_url) = overrides.base_url {
            self.links.base_url = Some(base_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_storage(&self.storage)?;
        validate_brand(&self.brand)?;
        validate_document(&self.document)?;
        validate_pricing(&self.pricing)?;
        validate_links(&self.links)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn page_geometry(&self) -> PageGeometry {
        PageGeometry::new(
            self.document.page_size,
            self.document.margin_pt,
            self.document.header_pt,
            self.document.footer_pt,
        )
    }

    /// Builds the brand, reading and probing the logo file when one is configured.
    pub fn brand(&self) -> Result<Brand, ConfigError> {
        let logo = match &self.brand.logo_path {
            Some(path) => Some(load_logo(path)?),
            None => None,
        };
        Ok(Brand {
            company_name: self.brand.company_name.clone(),
            contact_lines: self.brand.contact_lines.clone(),
            footer_text: self.brand.footer_text.clone(),
            logo,
            currency_symbol: self.pricing.currency_symbol.clone(),
        })
    }
}

fn load_logo(path: &Path) -> Result<ImageRef, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Logo { path: path.to_path_buf(), message: err.to_string() })?;
    let logo = ImageRef::from_bytes(bytes)
        .map_err(|err| ConfigError::Logo { path: path.to_path_buf(), message: err.to_string() })?;
    logo.embedding()
        .map_err(|err| ConfigError::Logo { path: path.to_path_buf(), message: err.to_string() })?;
    Ok(logo)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("proposey.toml"), PathBuf::from("config/proposey.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.backend == StorageBackend::File && storage.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "storage.data_dir is required when storage.backend is `file`".to_string(),
        ));
    }
    Ok(())
}

fn validate_brand(brand: &BrandConfig) -> Result<(), ConfigError> {
    if brand.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "brand.company_name must not be empty; it heads every page".to_string(),
        ));
    }
    Ok(())
}

fn validate_document(document: &DocumentConfig) -> Result<(), ConfigError> {
    if !(0.0..=144.0).contains(&document.margin_pt) {
        return Err(ConfigError::Validation(
            "document.margin_pt must be in range 0..=144".to_string(),
        ));
    }
    if !(0.0..=144.0).contains(&document.header_pt) || !(0.0..=144.0).contains(&document.footer_pt)
    {
        return Err(ConfigError::Validation(
            "document.header_pt and document.footer_pt must be in range 0..=144".to_string(),
        ));
    }
    if document.valid_days == 0 || document.valid_days > MAX_VALID_DAYS {
        return Err(ConfigError::Validation(format!(
            "document.valid_days must be in range 1..={MAX_VALID_DAYS}"
        )));
    }
    let geometry = PageGeometry::new(
        document.page_size,
        document.margin_pt,
        document.header_pt,
        document.footer_pt,
    );
    geometry.validate().map_err(|err| ConfigError::Validation(format!("document: {err}")))
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.default_tax_rate < Decimal::ZERO || pricing.default_tax_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "pricing.default_tax_rate must be a fraction in range 0..=1 (e.g. 0.08 for 8%)"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_links(links: &LinksConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &links.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "links.base_url must start with http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

fn parse_page_size(key: &str, value: &str) -> Result<PageSize, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "letter" => Ok(PageSize::Letter),
        "a4" => Ok(PageSize::A4),
        _ => Err(invalid_override(key, value)),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    storage: Option<StoragePatch>,
    brand: Option<BrandPatch>,
    document: Option<DocumentPatch>,
    pricing: Option<PricingPatch>,
    links: Option<LinksPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackend>,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandPatch {
    company_name: Option<String>,
    contact_lines: Option<Vec<String>>,
    footer_text: Option<String>,
    logo_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentPatch {
    page_size: Option<PageSize>,
    margin_pt: Option<f32>,
    header_pt: Option<f32>,
    footer_pt: Option<f32>,
    valid_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    default_tax_rate: Option<Decimal>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LinksPatch {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
