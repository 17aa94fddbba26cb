use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use proposey_cli::commands::accept::AcceptArgs;
use proposey_cli::commands::create::CreateArgs;
use proposey_cli::commands::{accept, config, create, list, pdf, share, show, tax_rate, GlobalOptions};
use proposey_core::domain::acceptance::AcceptanceMethod;
use serde_json::Value;
use tempfile::TempDir;

const PROPOSAL_JSON: &str = r#"{
  "client": { "company": "Acme Property", "contact": "Dana Client" },
  "project": { "name": "Riverside Ducts", "city": "Denver", "state": "CO" },
  "line_items": [
    { "description": "Duct cleaning", "quantity": "1", "unit_price": "450.00" },
    { "description": "Vent sealing", "quantity": "3", "unit_price": "60.00" }
  ],
  "tax_rate": "0.08",
  "terms": "Net 30 from completion."
}"#;

#[test]
fn create_share_accept_show_round_trip() {
    with_env(&[], || {
        let workspace = Workspace::new();

        let created = parse_payload(&create::run(&workspace.globals, workspace.create_args(false)).output);
        assert_eq!(created["command"], "create");
        assert_eq!(created["status"], "ok");
        assert_eq!(created["data"]["state"], "draft");
        assert_eq!(created["data"]["config"]["pricing"]["total"], "680.40");
        let id = created["data"]["id"].as_str().expect("id").to_string();

        let shared = parse_payload(&share::run(&workspace.globals, &id).output);
        assert_eq!(shared["status"], "ok");
        assert_eq!(shared["data"]["client_path"], format!("/proposal/{id}"));
        assert_eq!(shared["data"]["pdf_path"], format!("/api/proposal/{id}/pdf"));

        let result = accept::run(&workspace.globals, accept_args(&id));
        assert_eq!(result.exit_code, 0, "accept should succeed: {}", result.output);
        let accepted = parse_payload(&result.output);
        assert_eq!(accepted["data"]["state"], "accepted");
        assert_eq!(accepted["data"]["evidence"]["signer_name"], "Dana Client");

        let shown = parse_payload(&show::run(&workspace.globals, &id).output);
        assert_eq!(shown["data"]["state"], "accepted");
        assert_eq!(shown["data"]["document"], accepted["data"]["document"]);
    });
}

#[test]
fn duplicate_acceptance_is_a_conflict() {
    with_env(&[], || {
        let workspace = Workspace::new();
        let id = workspace.create(true);

        assert_eq!(accept::run(&workspace.globals, accept_args(&id)).exit_code, 0);
        let result = accept::run(&workspace.globals, accept_args(&id));

        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "AlreadyAcceptedError");
    });
}

#[test]
fn accepting_a_draft_is_rejected() {
    with_env(&[], || {
        let workspace = Workspace::new();
        let id = workspace.create(false);

        let result = accept::run(&workspace.globals, accept_args(&id));

        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "InvalidStateError");
    });
}

#[test]
fn unknown_and_malformed_ids_are_reported() {
    with_env(&[], || {
        let workspace = Workspace::new();

        let missing = show::run(&workspace.globals, "0123456789ab");
        assert_eq!(missing.exit_code, 5);
        assert_eq!(parse_payload(&missing.output)["error_class"], "NotFoundError");

        let malformed = show::run(&workspace.globals, "../etc/passwd");
        assert_eq!(malformed.exit_code, 4);
        assert_eq!(parse_payload(&malformed.output)["error_class"], "InvalidInputError");
    });
}

#[test]
fn pdf_export_writes_the_current_document() {
    with_env(&[], || {
        let workspace = Workspace::new();
        let id = workspace.create(true);
        let out = workspace.dir.path().join("export.pdf");

        let result = pdf::run(&workspace.globals, &id, Some(out.clone()));

        assert_eq!(result.exit_code, 0, "pdf export should succeed: {}", result.output);
        let bytes = fs::read(&out).expect("exported pdf");
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["document"]["byte_len"], bytes.len());
    });
}

#[test]
fn list_returns_newest_first() {
    with_env(&[], || {
        let workspace = Workspace::new();
        let first = workspace.create(false);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = workspace.create(false);

        let payload = parse_payload(&list::run(&workspace.globals).output);
        let ids: Vec<&str> = payload["data"]
            .as_array()
            .expect("summaries")
            .iter()
            .map(|summary| summary["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    });
}

#[test]
fn invalid_payload_is_an_input_error() {
    with_env(&[], || {
        let workspace = Workspace::new();
        let input = workspace.dir.path().join("broken.json");
        fs::write(&input, "{ \"line_items\": [ { \"description\": 1 } ] }").expect("write");

        let result = create::run(
            &workspace.globals,
            CreateArgs { input, image: None, caption: None, share: false },
        );

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "InvalidInputError");
    });
}

#[test]
fn config_reports_override_and_env_sources() {
    with_env(&[("PROPOSEY_BRAND_COMPANY_NAME", "Front Range Roofing")], || {
        let workspace = Workspace::new();

        let payload = parse_payload(&config::run(&workspace.globals).output);
        let entries = payload["data"].as_array().expect("entries");
        let entry = |key: &str| {
            entries.iter().find(|entry| entry["key"] == key).cloned().expect("config entry")
        };

        assert_eq!(entry("storage.data_dir")["source"], "override (--data-dir)");
        assert_eq!(entry("brand.company_name")["value"], "Front Range Roofing");
        assert_eq!(entry("brand.company_name")["source"], "env (PROPOSEY_BRAND_COMPANY_NAME)");
        assert_eq!(entry("document.valid_days")["source"], "default");
    });
}

#[test]
fn config_failure_uses_validation_exit_code() {
    with_env(&[("PROPOSEY_LOGGING_LEVEL", "verbose")], || {
        let workspace = Workspace::new();
        let result = list::run(&workspace.globals);

        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn tax_rate_lookup() {
    let found = parse_payload(&tax_rate::run("co").output);
    assert_eq!(found["data"]["state"], "CO");
    assert_eq!(found["data"]["rate"], "0.029");

    let missing = tax_rate::run("ZZ");
    assert_eq!(missing.exit_code, 4);
    assert_eq!(parse_payload(&missing.output)["error_class"], "InvalidInputError");
}

struct Workspace {
    dir: TempDir,
    globals: GlobalOptions,
    input: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("proposal.json");
        fs::write(&input, PROPOSAL_JSON).expect("write input");
        let globals =
            GlobalOptions { config_path: None, data_dir: Some(data_dir(dir.path())) };
        Self { dir, globals, input }
    }

    fn create_args(&self, share: bool) -> CreateArgs {
        CreateArgs { input: self.input.clone(), image: None, caption: None, share }
    }

    fn create(&self, share: bool) -> String {
        let result = create::run(&self.globals, self.create_args(share));
        assert_eq!(result.exit_code, 0, "create should succeed: {}", result.output);
        parse_payload(&result.output)["data"]["id"].as_str().expect("id").to_string()
    }
}

fn data_dir(root: &Path) -> PathBuf {
    root.join("data")
}

fn accept_args(id: &str) -> AcceptArgs {
    AcceptArgs {
        id: id.to_string(),
        signer_name: "Dana Client".to_string(),
        signer_title: Some("Owner".to_string()),
        method: AcceptanceMethod::TypedName,
        selected_option: None,
        client_reported_date: None,
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PROPOSEY_STORAGE_BACKEND",
        "PROPOSEY_STORAGE_DATA_DIR",
        "PROPOSEY_BRAND_COMPANY_NAME",
        "PROPOSEY_BRAND_FOOTER_TEXT",
        "PROPOSEY_BRAND_LOGO_PATH",
        "PROPOSEY_DOCUMENT_PAGE_SIZE",
        "PROPOSEY_DOCUMENT_MARGIN_PT",
        "PROPOSEY_DOCUMENT_VALID_DAYS",
        "PROPOSEY_PRICING_DEFAULT_TAX_RATE",
        "PROPOSEY_PRICING_CURRENCY_SYMBOL",
        "PROPOSEY_LINKS_BASE_URL",
        "PROPOSEY_LOGGING_LEVEL",
        "PROPOSEY_LOGGING_FORMAT",
        "PROPOSEY_LOG_LEVEL",
        "PROPOSEY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
