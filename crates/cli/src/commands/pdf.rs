use std::path::PathBuf;

use proposey_core::domain::proposal::DocumentMetadata;
use serde::Serialize;

use crate::commands::{io_failure, parse_id, with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "pdf";

#[derive(Debug, Serialize)]
struct PdfExport {
    path: String,
    document: DocumentMetadata,
}

pub fn run(globals: &GlobalOptions, id: &str, out: Option<PathBuf>) -> CommandResult {
    let id = match parse_id(COMMAND, id) {
        Ok(id) => id,
        Err(result) => return result,
    };
    let out = out.unwrap_or_else(|| PathBuf::from(format!("proposal-{id}.pdf")));

    with_store(COMMAND, globals, |store| async move {
        let document = store.document(&id).await?;
        if let Err(error) = tokio::fs::write(&out, document.bytes()).await {
            return Ok(io_failure(COMMAND, &out, error));
        }
        let export = PdfExport { path: out.display().to_string(), document: document.metadata() };
        Ok(CommandResult::success_with_data(
            COMMAND,
            format!("wrote {} ({} pages)", export.path, document.page_count()),
            &export,
        ))
    })
}
