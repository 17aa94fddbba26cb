use std::fs;
use std::path::PathBuf;

use proposey_core::document::ImageRef;
use proposey_core::domain::proposal::ProposalInput;
use proposey_store::{CreateOptions, RequestContext};

use crate::commands::{io_failure, with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "create";

#[derive(Debug, Clone)]
pub struct CreateArgs {
    /// JSON proposal payload.
    pub input: PathBuf,
    pub image: Option<PathBuf>,
    pub caption: Option<String>,
    pub share: bool,
}

pub fn run(globals: &GlobalOptions, args: CreateArgs) -> CommandResult {
    let raw = match fs::read(&args.input) {
        Ok(raw) => raw,
        Err(error) => return io_failure(COMMAND, &args.input, error),
    };
    let mut input: ProposalInput = match serde_json::from_slice(&raw) {
        Ok(input) => input,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "InvalidInputError",
                format!("{}: {error}", args.input.display()),
                4,
            );
        }
    };

    if let Some(path) = &args.image {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => return io_failure(COMMAND, path, error),
        };
        match ImageRef::from_bytes(bytes) {
            Ok(image) => input.image = Some(image),
            Err(error) => return CommandResult::from_error(COMMAND, error.into()),
        }
    }
    if args.caption.is_some() {
        input.image_caption = args.caption;
    }
    let options = CreateOptions { share: args.share };

    with_store(COMMAND, globals, |store| async move {
        let ctx = RequestContext::new("cli");
        let record = store.create(input, options, &ctx).await?;
        Ok(CommandResult::success_with_data(
            COMMAND,
            format!("created proposal {} ({} pages)", record.id, record.document.page_count()),
            &record.snapshot(),
        ))
    })
}
