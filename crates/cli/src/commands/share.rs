use proposey_store::RequestContext;

use crate::commands::{parse_id, with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "share";

pub fn run(globals: &GlobalOptions, id: &str) -> CommandResult {
    let id = match parse_id(COMMAND, id) {
        Ok(id) => id,
        Err(result) => return result,
    };

    with_store(COMMAND, globals, |store| async move {
        let link = store.share(&id, &RequestContext::new("cli")).await?;
        let message = match &link.client_url {
            Some(url) => format!("proposal {id} shared at {url}"),
            None => format!("proposal {id} shared at {}", link.client_path),
        };
        Ok(CommandResult::success_with_data(COMMAND, message, &link))
    })
}
