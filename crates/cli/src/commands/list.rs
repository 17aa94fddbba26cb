use crate::commands::{with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "list";

pub fn run(globals: &GlobalOptions) -> CommandResult {
    with_store(COMMAND, globals, |store| async move {
        let summaries = store.list().await?;
        Ok(CommandResult::success_with_data(
            COMMAND,
            format!("{} proposal(s)", summaries.len()),
            &summaries,
        ))
    })
}
