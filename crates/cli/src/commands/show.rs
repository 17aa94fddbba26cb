use crate::commands::{parse_id, with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "show";

pub fn run(globals: &GlobalOptions, id: &str) -> CommandResult {
    let id = match parse_id(COMMAND, id) {
        Ok(id) => id,
        Err(result) => return result,
    };

    with_store(COMMAND, globals, |store| async move {
        let record = store.get(&id).await?;
        Ok(CommandResult::success_with_data(
            COMMAND,
            format!("proposal {id} is {}", record.state.as_str()),
            &record.snapshot(),
        ))
    })
}
