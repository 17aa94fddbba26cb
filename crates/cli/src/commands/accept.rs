use proposey_core::domain::acceptance::{AcceptanceMethod, AcceptanceRequest};
use proposey_store::RequestContext;

use crate::commands::{parse_id, with_store, CommandResult, GlobalOptions};

const COMMAND: &str = "accept";

#[derive(Debug, Clone)]
pub struct AcceptArgs {
    pub id: String,
    pub signer_name: String,
    pub signer_title: Option<String>,
    pub method: AcceptanceMethod,
    pub selected_option: Option<u8>,
    pub client_reported_date: Option<String>,
}

impl AcceptArgs {
    fn into_request(self) -> AcceptanceRequest {
        AcceptanceRequest {
            signer_title: self.signer_title,
            selected_option: self.selected_option,
            client_reported_date: self.client_reported_date,
            ..AcceptanceRequest::new(self.signer_name, self.method)
        }
    }
}

pub fn run(globals: &GlobalOptions, args: AcceptArgs) -> CommandResult {
    let id = match parse_id(COMMAND, &args.id) {
        Ok(id) => id,
        Err(result) => return result,
    };
    let request = args.into_request();

    with_store(COMMAND, globals, |store| async move {
        let record = store.update_acceptance(&id, request, &RequestContext::new("cli")).await?;
        Ok(CommandResult::success_with_data(
            COMMAND,
            format!("proposal {id} accepted"),
            &record.snapshot(),
        ))
    })
}
