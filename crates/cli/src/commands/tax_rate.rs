use proposey_core::document::format::percent;
use proposey_core::pricing::tax::state_base_rate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "tax-rate";

#[derive(Debug, Serialize)]
struct TaxRateLookup {
    state: String,
    rate: Decimal,
    display: String,
}

pub fn run(state: &str) -> CommandResult {
    let code = state.trim().to_ascii_uppercase();
    match state_base_rate(&code) {
        Some(rate) => {
            let lookup = TaxRateLookup { display: percent(rate), state: code, rate };
            CommandResult::success_with_data(
                COMMAND,
                format!("{} base sales tax rate is {}", lookup.state, lookup.display),
                &lookup,
            )
        }
        None => CommandResult::failure(
            COMMAND,
            "InvalidInputError",
            format!("unknown US state code `{state}`"),
            4,
        ),
    }
}
