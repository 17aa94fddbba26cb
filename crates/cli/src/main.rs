use std::process::ExitCode;

fn main() -> ExitCode {
    proposey_cli::run()
}
