use std::process::ExitCode;

fn main() -> ExitCode {
    minerbot_cli::run()
}
