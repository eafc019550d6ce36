use std::process::ExitCode;

fn main() -> ExitCode {
    rately_cli::run()
}
