use std::process::ExitCode;

fn main() -> ExitCode {
    gendra_cli::run()
}
